//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, items, rentals, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kreisel API",
        version = "1.0.0",
        description = "Equipment rental REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Catalog
        items::list_items,
        items::get_item,
        items::create_item,
        items::update_item,
        items::delete_item,
        items::list_categories,
        items::create_category,
        items::list_locations,
        items::create_location,
        // Users
        users::register,
        users::list_users,
        users::get_user,
        // Rentals
        rentals::create_rental,
        rentals::extend_rental,
        rentals::return_rental,
        rentals::get_rental,
        rentals::list_rentals,
        rentals::list_user_rentals,
        rentals::active_rental_for_item,
        rentals::list_overdue,
    ),
    components(
        schemas(
            // Catalog
            crate::models::item::Item,
            crate::models::item::Category,
            crate::models::item::Location,
            crate::models::item::CreateItem,
            crate::models::item::UpdateItem,
            crate::models::item::CreateNamed,
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::CreateUser,
            // Rentals
            crate::models::rental::Rental,
            crate::models::rental::RentalStatus,
            rentals::CreateRentalRequest,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&UserIdHeader),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "items", description = "Inventory, categories and locations"),
        (name = "users", description = "User registration and lookup"),
        (name = "rentals", description = "Rental lifecycle")
    )
)]
pub struct ApiDoc;

/// Declares the `X-User-Id` header referenced by admin-only paths
struct UserIdHeader;

impl Modify for UserIdHeader {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "user_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-User-Id"))),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
