//! API handlers for Kreisel REST endpoints

pub mod health;
pub mod items;
pub mod openapi;
pub mod rentals;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    models::user::User,
    AppState,
};

/// Header carrying the already-resolved identity of the caller
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the acting user, resolved through the user store.
///
/// The identity is trusted as given; authenticating it is the job of
/// whatever sits in front of this service.
pub struct ActingUser(pub User);

impl ActingUser {
    /// Require administrator role
    pub fn require_admin(&self) -> AppResult<()> {
        if self.0.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ActingUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id: i32 = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing X-User-Id header".to_string()))?
            .trim()
            .parse()
            .map_err(|_| AppError::Authentication("Invalid X-User-Id header".to_string()))?;

        let user = state
            .services
            .users
            .get_user(user_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::Authentication("Unknown user".to_string()),
                other => other,
            })?;

        Ok(ActingUser(user))
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/items", get(items::list_items).post(items::create_item))
        .route(
            "/items/:id",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .route("/categories", get(items::list_categories).post(items::create_category))
        .route("/locations", get(items::list_locations).post(items::create_location))
        // Users
        .route("/users", get(users::list_users).post(users::register))
        .route("/users/:id", get(users::get_user))
        // Rentals
        .route("/rentals", get(rentals::list_rentals).post(rentals::create_rental))
        .route("/rentals/overdue", get(rentals::list_overdue))
        .route("/rentals/user/:user_id", get(rentals::list_user_rentals))
        .route("/rentals/item/:item_id/active", get(rentals::active_rental_for_item))
        .route("/rentals/:id", get(rentals::get_rental))
        .route("/rentals/:id/extend", post(rentals::extend_rental))
        .route("/rentals/:id/return", post(rentals::return_rental))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
