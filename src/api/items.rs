//! Catalog endpoints: items, categories and locations

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::item::{Category, CreateItem, CreateNamed, Item, ItemQuery, Location, UpdateItem},
};

use super::ActingUser;

/// Browse the catalog
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    params(ItemQuery),
    responses(
        (status = 200, description = "Matching items", body = Vec<Item>)
    )
)]
pub async fn list_items(
    State(state): State<crate::AppState>,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<Vec<Item>>> {
    let items = state.services.catalog.list_items(&query).await?;
    Ok(Json(items))
}

/// Get item by ID
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item details", body = Item),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Item>> {
    let item = state.services.catalog.get_item(id).await?;
    Ok(Json(item))
}

/// Add an item to the inventory
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    security(("user_id" = [])),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Category or location not found")
    )
)]
pub async fn create_item(
    State(state): State<crate::AppState>,
    acting: ActingUser,
    Json(data): Json<CreateItem>,
) -> AppResult<(StatusCode, Json<Item>)> {
    acting.require_admin()?;
    let item = state.services.catalog.create_item(&data).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Update an item's descriptive fields
#[utoipa::path(
    put,
    path = "/items/{id}",
    tag = "items",
    security(("user_id" = [])),
    params(("id" = i32, Path, description = "Item ID")),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = Item),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Item, category or location not found")
    )
)]
pub async fn update_item(
    State(state): State<crate::AppState>,
    acting: ActingUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateItem>,
) -> AppResult<Json<Item>> {
    acting.require_admin()?;
    let item = state.services.catalog.update_item(id, &data).await?;
    Ok(Json(item))
}

/// Delete an item that has never been rented
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    security(("user_id" = [])),
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item has rental history")
    )
)]
pub async fn delete_item(
    State(state): State<crate::AppState>,
    acting: ActingUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    acting.require_admin()?;
    state.services.catalog.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "items",
    responses(
        (status = 200, description = "All categories", body = Vec<Category>)
    )
)]
pub async fn list_categories(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.services.catalog.list_categories().await?))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/categories",
    tag = "items",
    security(("user_id" = [])),
    request_body = CreateNamed,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Name already used")
    )
)]
pub async fn create_category(
    State(state): State<crate::AppState>,
    acting: ActingUser,
    Json(data): Json<CreateNamed>,
) -> AppResult<(StatusCode, Json<Category>)> {
    acting.require_admin()?;
    let category = state.services.catalog.create_category(&data).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// List pickup locations
#[utoipa::path(
    get,
    path = "/locations",
    tag = "items",
    responses(
        (status = 200, description = "All locations", body = Vec<Location>)
    )
)]
pub async fn list_locations(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<Location>>> {
    Ok(Json(state.services.catalog.list_locations().await?))
}

/// Create a pickup location
#[utoipa::path(
    post,
    path = "/locations",
    tag = "items",
    security(("user_id" = [])),
    request_body = CreateNamed,
    responses(
        (status = 201, description = "Location created", body = Location),
        (status = 409, description = "Name already used")
    )
)]
pub async fn create_location(
    State(state): State<crate::AppState>,
    acting: ActingUser,
    Json(data): Json<CreateNamed>,
) -> AppResult<(StatusCode, Json<Location>)> {
    acting.require_admin()?;
    let location = state.services.catalog.create_location(&data).await?;
    Ok((StatusCode::CREATED, Json(location)))
}
