//! Rental endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::rental::{Rental, RentalScope},
};

use super::ActingUser;

/// Create rental request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRentalRequest {
    pub user_id: Option<i32>,
    pub item_id: Option<i32>,
    /// Agreed return-by date (YYYY-MM-DD)
    pub end_date: Option<NaiveDate>,
}

/// Extension parameters
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExtendQuery {
    /// New end date; only accepted under the caller-supplied extension policy
    #[serde(rename = "newEndDate")]
    pub new_end_date: Option<NaiveDate>,
}

/// Flags selecting active rentals (`?active`) or returned ones (`?history`).
///
/// A bare flag or `true` switches it on, `false` leaves it off.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserRentalsQuery {
    pub active: Option<String>,
    pub history: Option<String>,
}

impl UserRentalsQuery {
    pub fn scope(&self) -> AppResult<RentalScope> {
        let active = flag("active", self.active.as_deref())?;
        let history = flag("history", self.history.as_deref())?;
        match (active, history) {
            (false, false) => Ok(RentalScope::All),
            (true, false) => Ok(RentalScope::Active),
            (false, true) => Ok(RentalScope::History),
            (true, true) => Err(AppError::Validation(
                "active and history are mutually exclusive".to_string(),
            )),
        }
    }
}

fn flag(name: &str, value: Option<&str>) -> AppResult<bool> {
    match value.map(str::trim) {
        None => Ok(false),
        Some("") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(AppError::Validation(format!(
            "{} must be true or false, got '{}'",
            name, v
        ))),
    }
}

/// Rent an item
#[utoipa::path(
    post,
    path = "/rentals",
    tag = "rentals",
    request_body = CreateRentalRequest,
    responses(
        (status = 200, description = "Rental created", body = Rental),
        (status = 400, description = "Missing field or end date out of range"),
        (status = 404, description = "User or item not found"),
        (status = 409, description = "Item unavailable or already rented"),
        (status = 422, description = "Maximum number of active rentals reached")
    )
)]
pub async fn create_rental(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateRentalRequest>,
) -> AppResult<Json<Rental>> {
    let user_id = request
        .user_id
        .ok_or_else(|| AppError::Validation("userId is required".to_string()))?;
    let item_id = request
        .item_id
        .ok_or_else(|| AppError::Validation("itemId is required".to_string()))?;

    let rental = state
        .services
        .rentals
        .create_rental(user_id, item_id, request.end_date)
        .await?;
    Ok(Json(rental))
}

/// Extend a rental (once)
#[utoipa::path(
    post,
    path = "/rentals/{id}/extend",
    tag = "rentals",
    params(
        ("id" = i32, Path, description = "Rental ID"),
        ExtendQuery
    ),
    responses(
        (status = 200, description = "Rental extended", body = Rental),
        (status = 400, description = "New end date invalid"),
        (status = 404, description = "Rental not found"),
        (status = 409, description = "Already returned or extension already used")
    )
)]
pub async fn extend_rental(
    State(state): State<crate::AppState>,
    Path(rental_id): Path<i32>,
    Query(query): Query<ExtendQuery>,
) -> AppResult<Json<Rental>> {
    let rental = state
        .services
        .rentals
        .extend_rental(rental_id, query.new_end_date)
        .await?;
    Ok(Json(rental))
}

/// Return a rented item
#[utoipa::path(
    post,
    path = "/rentals/{id}/return",
    tag = "rentals",
    params(("id" = i32, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Item returned", body = Rental),
        (status = 404, description = "Rental not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_rental(
    State(state): State<crate::AppState>,
    Path(rental_id): Path<i32>,
) -> AppResult<Json<Rental>> {
    let rental = state.services.rentals.return_rental(rental_id).await?;
    Ok(Json(rental))
}

/// Get rental by ID
#[utoipa::path(
    get,
    path = "/rentals/{id}",
    tag = "rentals",
    params(("id" = i32, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental details", body = Rental),
        (status = 404, description = "Rental not found")
    )
)]
pub async fn get_rental(
    State(state): State<crate::AppState>,
    Path(rental_id): Path<i32>,
) -> AppResult<Json<Rental>> {
    Ok(Json(state.services.rentals.get_rental(rental_id).await?))
}

/// List every rental
#[utoipa::path(
    get,
    path = "/rentals",
    tag = "rentals",
    security(("user_id" = [])),
    responses(
        (status = 200, description = "All rentals", body = Vec<Rental>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_rentals(
    State(state): State<crate::AppState>,
    acting: ActingUser,
) -> AppResult<Json<Vec<Rental>>> {
    acting.require_admin()?;
    Ok(Json(state.services.rentals.list_rentals().await?))
}

/// List a user's rentals
#[utoipa::path(
    get,
    path = "/rentals/user/{user_id}",
    tag = "rentals",
    params(
        ("user_id" = i32, Path, description = "User ID"),
        UserRentalsQuery
    ),
    responses(
        (status = 200, description = "User's rentals", body = Vec<Rental>),
        (status = 404, description = "User not found")
    )
)]
pub async fn list_user_rentals(
    State(state): State<crate::AppState>,
    Path(user_id): Path<i32>,
    Query(query): Query<UserRentalsQuery>,
) -> AppResult<Json<Vec<Rental>>> {
    let scope = query.scope()?;
    Ok(Json(state.services.rentals.user_rentals(user_id, scope).await?))
}

/// The active rental of an item (zero or one entry)
#[utoipa::path(
    get,
    path = "/rentals/item/{item_id}/active",
    tag = "rentals",
    params(("item_id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Active rental, if any", body = Vec<Rental>),
        (status = 404, description = "Item not found")
    )
)]
pub async fn active_rental_for_item(
    State(state): State<crate::AppState>,
    Path(item_id): Path<i32>,
) -> AppResult<Json<Vec<Rental>>> {
    let active = state.services.rentals.active_rental_for_item(item_id).await?;
    Ok(Json(active.into_iter().collect()))
}

/// List overdue rentals
#[utoipa::path(
    get,
    path = "/rentals/overdue",
    tag = "rentals",
    security(("user_id" = [])),
    responses(
        (status = 200, description = "Active rentals past their end date", body = Vec<Rental>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_overdue(
    State(state): State<crate::AppState>,
    acting: ActingUser,
) -> AppResult<Json<Vec<Rental>>> {
    acting.require_admin()?;
    Ok(Json(state.services.rentals.overdue_rentals().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_flags() {
        let query = UserRentalsQuery::default();
        assert_eq!(query.scope().unwrap(), RentalScope::All);

        let query = UserRentalsQuery {
            active: Some(String::new()),
            history: None,
        };
        assert_eq!(query.scope().unwrap(), RentalScope::Active);

        let query = UserRentalsQuery {
            active: None,
            history: Some(String::new()),
        };
        assert_eq!(query.scope().unwrap(), RentalScope::History);

        let query = UserRentalsQuery {
            active: Some(String::new()),
            history: Some(String::new()),
        };
        assert!(matches!(query.scope(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_scope_flag_values() {
        let query = UserRentalsQuery {
            active: Some("false".to_string()),
            history: None,
        };
        assert_eq!(query.scope().unwrap(), RentalScope::All);

        let query = UserRentalsQuery {
            active: Some("false".to_string()),
            history: Some("true".to_string()),
        };
        assert_eq!(query.scope().unwrap(), RentalScope::History);

        let query = UserRentalsQuery {
            active: Some("TRUE".to_string()),
            history: Some("false".to_string()),
        };
        assert_eq!(query.scope().unwrap(), RentalScope::Active);

        let query = UserRentalsQuery {
            active: Some("yes".to_string()),
            history: None,
        };
        assert!(matches!(query.scope(), Err(AppError::Validation(_))));
    }
}
