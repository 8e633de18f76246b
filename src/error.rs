//! Error types for Kreisel server

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Entity kinds reported by `AppError::NotFound`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Item,
    Rental,
    Category,
    Location,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::User => "User",
            Entity::Item => "Item",
            Entity::Rental => "Rental",
            Entity::Category => "Category",
            Entity::Location => "Location",
        };
        f.write_str(name)
    }
}

/// State conflicts that prevent an operation from running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConflictKind {
    #[error("item is not available")]
    ItemUnavailable,
    #[error("item already has an active rental")]
    AlreadyRented,
    #[error("rental has already been returned")]
    AlreadyReturned,
    #[error("the single extension of this rental has already been used")]
    ExtensionAlreadyUsed,
    #[error("a user with this email already exists")]
    EmailTaken,
    #[error("item is referenced by rental history")]
    ItemHasRentals,
    #[error("an entry with this name already exists")]
    NameTaken,
}

/// End-date rules violated by a create or extend request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangeViolation {
    #[error("end date lies in the past")]
    PastDate,
    #[error("end date exceeds the maximum rental duration")]
    TooLong,
    #[error("a rental must last at least one day")]
    ZeroDuration,
    #[error("extension exceeds the maximum total rental duration")]
    ExtensionTooLong,
    #[error("new end date must be after the current end date")]
    NotAfterCurrentEnd,
}

/// Application error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Failure,
    DbFailure,
    NotAuthenticated,
    NotAuthorized,
    NoSuchUser,
    NoSuchItem,
    NoSuchRental,
    NoSuchCategory,
    NoSuchLocation,
    ItemNotAvailable,
    ItemAlreadyRented,
    RentalAlreadyReturned,
    ExtensionAlreadyUsed,
    EmailTaken,
    ItemHasRentals,
    NameTaken,
    MaxRentalsReached,
    EndDateInPast,
    RentalTooLong,
    ZeroDuration,
    ExtensionTooLong,
    EndDateNotAfterCurrent,
    BadValue,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Failure => "failure",
            ErrorCode::DbFailure => "db_failure",
            ErrorCode::NotAuthenticated => "not_authenticated",
            ErrorCode::NotAuthorized => "not_authorized",
            ErrorCode::NoSuchUser => "no_such_user",
            ErrorCode::NoSuchItem => "no_such_item",
            ErrorCode::NoSuchRental => "no_such_rental",
            ErrorCode::NoSuchCategory => "no_such_category",
            ErrorCode::NoSuchLocation => "no_such_location",
            ErrorCode::ItemNotAvailable => "item_not_available",
            ErrorCode::ItemAlreadyRented => "item_already_rented",
            ErrorCode::RentalAlreadyReturned => "rental_already_returned",
            ErrorCode::ExtensionAlreadyUsed => "extension_already_used",
            ErrorCode::EmailTaken => "email_taken",
            ErrorCode::ItemHasRentals => "item_has_rentals",
            ErrorCode::NameTaken => "name_taken",
            ErrorCode::MaxRentalsReached => "max_rentals_reached",
            ErrorCode::EndDateInPast => "end_date_in_past",
            ErrorCode::RentalTooLong => "rental_too_long",
            ErrorCode::ZeroDuration => "zero_duration",
            ErrorCode::ExtensionTooLong => "extension_too_long",
            ErrorCode::EndDateNotAfterCurrent => "end_date_not_after_current",
            ErrorCode::BadValue => "bad_value",
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    #[error("Maximum number of active rentals ({limit}) reached")]
    QuotaExceeded { limit: u32 },

    #[error("Invalid range: {0}")]
    InvalidRange(RangeViolation),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and client-facing code for this error
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::NotFound(entity) => {
                let code = match entity {
                    Entity::User => ErrorCode::NoSuchUser,
                    Entity::Item => ErrorCode::NoSuchItem,
                    Entity::Rental => ErrorCode::NoSuchRental,
                    Entity::Category => ErrorCode::NoSuchCategory,
                    Entity::Location => ErrorCode::NoSuchLocation,
                };
                (StatusCode::NOT_FOUND, code)
            }
            AppError::Conflict(kind) => {
                let code = match kind {
                    ConflictKind::ItemUnavailable => ErrorCode::ItemNotAvailable,
                    ConflictKind::AlreadyRented => ErrorCode::ItemAlreadyRented,
                    ConflictKind::AlreadyReturned => ErrorCode::RentalAlreadyReturned,
                    ConflictKind::ExtensionAlreadyUsed => ErrorCode::ExtensionAlreadyUsed,
                    ConflictKind::EmailTaken => ErrorCode::EmailTaken,
                    ConflictKind::ItemHasRentals => ErrorCode::ItemHasRentals,
                    ConflictKind::NameTaken => ErrorCode::NameTaken,
                };
                (StatusCode::CONFLICT, code)
            }
            AppError::QuotaExceeded { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::MaxRentalsReached)
            }
            AppError::InvalidRange(violation) => {
                let code = match violation {
                    RangeViolation::PastDate => ErrorCode::EndDateInPast,
                    RangeViolation::TooLong => ErrorCode::RentalTooLong,
                    RangeViolation::ZeroDuration => ErrorCode::ZeroDuration,
                    RangeViolation::ExtensionTooLong => ErrorCode::ExtensionTooLong,
                    RangeViolation::NotAfterCurrentEnd => ErrorCode::EndDateNotAfterCurrent,
                };
                (StatusCode::BAD_REQUEST, code)
            }
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthenticated),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Store failures are logged and reported opaquely
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            error: code.as_str().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinct_from_conflict() {
        let (status, code) = AppError::NotFound(Entity::Item).status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, ErrorCode::NoSuchItem);

        let (status, code) = AppError::Conflict(ConflictKind::ItemUnavailable).status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, ErrorCode::ItemNotAvailable);
    }

    #[test]
    fn test_range_violation_codes() {
        let (status, code) = AppError::InvalidRange(RangeViolation::ZeroDuration).status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code.as_str(), "zero_duration");

        let (_, code) = AppError::InvalidRange(RangeViolation::TooLong).status_and_code();
        assert_eq!(code.as_str(), "rental_too_long");
    }

    #[test]
    fn test_quota_message_names_limit() {
        let err = AppError::QuotaExceeded { limit: 5 };
        assert_eq!(err.to_string(), "Maximum number of active rentals (5) reached");
        assert_eq!(err.status_and_code().0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let response = AppError::Internal("connection refused on 10.0.0.3".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
