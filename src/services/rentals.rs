//! Rental lifecycle: create, extend and return rentals, plus read-only queries
//!
//! Every precondition is checked before the ledger is asked to write, so a
//! rejected request leaves no partial state behind. The ledger re-checks the
//! item and quota invariants inside its own atomic unit.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use super::clock::Clock;
use crate::{
    config::{ExtensionPolicy, RentalsConfig},
    error::{AppError, AppResult, ConflictKind, Entity, RangeViolation},
    models::rental::{NewRental, Rental, RentalFilter, RentalScope, RentalStatus},
    repository::Repository,
};

/// Check a requested end date against the creation window.
///
/// Rules apply in order and the first failure wins: past date, longer than
/// `max_days`, then zero-length (ending today).
pub fn validate_end_date(
    today: NaiveDate,
    end_date: NaiveDate,
    max_days: i64,
) -> Result<(), RangeViolation> {
    if end_date < today {
        return Err(RangeViolation::PastDate);
    }
    if end_date > today + Duration::days(max_days) {
        return Err(RangeViolation::TooLong);
    }
    if end_date == today {
        return Err(RangeViolation::ZeroDuration);
    }
    Ok(())
}

/// Compute the end date an extension would move `rental` to
pub fn extended_end_date(
    rental: &Rental,
    requested: Option<NaiveDate>,
    config: &RentalsConfig,
) -> AppResult<NaiveDate> {
    match config.extension_policy {
        ExtensionPolicy::Fixed => {
            if requested.is_some() {
                return Err(AppError::Validation(format!(
                    "newEndDate is not accepted: extensions add {} days",
                    config.extension_days
                )));
            }
            let end_date = rental.end_date + Duration::days(config.extension_days);
            let cap = rental.rental_date
                + Duration::days(config.max_rental_days + config.extension_days);
            if end_date > cap {
                return Err(AppError::InvalidRange(RangeViolation::ExtensionTooLong));
            }
            Ok(end_date)
        }
        ExtensionPolicy::CallerSupplied => {
            let end_date = requested
                .ok_or_else(|| AppError::Validation("newEndDate is required".to_string()))?;
            if end_date <= rental.end_date {
                return Err(AppError::InvalidRange(RangeViolation::NotAfterCurrentEnd));
            }
            Ok(end_date)
        }
    }
}

#[derive(Clone)]
pub struct RentalsService {
    repository: Repository,
    config: RentalsConfig,
    clock: Arc<dyn Clock>,
}

impl RentalsService {
    pub fn new(repository: Repository, config: RentalsConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            config,
            clock,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Rent `item_id` to `user_id` until `end_date`
    pub async fn create_rental(
        &self,
        user_id: i32,
        item_id: i32,
        end_date: Option<NaiveDate>,
    ) -> AppResult<Rental> {
        let result = self.open(user_id, item_id, end_date).await;
        match &result {
            Ok(rental) => tracing::info!(
                rental_id = rental.id,
                user_id,
                item_id,
                end_date = %rental.end_date,
                "Rental created"
            ),
            Err(e) => tracing::debug!(user_id, item_id, error = %e, "Rental refused"),
        }
        result
    }

    /// Use the single extension of an active rental
    pub async fn extend_rental(
        &self,
        rental_id: i32,
        new_end_date: Option<NaiveDate>,
    ) -> AppResult<Rental> {
        let result = self.extend(rental_id, new_end_date).await;
        match &result {
            Ok(rental) => tracing::info!(
                rental_id,
                end_date = %rental.end_date,
                "Rental extended"
            ),
            Err(e) => tracing::debug!(rental_id, error = %e, "Extension refused"),
        }
        result
    }

    /// Close an active rental and release its item
    pub async fn return_rental(&self, rental_id: i32) -> AppResult<Rental> {
        let result = self.close(rental_id).await;
        match &result {
            Ok(rental) => tracing::info!(
                rental_id,
                item_id = rental.item_id,
                "Rental returned"
            ),
            Err(e) => tracing::debug!(rental_id, error = %e, "Return refused"),
        }
        result
    }

    async fn open(
        &self,
        user_id: i32,
        item_id: i32,
        end_date: Option<NaiveDate>,
    ) -> AppResult<Rental> {
        let max_active = self.config.max_active_rentals;

        self.repository
            .users
            .find_user(user_id)
            .await?
            .ok_or(AppError::NotFound(Entity::User))?;

        let item = self
            .repository
            .catalog
            .find_item(item_id)
            .await?
            .ok_or(AppError::NotFound(Entity::Item))?;

        if !item.available {
            return Err(AppError::Conflict(ConflictKind::ItemUnavailable));
        }

        let active = self.repository.rentals.count_active_for_user(user_id).await?;
        if active >= i64::from(max_active) {
            return Err(AppError::QuotaExceeded { limit: max_active });
        }

        // Independent of the availability flag
        if self.active_rental(item_id).await?.is_some() {
            return Err(AppError::Conflict(ConflictKind::AlreadyRented));
        }

        let end_date =
            end_date.ok_or_else(|| AppError::Validation("endDate is required".to_string()))?;

        let today = self.clock.today();
        validate_end_date(today, end_date, self.config.max_rental_days)
            .map_err(AppError::InvalidRange)?;

        let rental = NewRental {
            user_id,
            item_id,
            rental_date: today,
            end_date,
        };
        self.repository.rentals.open_rental(&rental, max_active).await
    }

    async fn extend(&self, rental_id: i32, new_end_date: Option<NaiveDate>) -> AppResult<Rental> {
        let rental = self.get_rental(rental_id).await?;

        if !rental.is_active() {
            return Err(AppError::Conflict(ConflictKind::AlreadyReturned));
        }
        if rental.extended {
            return Err(AppError::Conflict(ConflictKind::ExtensionAlreadyUsed));
        }

        let end_date = extended_end_date(&rental, new_end_date, &self.config)?;
        self.repository.rentals.extend_rental(rental_id, end_date).await
    }

    async fn close(&self, rental_id: i32) -> AppResult<Rental> {
        let rental = self.get_rental(rental_id).await?;

        if !rental.is_active() {
            return Err(AppError::Conflict(ConflictKind::AlreadyReturned));
        }

        self.repository
            .rentals
            .close_rental(rental_id, self.clock.today())
            .await
    }

    pub async fn get_rental(&self, rental_id: i32) -> AppResult<Rental> {
        self.repository
            .rentals
            .find_rental(rental_id)
            .await?
            .ok_or(AppError::NotFound(Entity::Rental))
    }

    /// Every rental ever recorded
    pub async fn list_rentals(&self) -> AppResult<Vec<Rental>> {
        self.repository
            .rentals
            .list_rentals(&RentalFilter::default())
            .await
    }

    /// A user's rentals, partitioned by whether they have been returned
    pub async fn user_rentals(&self, user_id: i32, scope: RentalScope) -> AppResult<Vec<Rental>> {
        self.repository
            .users
            .find_user(user_id)
            .await?
            .ok_or(AppError::NotFound(Entity::User))?;

        let filter = RentalFilter {
            user_id: Some(user_id),
            status: scope.status(),
            ..Default::default()
        };
        self.repository.rentals.list_rentals(&filter).await
    }

    /// The active rental of an item, if any
    pub async fn active_rental_for_item(&self, item_id: i32) -> AppResult<Option<Rental>> {
        self.repository
            .catalog
            .find_item(item_id)
            .await?
            .ok_or(AppError::NotFound(Entity::Item))?;

        self.active_rental(item_id).await
    }

    /// Active rentals whose end date has passed
    pub async fn overdue_rentals(&self) -> AppResult<Vec<Rental>> {
        let filter = RentalFilter {
            status: Some(RentalStatus::Active),
            ends_before: Some(self.clock.today()),
            ..Default::default()
        };
        self.repository.rentals.list_rentals(&filter).await
    }

    async fn active_rental(&self, item_id: i32) -> AppResult<Option<Rental>> {
        let filter = RentalFilter {
            item_id: Some(item_id),
            status: Some(RentalStatus::Active),
            ..Default::default()
        };
        let active = self.repository.rentals.list_rentals(&filter).await?;
        Ok(active.into_iter().next())
    }
}
