//! Rental model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A loan of one item to one user. Never deleted; returned rentals are history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: i32,
    pub user_id: i32,
    pub item_id: i32,
    /// Day the rental was created
    pub rental_date: NaiveDate,
    /// Agreed return-by date
    pub end_date: NaiveDate,
    /// Set once the item is back; `None` while the rental is active
    pub return_date: Option<NaiveDate>,
    /// Whether the single allowed extension has been consumed
    pub extended: bool,
}

impl Rental {
    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn status(&self) -> RentalStatus {
        if self.is_active() {
            RentalStatus::Active
        } else {
            RentalStatus::Returned
        }
    }

    /// Active and past its end date as seen on `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_active() && self.end_date < today
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RentalStatus {
    Active,
    Returned,
}

/// Which of a user's rentals to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RentalScope {
    #[default]
    All,
    Active,
    History,
}

impl RentalScope {
    pub fn status(&self) -> Option<RentalStatus> {
        match self {
            RentalScope::All => None,
            RentalScope::Active => Some(RentalStatus::Active),
            RentalScope::History => Some(RentalStatus::Returned),
        }
    }
}

/// Rental record ready to be opened in the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRental {
    pub user_id: i32,
    pub item_id: i32,
    pub rental_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Ledger lookup filter; every field is optional and they combine with AND
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RentalFilter {
    pub user_id: Option<i32>,
    pub item_id: Option<i32>,
    pub status: Option<RentalStatus>,
    /// Only rentals whose end date is strictly before this day
    pub ends_before: Option<NaiveDate>,
}

impl RentalFilter {
    pub fn matches(&self, rental: &Rental) -> bool {
        self.user_id.map_or(true, |id| id == rental.user_id)
            && self.item_id.map_or(true, |id| id == rental.item_id)
            && self.status.map_or(true, |s| s == rental.status())
            && self.ends_before.map_or(true, |day| rental.end_date < day)
    }
}
