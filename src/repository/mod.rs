//! Repository layer: store ports and their PostgreSQL / in-memory adapters

pub mod catalog;
pub mod memory;
pub mod rentals;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        item::{Category, CreateItem, Item, ItemQuery, Location, UpdateItem},
        rental::{NewRental, Rental, RentalFilter},
        user::{NewUser, User},
    },
};

/// Items, categories and locations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Cheap round-trip used by the readiness check
    async fn ping(&self) -> AppResult<()>;

    async fn find_item(&self, id: i32) -> AppResult<Option<Item>>;

    async fn list_items(&self, query: &ItemQuery) -> AppResult<Vec<Item>>;

    /// Insert a new item; it starts out available
    async fn insert_item(&self, data: &CreateItem) -> AppResult<Item>;

    /// Update descriptive fields; `None` when the item does not exist
    async fn update_item(&self, id: i32, data: &UpdateItem) -> AppResult<Option<Item>>;

    /// Returns false when the item does not exist. Fails with
    /// `Conflict(ItemHasRentals)` if a rental references the item.
    async fn delete_item(&self, id: i32) -> AppResult<bool>;

    async fn find_category(&self, id: i32) -> AppResult<Option<Category>>;

    async fn list_categories(&self) -> AppResult<Vec<Category>>;

    async fn insert_category(&self, name: &str) -> AppResult<Category>;

    async fn find_location(&self, id: i32) -> AppResult<Option<Location>>;

    async fn list_locations(&self) -> AppResult<Vec<Location>>;

    async fn insert_location(&self, name: &str) -> AppResult<Location>;
}

/// Registered users
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: i32) -> AppResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Fails with `Conflict(EmailTaken)` if the email is already registered
    async fn insert_user(&self, user: &NewUser) -> AppResult<User>;
}

/// Rental records, plus the item-availability writes that must commit with them.
///
/// `open_rental` and `close_rental` each run as a single atomic unit: the
/// rental mutation and the item availability flip commit together or not at
/// all. Implementations re-check the invariants inside that unit so that
/// concurrent callers cannot both open a rental on the same item or push a
/// user past `max_active`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RentalLedger: Send + Sync {
    async fn find_rental(&self, id: i32) -> AppResult<Option<Rental>>;

    async fn list_rentals(&self, filter: &RentalFilter) -> AppResult<Vec<Rental>>;

    async fn count_active_for_user(&self, user_id: i32) -> AppResult<i64>;

    /// Insert an active rental and mark its item unavailable.
    ///
    /// Errors: `Conflict(ItemUnavailable)` / `Conflict(AlreadyRented)` if the
    /// item was taken meanwhile, `QuotaExceeded` if the user reached
    /// `max_active`, `NotFound` if user or item vanished.
    async fn open_rental(&self, rental: &NewRental, max_active: u32) -> AppResult<Rental>;

    /// Move the end date of an active, not yet extended rental and latch
    /// its `extended` flag.
    async fn extend_rental(&self, id: i32, end_date: NaiveDate) -> AppResult<Rental>;

    /// Set the return date and mark the linked item available again.
    async fn close_rental(&self, id: i32, return_date: NaiveDate) -> AppResult<Rental>;
}

/// Store handles shared by the services
#[derive(Clone)]
pub struct Repository {
    pub catalog: Arc<dyn CatalogStore>,
    pub users: Arc<dyn UserStore>,
    pub rentals: Arc<dyn RentalLedger>,
}

impl Repository {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        users: Arc<dyn UserStore>,
        rentals: Arc<dyn RentalLedger>,
    ) -> Self {
        Self {
            catalog,
            users,
            rentals,
        }
    }

    /// Repository backed by PostgreSQL
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self::new(
            Arc::new(catalog::CatalogRepository::new(pool.clone())),
            Arc::new(users::UsersRepository::new(pool.clone())),
            Arc::new(rentals::RentalsRepository::new(pool)),
        )
    }

    /// Repository backed by a single in-process store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self::new(store.clone(), store.clone(), store)
    }
}

/// True if `err` is a PostgreSQL unique-constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

/// True if `err` is a PostgreSQL foreign-key violation
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23503"))
}
