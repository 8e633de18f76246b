//! Business logic services

pub mod catalog;
pub mod clock;
pub mod rentals;
pub mod users;

use std::sync::Arc;

use crate::{
    config::{RentalsConfig, UsersConfig},
    error::AppResult,
    repository::Repository,
};

use self::clock::Clock;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub rentals: rentals::RentalsService,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(
        repository: Repository,
        rentals_config: RentalsConfig,
        users_config: UsersConfig,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        Ok(Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            users: users::UsersService::new(repository.clone(), users_config)?,
            rentals: rentals::RentalsService::new(repository, rentals_config, clock),
        })
    }
}
