//! Kreisel equipment rental server
//!
//! Inventory, user registration and the rental lifecycle of a university
//! equipment pool, exposed as a REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use repository::Repository;
use services::{clock::Clock, Services};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
}

impl AppState {
    /// Wire services over a repository and clock
    pub fn new(config: &AppConfig, repository: Repository, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let services = Services::new(
            repository,
            config.rentals.clone(),
            config.users.clone(),
            clock,
        )?;

        Ok(Self {
            services: Arc::new(services),
        })
    }
}
