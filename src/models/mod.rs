//! Data models for Kreisel

pub mod item;
pub mod rental;
pub mod user;

// Re-export commonly used types
pub use item::{Category, Item, Location};
pub use rental::{Rental, RentalScope, RentalStatus};
pub use user::{Role, User};
