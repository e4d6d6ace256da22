//! Rental booking engine
//!
//! Availability, pricing and reservation lifecycle for a vacation-rental
//! marketplace, backed by PostgreSQL with an optional Redis availability cache.

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
