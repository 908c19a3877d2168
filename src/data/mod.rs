//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations
//! - Content models and their table bindings

mod database;
mod models;
mod record;

pub use database::{Database, REDIRECT_COLLISION_MESSAGE};
pub use models::*;
pub use record::ContentRecord;

#[cfg(test)]
mod database_test;
