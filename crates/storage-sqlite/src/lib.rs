//! SQLite storage implementation for the Wealthbridge sync engine.
//!
//! This crate provides all database-related functionality using Diesel ORM
//! with SQLite. It implements the repository traits defined in
//! `wealthbridge-core` and contains:
//! - Database connection pooling and management
//! - Embedded Diesel migrations
//! - Repository implementations for connections, accounts, positions, and
//!   instruments
//! - Database-specific model types (with Diesel derives)
//!
//! This crate is the only place in the workspace where Diesel dependencies
//! exist; `core` and `broker` are database-agnostic and work with traits.

pub mod db;
pub mod errors;
pub mod schema;
mod utils;

// Repository implementations
pub mod accounts;
pub mod connections;
pub mod instruments;
pub mod positions;

pub use db::{create_pool, get_connection, init, run_migrations, DbConnection, DbPool};
pub use errors::StorageError;

// Re-export from wealthbridge-core for convenience
pub use wealthbridge_core::errors::{DatabaseError, Error, Result};
