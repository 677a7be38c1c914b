//! Wealthbridge Core - Domain entities, repository traits, and the engine
//! error taxonomy.
//!
//! This crate contains the database-agnostic heart of the brokerage sync
//! engine. Storage lives in `wealthbridge-storage-sqlite`, provider HTTP in
//! `wealthbridge-market-data` and `wealthbridge-broker`.

pub mod accounts;
pub mod connections;
pub mod credentials;
pub mod errors;
pub mod instruments;
pub mod positions;

pub use errors::{DatabaseError, Error, Result};
