//! Market data access for the Wealthbridge sync engine.
//!
//! Provides:
//! - [`provider::MarketDataProvider`]: the trait all quote/history sources
//!   implement, with Finnhub and Alpha Vantage implementations
//! - [`chain::QuoteChain`]: ordered provider fallback for live quotes
//! - [`backfill::BackfillEngine`]: chunked historical retrieval with
//!   termination guards

pub mod backfill;
pub mod chain;
pub mod errors;
pub mod models;
pub mod provider;

pub use backfill::BackfillEngine;
pub use chain::QuoteChain;
pub use errors::MarketDataError;
pub use models::{Candle, Period, Quote, Resolution};
pub use provider::MarketDataProvider;
