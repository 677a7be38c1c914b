//! Market data provider trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::MarketDataError;
use crate::models::{Candle, Quote, Resolution};

/// Trait for market data providers.
///
/// Implement this trait to add support for a new quote/history source. The
/// quote chain and the backfill engine drive providers purely through this
/// interface.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider, e.g. "FINNHUB".
    ///
    /// Used for logging, chain preference matching, and tagging quotes.
    fn id(&self) -> &'static str;

    /// Fetch the latest quote for a ticker.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    /// Fetch candles for a ticker over `[start, end]` at the given
    /// resolution, ordered by timestamp ascending.
    async fn get_candles(
        &self,
        symbol: &str,
        resolution: Resolution,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, MarketDataError>;
}
