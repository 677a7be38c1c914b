use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A live quote for a single ticker.
///
/// Transient: the engine hands it to the caller (and the external price
/// cache) without persisting it itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,

    /// Last traded / current price.
    pub price: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_change: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,

    pub timestamp: DateTime<Utc>,

    /// Identifier of the provider that produced the quote.
    pub provider: String,
}
