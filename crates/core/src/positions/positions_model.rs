//! Domain model for positions held in a brokerage account.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Metadata key carrying the locally resolved instrument id.
pub const META_INSTRUMENT_ID: &str = "instrument_id";

/// A position as last observed for an account.
///
/// Positions are created or updated per reconciliation pass and never
/// deleted by the engine; a zero quantity is recorded like any other
/// observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub account_id: String,
    /// Normalized ticker (uppercase, trimmed), unique within the account.
    pub ticker: String,
    pub quantity: Decimal,
    pub cost_basis: Option<Decimal>,
    /// Provider payload snapshot, including the resolved instrument id.
    pub meta: Option<serde_json::Value>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPosition {
    pub account_id: String,
    pub ticker: String,
    pub quantity: Decimal,
    pub cost_basis: Option<Decimal>,
    pub meta: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct PositionUpdate {
    pub id: String,
    pub quantity: Decimal,
    pub cost_basis: Option<Decimal>,
    pub meta: Option<serde_json::Value>,
}
