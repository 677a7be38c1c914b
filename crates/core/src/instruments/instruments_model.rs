//! Domain model for instruments (symbols) owned by a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ASSET_TYPE_EQUITY: &str = "EQUITY";
pub const DEFAULT_CURRENCY: &str = "USD";

/// A locally known instrument, identified by (owner, normalized ticker).
///
/// Created lazily the first time a ticker is observed with no local match;
/// brokerage sync is often the first time a ticker is seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub id: String,
    pub user_id: String,
    pub ticker: String,
    pub asset_type: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInstrument {
    pub user_id: String,
    pub ticker: String,
    pub asset_type: String,
    pub currency: String,
}

impl NewInstrument {
    /// The lazily-created default: an EQUITY instrument quoted in USD.
    pub fn equity(user_id: &str, ticker: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ticker: ticker.to_string(),
            asset_type: ASSET_TYPE_EQUITY.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

/// Normalize a raw provider ticker: trim and uppercase. Returns `None` when
/// nothing remains, which callers treat as a skip-with-warning.
pub fn normalize_ticker(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}
