//! Domain model for brokerage accounts observed through a connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A brokerage account as reconciled from provider responses.
///
/// Accounts are created on first observation and updated in place on
/// subsequent observations. Accounts that stop appearing in provider
/// responses are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub connection_id: String,
    /// Provider-assigned identifier, stable and unique within a connection.
    pub external_id: String,
    pub name: String,
    pub account_type: Option<String>,
    pub currency: Option<String>,
    /// Snapshot of the provider payload from the last fetch.
    pub meta: Option<serde_json::Value>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for an account first observed during reconciliation.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub connection_id: String,
    pub external_id: String,
    pub name: String,
    pub account_type: Option<String>,
    pub currency: Option<String>,
    pub meta: Option<serde_json::Value>,
}

/// Mutable-field update applied when an already-known account is observed
/// again.
#[derive(Debug, Clone)]
pub struct AccountUpdate {
    pub id: String,
    pub name: String,
    pub account_type: Option<String>,
    pub currency: Option<String>,
    pub meta: Option<serde_json::Value>,
}
