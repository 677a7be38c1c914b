//! Domain model for brokerage connections.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::credentials::SecretToken;

/// Metadata key holding the transient OAuth CSRF state.
pub const META_OAUTH_STATE: &str = "oauth_state";
/// Metadata key holding the redirect URI the flow was initiated with.
pub const META_OAUTH_REDIRECT_URI: &str = "oauth_redirect_uri";

/// Lifecycle status of a connection.
///
/// `Pending` at creation, `Active` once a token exchange or direct submission
/// succeeds, `RequiresAuth` once the provider rejects a refresh. The engine
/// never deletes connections; that is a user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Pending,
    Active,
    RequiresAuth,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "PENDING",
            ConnectionStatus::Active => "ACTIVE",
            ConnectionStatus::RequiresAuth => "REQUIRES_AUTH",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(ConnectionStatus::Pending),
            "ACTIVE" => Some(ConnectionStatus::Active),
            "REQUIRES_AUTH" => Some(ConnectionStatus::RequiresAuth),
            _ => None,
        }
    }
}

/// A stored brokerage integration: credentials, status, and provider
/// metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    /// Provider identifier, e.g. `snaptrade` or `tradier`.
    pub provider: String,
    /// Owning user.
    pub user_id: String,
    pub status: ConnectionStatus,
    /// Encoded access token. Invariant: always present while `Active`.
    #[serde(skip_serializing, default)]
    pub access_token: Option<SecretToken>,
    #[serde(skip_serializing, default)]
    pub refresh_token: Option<SecretToken>,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    /// Free-form provider metadata (OAuth state, account-specific fields).
    pub meta: Option<serde_json::Value>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// Whether a proactive token refresh should be attempted: the expiry is
    /// known and falls inside the buffer window, or there is no access token
    /// at all.
    pub fn needs_refresh(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        match (&self.access_token, self.access_token_expires_at) {
            (None, _) => true,
            (Some(_), Some(expires_at)) => expires_at <= now + buffer,
            (Some(_), None) => false,
        }
    }

    /// Read a string value out of the metadata document.
    pub fn meta_str(&self, key: &str) -> Option<String> {
        self.meta
            .as_ref()
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

/// Partial update of a connection row.
///
/// Every field is optional; fields left as `None` are never touched by the
/// store. Nullable columns use `Option<Option<T>>` so that `Some(None)`
/// explicitly clears a value while `None` leaves it alone.
#[derive(Debug, Default, Clone)]
pub struct ConnectionUpdate {
    pub status: Option<ConnectionStatus>,
    pub access_token: Option<Option<SecretToken>>,
    pub refresh_token: Option<Option<SecretToken>>,
    pub access_token_expires_at: Option<Option<DateTime<Utc>>>,
    pub meta: Option<Option<serde_json::Value>>,
    pub last_synced_at: Option<DateTime<Utc>>,
}
