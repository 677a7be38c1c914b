//! Database model for connections.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use wealthbridge_core::connections::{Connection, ConnectionStatus, ConnectionUpdate};
use wealthbridge_core::credentials::SecretToken;

use crate::utils::{json_to_text, text_to_json, to_naive_opt, to_utc, to_utc_opt};

/// Database model for connections
#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::connections)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ConnectionDB {
    pub id: String,
    pub provider: String,
    pub user_id: String,
    pub status: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token_expires_at: Option<NaiveDateTime>,
    pub meta: Option<String>,
    pub last_synced_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Partial-update changeset. `None` leaves a column untouched;
/// `Some(None)` clears a nullable column.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::connections)]
pub struct ConnectionChangeset {
    pub status: Option<String>,
    pub access_token: Option<Option<String>>,
    pub refresh_token: Option<Option<String>>,
    pub access_token_expires_at: Option<Option<NaiveDateTime>>,
    pub meta: Option<Option<String>>,
    pub last_synced_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

impl From<ConnectionDB> for Connection {
    fn from(db: ConnectionDB) -> Self {
        Self {
            id: db.id,
            provider: db.provider,
            user_id: db.user_id,
            // An unknown status string means a row written by a newer
            // schema; treat it as needing re-auth rather than failing reads.
            status: ConnectionStatus::parse(&db.status)
                .unwrap_or(ConnectionStatus::RequiresAuth),
            access_token: db.access_token.map(SecretToken::from_encoded),
            refresh_token: db.refresh_token.map(SecretToken::from_encoded),
            access_token_expires_at: to_utc_opt(db.access_token_expires_at),
            meta: text_to_json(db.meta),
            last_synced_at: to_utc_opt(db.last_synced_at),
            created_at: to_utc(db.created_at),
            updated_at: to_utc(db.updated_at),
        }
    }
}

impl From<ConnectionUpdate> for ConnectionChangeset {
    fn from(update: ConnectionUpdate) -> Self {
        Self {
            status: update.status.map(|s| s.as_str().to_string()),
            access_token: update
                .access_token
                .map(|t| t.map(|t| t.encoded().to_string())),
            refresh_token: update
                .refresh_token
                .map(|t| t.map(|t| t.encoded().to_string())),
            access_token_expires_at: update.access_token_expires_at.map(to_naive_opt),
            meta: update.meta.map(|m| json_to_text(&m)),
            last_synced_at: update.last_synced_at.map(|t| t.naive_utc()),
            updated_at: chrono::Utc::now().naive_utc(),
        }
    }
}
