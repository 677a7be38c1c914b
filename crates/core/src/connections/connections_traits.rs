//! Repository contract for the connection store.

use async_trait::async_trait;

use super::connections_model::{Connection, ConnectionUpdate};
use crate::errors::Result;

/// Storage operations over connection rows.
///
/// All writes are partial-field updates; the store never resets fields not
/// explicitly included in the [`ConnectionUpdate`]. Concurrent updates are
/// last-write-wins at the field level.
#[async_trait]
pub trait ConnectionRepositoryTrait: Send + Sync {
    /// Fetch a connection by id. `Error::NotFound` if absent.
    fn get_by_id(&self, connection_id: &str) -> Result<Connection>;

    /// List all connections for a user.
    fn list_by_user(&self, user_id: &str) -> Result<Vec<Connection>>;

    /// Refresh candidates: up to `limit` active connections ordered by
    /// oldest `last_synced_at` first, never-synced connections before all.
    fn list_active_stalest_first(&self, limit: i64) -> Result<Vec<Connection>>;

    /// Apply a partial update and return the resulting row.
    async fn update(&self, connection_id: &str, update: ConnectionUpdate) -> Result<Connection>;
}
