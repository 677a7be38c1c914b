use async_trait::async_trait;

use super::positions_model::{NewPosition, Position, PositionUpdate};
use crate::errors::Result;

/// Storage operations over position rows.
#[async_trait]
pub trait PositionRepositoryTrait: Send + Sync {
    /// All positions belonging to an account.
    fn list_by_account(&self, account_id: &str) -> Result<Vec<Position>>;

    /// Batch-insert newly observed positions.
    async fn insert_batch(&self, positions: Vec<NewPosition>) -> Result<Vec<Position>>;

    /// Batch-apply updates to existing rows, stamping `last_synced_at`.
    async fn update_batch(&self, updates: Vec<PositionUpdate>) -> Result<usize>;
}
