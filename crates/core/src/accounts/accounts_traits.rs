use async_trait::async_trait;

use super::accounts_model::{Account, AccountUpdate, NewAccount};
use crate::errors::Result;

/// Storage operations over account rows.
#[async_trait]
pub trait AccountRepositoryTrait: Send + Sync {
    /// All accounts belonging to a connection.
    fn list_by_connection(&self, connection_id: &str) -> Result<Vec<Account>>;

    /// Batch-insert newly observed accounts, returning the created rows.
    async fn insert_batch(&self, accounts: Vec<NewAccount>) -> Result<Vec<Account>>;

    /// Batch-apply mutable-field updates, stamping `last_synced_at`.
    async fn update_batch(&self, updates: Vec<AccountUpdate>) -> Result<usize>;
}
