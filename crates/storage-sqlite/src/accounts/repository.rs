use async_trait::async_trait;
use diesel::prelude::*;

use crate::db::{get_connection, DbPool};
use crate::errors::DieselErrorExt;
use crate::schema::accounts::dsl::*;
use crate::utils::json_to_text;

use super::model::AccountDB;
use wealthbridge_core::accounts::{Account, AccountRepositoryTrait, AccountUpdate, NewAccount};
use wealthbridge_core::errors::Result;

/// Repository for managing account rows.
pub struct AccountRepository {
    pool: DbPool,
}

impl AccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepositoryTrait for AccountRepository {
    fn list_by_connection(&self, connection: &str) -> Result<Vec<Account>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = accounts
            .select(AccountDB::as_select())
            .filter(connection_id.eq(connection))
            .order(name.asc())
            .load::<AccountDB>(&mut conn)
            .map_err(|e| e.into_core_error())?;

        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn insert_batch(&self, new_accounts: Vec<NewAccount>) -> Result<Vec<Account>> {
        if new_accounts.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = get_connection(&self.pool)?;
        let rows: Vec<AccountDB> = new_accounts.into_iter().map(AccountDB::from).collect();

        diesel::insert_into(accounts)
            .values(&rows)
            .execute(&mut conn)
            .map_err(|e| e.into_core_error())?;

        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn update_batch(&self, updates: Vec<AccountUpdate>) -> Result<usize> {
        if updates.is_empty() {
            return Ok(0);
        }

        let mut conn = get_connection(&self.pool)?;
        let now = chrono::Utc::now().naive_utc();
        let mut updated = 0;

        for update in updates {
            updated += diesel::update(accounts.find(&update.id))
                .set((
                    name.eq(update.name),
                    account_type.eq(update.account_type),
                    currency.eq(update.currency),
                    meta.eq(json_to_text(&update.meta)),
                    last_synced_at.eq(Some(now)),
                    updated_at.eq(now),
                ))
                .execute(&mut conn)
                .map_err(|e| e.into_core_error())?;
        }

        Ok(updated)
    }
}
