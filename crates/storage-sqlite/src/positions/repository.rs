use async_trait::async_trait;
use diesel::prelude::*;

use crate::db::{get_connection, DbPool};
use crate::errors::DieselErrorExt;
use crate::schema::positions::dsl::*;
use crate::utils::{decimal_to_text, json_to_text};

use super::model::PositionDB;
use wealthbridge_core::errors::Result;
use wealthbridge_core::positions::{
    NewPosition, Position, PositionRepositoryTrait, PositionUpdate,
};

/// Repository for managing position rows.
pub struct PositionRepository {
    pool: DbPool,
}

impl PositionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PositionRepositoryTrait for PositionRepository {
    fn list_by_account(&self, account: &str) -> Result<Vec<Position>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = positions
            .select(PositionDB::as_select())
            .filter(account_id.eq(account))
            .order(ticker.asc())
            .load::<PositionDB>(&mut conn)
            .map_err(|e| e.into_core_error())?;

        Ok(rows.into_iter().map(Position::from).collect())
    }

    async fn insert_batch(&self, new_positions: Vec<NewPosition>) -> Result<Vec<Position>> {
        if new_positions.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = get_connection(&self.pool)?;
        let rows: Vec<PositionDB> = new_positions.into_iter().map(PositionDB::from).collect();

        diesel::insert_into(positions)
            .values(&rows)
            .execute(&mut conn)
            .map_err(|e| e.into_core_error())?;

        Ok(rows.into_iter().map(Position::from).collect())
    }

    async fn update_batch(&self, updates: Vec<PositionUpdate>) -> Result<usize> {
        if updates.is_empty() {
            return Ok(0);
        }

        let mut conn = get_connection(&self.pool)?;
        let now = chrono::Utc::now().naive_utc();
        let mut updated = 0;

        for update in updates {
            updated += diesel::update(positions.find(&update.id))
                .set((
                    quantity.eq(decimal_to_text(update.quantity)),
                    cost_basis.eq(update.cost_basis.map(decimal_to_text)),
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
