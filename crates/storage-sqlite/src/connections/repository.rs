use async_trait::async_trait;
use diesel::prelude::*;

use crate::db::{get_connection, DbPool};
use crate::errors::DieselErrorExt;
use crate::schema::connections::dsl::*;

use super::model::{ConnectionChangeset, ConnectionDB};
use wealthbridge_core::connections::{
    Connection, ConnectionRepositoryTrait, ConnectionStatus, ConnectionUpdate,
};
use wealthbridge_core::errors::{Error, Result};

/// Repository for managing connection rows.
pub struct ConnectionRepository {
    pool: DbPool,
}

impl ConnectionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionRepositoryTrait for ConnectionRepository {
    fn get_by_id(&self, connection_id: &str) -> Result<Connection> {
        let mut conn = get_connection(&self.pool)?;

        connections
            .select(ConnectionDB::as_select())
            .find(connection_id)
            .first::<ConnectionDB>(&mut conn)
            .optional()
            .map_err(|e| e.into_core_error())?
            .map(Connection::from)
            .ok_or_else(|| Error::NotFound(format!("connection {}", connection_id)))
    }

    fn list_by_user(&self, user: &str) -> Result<Vec<Connection>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = connections
            .select(ConnectionDB::as_select())
            .filter(user_id.eq(user))
            .order(created_at.asc())
            .load::<ConnectionDB>(&mut conn)
            .map_err(|e| e.into_core_error())?;

        Ok(rows.into_iter().map(Connection::from).collect())
    }

    /// Ascending order puts NULL `last_synced_at` first, so never-synced
    /// connections are refreshed before everything else.
    fn list_active_stalest_first(&self, limit: i64) -> Result<Vec<Connection>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = connections
            .select(ConnectionDB::as_select())
            .filter(status.eq(ConnectionStatus::Active.as_str()))
            .order(last_synced_at.asc())
            .limit(limit)
            .load::<ConnectionDB>(&mut conn)
            .map_err(|e| e.into_core_error())?;

        Ok(rows.into_iter().map(Connection::from).collect())
    }

    async fn update(&self, connection_id: &str, update: ConnectionUpdate) -> Result<Connection> {
        let mut conn = get_connection(&self.pool)?;
        let changeset: ConnectionChangeset = update.into();

        let affected = diesel::update(connections.find(connection_id))
            .set(&changeset)
            .execute(&mut conn)
            .map_err(|e| e.into_core_error())?;

        if affected == 0 {
            return Err(Error::NotFound(format!("connection {}", connection_id)));
        }

        connections
            .select(ConnectionDB::as_select())
            .find(connection_id)
            .first::<ConnectionDB>(&mut conn)
            .map_err(|e| e.into_core_error())
            .map(Connection::from)
    }
}
