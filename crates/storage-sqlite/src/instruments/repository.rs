use async_trait::async_trait;
use diesel::prelude::*;

use crate::db::{get_connection, DbPool};
use crate::errors::DieselErrorExt;
use crate::schema::instruments::dsl::*;

use super::model::InstrumentDB;
use wealthbridge_core::errors::Result;
use wealthbridge_core::instruments::{Instrument, InstrumentRepositoryTrait, NewInstrument};

/// Repository for managing instrument rows.
pub struct InstrumentRepository {
    pool: DbPool,
}

impl InstrumentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstrumentRepositoryTrait for InstrumentRepository {
    fn list_by_tickers(&self, user: &str, tickers: &[String]) -> Result<Vec<Instrument>> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = get_connection(&self.pool)?;

        let rows = instruments
            .select(InstrumentDB::as_select())
            .filter(user_id.eq(user))
            .filter(ticker.eq_any(tickers))
            .load::<InstrumentDB>(&mut conn)
            .map_err(|e| e.into_core_error())?;

        Ok(rows.into_iter().map(Instrument::from).collect())
    }

    async fn create(&self, instrument: NewInstrument) -> Result<Instrument> {
        let mut conn = get_connection(&self.pool)?;
        let row: InstrumentDB = instrument.into();

        diesel::insert_into(instruments)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| e.into_core_error())?;

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_pool;
    use wealthbridge_core::errors::{DatabaseError, Error};

    #[tokio::test]
    async fn create_then_list_by_ticker() {
        let pool = memory_pool();
        let repo = InstrumentRepository::new(pool);

        let created = repo
            .create(NewInstrument::equity("user-1", "AAPL"))
            .await
            .unwrap();
        assert_eq!(created.asset_type, "EQUITY");
        assert_eq!(created.currency, "USD");

        let found = repo
            .list_by_tickers("user-1", &["AAPL".to_string(), "MSFT".to_string()])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ticker, "AAPL");

        // Another user does not see it
        assert!(repo
            .list_by_tickers("user-2", &["AAPL".to_string()])
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn duplicate_ticker_for_same_user_violates_uniqueness() {
        let pool = memory_pool();
        let repo = InstrumentRepository::new(pool);

        repo.create(NewInstrument::equity("user-1", "AAPL"))
            .await
            .unwrap();
        let dup = repo.create(NewInstrument::equity("user-1", "AAPL")).await;
        assert!(matches!(
            dup,
            Err(Error::Database(DatabaseError::UniqueViolation(_)))
        ));
    }
}
