//! Database model for instruments.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use wealthbridge_core::instruments::{Instrument, NewInstrument};

use crate::utils::to_utc;

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::instruments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InstrumentDB {
    pub id: String,
    pub user_id: String,
    pub ticker: String,
    pub asset_type: String,
    pub currency: String,
    pub created_at: NaiveDateTime,
}

impl From<InstrumentDB> for Instrument {
    fn from(db: InstrumentDB) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            ticker: db.ticker,
            asset_type: db.asset_type,
            currency: db.currency,
            created_at: to_utc(db.created_at),
        }
    }
}

impl From<NewInstrument> for InstrumentDB {
    fn from(domain: NewInstrument) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: domain.user_id,
            ticker: domain.ticker,
            asset_type: domain.asset_type,
            currency: domain.currency,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}
