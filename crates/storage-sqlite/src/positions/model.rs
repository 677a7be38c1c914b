//! Database model for positions.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use wealthbridge_core::positions::{NewPosition, Position};

use crate::utils::{
    decimal_to_text, json_to_text, text_to_decimal, text_to_decimal_opt, text_to_json, to_utc,
    to_utc_opt,
};

/// Database model for positions. Quantities are TEXT-encoded decimals.
#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PositionDB {
    pub id: String,
    pub account_id: String,
    pub ticker: String,
    pub quantity: String,
    pub cost_basis: Option<String>,
    pub meta: Option<String>,
    pub last_synced_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<PositionDB> for Position {
    fn from(db: PositionDB) -> Self {
        Self {
            id: db.id,
            account_id: db.account_id,
            ticker: db.ticker,
            quantity: text_to_decimal(&db.quantity),
            cost_basis: text_to_decimal_opt(db.cost_basis.as_deref()),
            meta: text_to_json(db.meta),
            last_synced_at: to_utc_opt(db.last_synced_at),
            created_at: to_utc(db.created_at),
            updated_at: to_utc(db.updated_at),
        }
    }
}

impl From<NewPosition> for PositionDB {
    fn from(domain: NewPosition) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: domain.account_id,
            ticker: domain.ticker,
            quantity: decimal_to_text(domain.quantity),
            cost_basis: domain.cost_basis.map(decimal_to_text),
            meta: json_to_text(&domain.meta),
            last_synced_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }
}
