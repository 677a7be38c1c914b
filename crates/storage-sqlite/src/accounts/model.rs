//! Database model for accounts.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use wealthbridge_core::accounts::{Account, NewAccount};

use crate::utils::{json_to_text, text_to_json, to_utc, to_utc_opt};

/// Database model for accounts
#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountDB {
    pub id: String,
    pub connection_id: String,
    pub external_id: String,
    pub name: String,
    pub account_type: Option<String>,
    pub currency: Option<String>,
    pub meta: Option<String>,
    pub last_synced_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<AccountDB> for Account {
    fn from(db: AccountDB) -> Self {
        Self {
            id: db.id,
            connection_id: db.connection_id,
            external_id: db.external_id,
            name: db.name,
            account_type: db.account_type,
            currency: db.currency,
            meta: text_to_json(db.meta),
            last_synced_at: to_utc_opt(db.last_synced_at),
            created_at: to_utc(db.created_at),
            updated_at: to_utc(db.updated_at),
        }
    }
}

impl From<NewAccount> for AccountDB {
    fn from(domain: NewAccount) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            connection_id: domain.connection_id,
            external_id: domain.external_id,
            name: domain.name,
            account_type: domain.account_type,
            currency: domain.currency,
            meta: json_to_text(&domain.meta),
            last_synced_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }
}
