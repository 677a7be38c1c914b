//! In-memory trait implementations shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::client::BrokerDataClient;
use crate::models::{BrokerAccount, BrokerPosition};
use wealthbridge_core::accounts::{Account, AccountRepositoryTrait, AccountUpdate, NewAccount};
use wealthbridge_core::connections::{
    Connection, ConnectionRepositoryTrait, ConnectionStatus, ConnectionUpdate,
};
use wealthbridge_core::credentials::SecretToken;
use wealthbridge_core::errors::{Error, Result};
use wealthbridge_core::instruments::{Instrument, InstrumentRepositoryTrait, NewInstrument};
use wealthbridge_core::positions::{
    NewPosition, Position, PositionRepositoryTrait, PositionUpdate,
};

pub struct InMemoryConnectionRepo {
    rows: Mutex<HashMap<String, Connection>>,
}

impl InMemoryConnectionRepo {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert_pending(&self, id: &str, provider: &str, user_id: &str) {
        let now = Utc::now();
        let connection = Connection {
            id: id.to_string(),
            provider: provider.to_string(),
            user_id: user_id.to_string(),
            status: ConnectionStatus::Pending,
            access_token: None,
            refresh_token: None,
            access_token_expires_at: None,
            meta: None,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().insert(id.to_string(), connection);
    }

    pub fn insert_active(&self, id: &str, provider: &str, user_id: &str, token: &str) {
        self.insert_pending(id, provider, user_id);
        let mut rows = self.rows.lock().unwrap();
        let connection = rows.get_mut(id).unwrap();
        connection.status = ConnectionStatus::Active;
        connection.access_token = Some(SecretToken::encode(token));
    }

    pub fn set_meta(&self, id: &str, meta: serde_json::Value) {
        let mut rows = self.rows.lock().unwrap();
        rows.get_mut(id).unwrap().meta = Some(meta);
    }
}

#[async_trait]
impl ConnectionRepositoryTrait for InMemoryConnectionRepo {
    fn get_by_id(&self, connection_id: &str) -> Result<Connection> {
        self.rows
            .lock()
            .unwrap()
            .get(connection_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("connection {}", connection_id)))
    }

    fn list_by_user(&self, user_id: &str) -> Result<Vec<Connection>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    fn list_active_stalest_first(&self, limit: i64) -> Result<Vec<Connection>> {
        let mut active: Vec<Connection> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.status == ConnectionStatus::Active)
            .cloned()
            .collect();
        active.sort_by_key(|c| (c.last_synced_at.is_some(), c.last_synced_at, c.id.clone()));
        active.truncate(limit as usize);
        Ok(active)
    }

    async fn update(&self, connection_id: &str, update: ConnectionUpdate) -> Result<Connection> {
        let mut rows = self.rows.lock().unwrap();
        let connection = rows
            .get_mut(connection_id)
            .ok_or_else(|| Error::NotFound(format!("connection {}", connection_id)))?;

        if let Some(status) = update.status {
            connection.status = status;
        }
        if let Some(token) = update.access_token {
            connection.access_token = token;
        }
        if let Some(token) = update.refresh_token {
            connection.refresh_token = token;
        }
        if let Some(expiry) = update.access_token_expires_at {
            connection.access_token_expires_at = expiry;
        }
        if let Some(meta) = update.meta {
            connection.meta = meta;
        }
        if let Some(ts) = update.last_synced_at {
            connection.last_synced_at = Some(ts);
        }
        connection.updated_at = Utc::now();

        Ok(connection.clone())
    }
}

pub struct InMemoryAccountRepo {
    rows: Mutex<Vec<Account>>,
}

impl InMemoryAccountRepo {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AccountRepositoryTrait for InMemoryAccountRepo {
    fn list_by_connection(&self, connection_id: &str) -> Result<Vec<Account>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.connection_id == connection_id)
            .cloned()
            .collect())
    }

    async fn insert_batch(&self, accounts: Vec<NewAccount>) -> Result<Vec<Account>> {
        let now = Utc::now();
        let mut rows = self.rows.lock().unwrap();
        let mut created = Vec::new();
        for new_account in accounts {
            let account = Account {
                id: uuid::Uuid::new_v4().to_string(),
                connection_id: new_account.connection_id,
                external_id: new_account.external_id,
                name: new_account.name,
                account_type: new_account.account_type,
                currency: new_account.currency,
                meta: new_account.meta,
                last_synced_at: Some(now),
                created_at: now,
                updated_at: now,
            };
            rows.push(account.clone());
            created.push(account);
        }
        Ok(created)
    }

    async fn update_batch(&self, updates: Vec<AccountUpdate>) -> Result<usize> {
        let now = Utc::now();
        let mut rows = self.rows.lock().unwrap();
        let mut updated = 0;
        for update in updates {
            if let Some(account) = rows.iter_mut().find(|a| a.id == update.id) {
                account.name = update.name;
                account.account_type = update.account_type;
                account.currency = update.currency;
                account.meta = update.meta;
                account.last_synced_at = Some(now);
                account.updated_at = now;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

pub struct InMemoryPositionRepo {
    rows: Mutex<Vec<Position>>,
}

impl InMemoryPositionRepo {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn all(&self) -> Vec<Position> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl PositionRepositoryTrait for InMemoryPositionRepo {
    fn list_by_account(&self, account_id: &str) -> Result<Vec<Position>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn insert_batch(&self, positions: Vec<NewPosition>) -> Result<Vec<Position>> {
        let now = Utc::now();
        let mut rows = self.rows.lock().unwrap();
        let mut created = Vec::new();
        for new_position in positions {
            let position = Position {
                id: uuid::Uuid::new_v4().to_string(),
                account_id: new_position.account_id,
                ticker: new_position.ticker,
                quantity: new_position.quantity,
                cost_basis: new_position.cost_basis,
                meta: new_position.meta,
                last_synced_at: Some(now),
                created_at: now,
                updated_at: now,
            };
            rows.push(position.clone());
            created.push(position);
        }
        Ok(created)
    }

    async fn update_batch(&self, updates: Vec<PositionUpdate>) -> Result<usize> {
        let now = Utc::now();
        let mut rows = self.rows.lock().unwrap();
        let mut updated = 0;
        for update in updates {
            if let Some(position) = rows.iter_mut().find(|p| p.id == update.id) {
                position.quantity = update.quantity;
                position.cost_basis = update.cost_basis;
                position.meta = update.meta;
                position.last_synced_at = Some(now);
                position.updated_at = now;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

pub struct InMemoryInstrumentRepo {
    rows: Mutex<Vec<Instrument>>,
}

impl InMemoryInstrumentRepo {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn all(&self) -> Vec<Instrument> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl InstrumentRepositoryTrait for InMemoryInstrumentRepo {
    fn list_by_tickers(&self, user_id: &str, tickers: &[String]) -> Result<Vec<Instrument>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == user_id && tickers.contains(&i.ticker))
            .cloned()
            .collect())
    }

    async fn create(&self, instrument: NewInstrument) -> Result<Instrument> {
        let created = Instrument {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: instrument.user_id,
            ticker: instrument.ticker,
            asset_type: instrument.asset_type,
            currency: instrument.currency,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(created.clone());
        Ok(created)
    }
}

/// Scripted broker API client. Accounts and positions are keyed by the
/// access token the engine presents, so tests can vary behavior per
/// connection; tokens in `failing_tokens` raise an upstream error.
pub struct ScriptedBrokerClient {
    pub accounts_by_token: Mutex<HashMap<String, Vec<BrokerAccount>>>,
    pub positions_by_account: Mutex<HashMap<String, Vec<BrokerPosition>>>,
    pub failing_tokens: Mutex<Vec<String>>,
}

impl ScriptedBrokerClient {
    pub fn new() -> Self {
        Self {
            accounts_by_token: Mutex::new(HashMap::new()),
            positions_by_account: Mutex::new(HashMap::new()),
            failing_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn script_accounts(&self, token: &str, accounts: Vec<BrokerAccount>) {
        self.accounts_by_token
            .lock()
            .unwrap()
            .insert(token.to_string(), accounts);
    }

    pub fn script_positions(&self, external_account_id: &str, positions: Vec<BrokerPosition>) {
        self.positions_by_account
            .lock()
            .unwrap()
            .insert(external_account_id.to_string(), positions);
    }

    pub fn fail_for_token(&self, token: &str) {
        self.failing_tokens.lock().unwrap().push(token.to_string());
    }
}

#[async_trait]
impl BrokerDataClient for ScriptedBrokerClient {
    async fn list_accounts(&self, access_token: &str) -> Result<Vec<BrokerAccount>> {
        if self
            .failing_tokens
            .lock()
            .unwrap()
            .contains(&access_token.to_string())
        {
            return Err(Error::Upstream("scripted failure".to_string()));
        }
        Ok(self
            .accounts_by_token
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_positions(
        &self,
        _access_token: &str,
        external_account_id: &str,
    ) -> Result<Vec<BrokerPosition>> {
        Ok(self
            .positions_by_account
            .lock()
            .unwrap()
            .get(external_account_id)
            .cloned()
            .unwrap_or_default())
    }
}
