//! Account/position reconciliation.
//!
//! Fetched data is diffed against stored rows by external identifier and
//! applied in place. Rows that stop appearing in provider responses are
//! left alone; a partial page is not a sell signal. Running the same pass
//! twice converges to the same rows.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;

use crate::models::{BrokerAccount, BrokerPosition};
use wealthbridge_core::accounts::{AccountRepositoryTrait, AccountUpdate, NewAccount};
use wealthbridge_core::connections::{Connection, ConnectionRepositoryTrait, ConnectionUpdate};
use wealthbridge_core::errors::{DatabaseError, Error, Result};
use wealthbridge_core::instruments::{
    normalize_ticker, InstrumentRepositoryTrait, NewInstrument,
};
use wealthbridge_core::positions::{
    NewPosition, PositionRepositoryTrait, PositionUpdate, META_INSTRUMENT_ID,
};

/// Counts reported back to the caller after a reconciliation pass.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub accounts_created: usize,
    pub accounts_updated: usize,
    pub accounts_skipped: usize,
    pub positions_created: usize,
    pub positions_updated: usize,
    pub positions_skipped: usize,
}

/// Reconciles externally fetched accounts/positions against stored rows.
pub struct ReconcileService {
    connections: Arc<dyn ConnectionRepositoryTrait>,
    accounts: Arc<dyn AccountRepositoryTrait>,
    positions: Arc<dyn PositionRepositoryTrait>,
    instruments: Arc<dyn InstrumentRepositoryTrait>,
}

impl ReconcileService {
    pub fn new(
        connections: Arc<dyn ConnectionRepositoryTrait>,
        accounts: Arc<dyn AccountRepositoryTrait>,
        positions: Arc<dyn PositionRepositoryTrait>,
        instruments: Arc<dyn InstrumentRepositoryTrait>,
    ) -> Self {
        Self {
            connections,
            accounts,
            positions,
            instruments,
        }
    }

    /// Apply one fetched snapshot to the store.
    ///
    /// `fetched_positions` is keyed by the provider's external account id.
    pub async fn reconcile(
        &self,
        connection: &Connection,
        fetched_accounts: Vec<BrokerAccount>,
        fetched_positions: HashMap<String, Vec<BrokerPosition>>,
    ) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();

        // 1. Index existing accounts by external id.
        let existing_accounts = self.accounts.list_by_connection(&connection.id)?;
        let existing_by_external: HashMap<String, String> = existing_accounts
            .iter()
            .map(|a| (a.external_id.clone(), a.id.clone()))
            .collect();

        // 2. Split fetched accounts into inserts and updates.
        let mut inserts: Vec<NewAccount> = Vec::new();
        let mut updates: Vec<AccountUpdate> = Vec::new();

        for fetched in &fetched_accounts {
            let external_id = match fetched.id.as_deref().filter(|id| !id.is_empty()) {
                Some(id) => id.to_string(),
                None => {
                    warn!(
                        "Skipping account '{}' with no external id",
                        fetched.display_name()
                    );
                    summary.accounts_skipped += 1;
                    continue;
                }
            };

            if let Some(local_id) = existing_by_external.get(&external_id) {
                updates.push(AccountUpdate {
                    id: local_id.clone(),
                    name: fetched.display_name(),
                    account_type: fetched.account_type.clone(),
                    currency: fetched.currency.clone(),
                    meta: Some(fetched.meta_snapshot()),
                });
            } else {
                inserts.push(NewAccount {
                    connection_id: connection.id.clone(),
                    external_id,
                    name: fetched.display_name(),
                    account_type: fetched.account_type.clone(),
                    currency: fetched.currency.clone(),
                    meta: Some(fetched.meta_snapshot()),
                });
            }
        }

        // 3. Batch-apply, then build the definitive external-id map from
        //    post-apply state.
        summary.accounts_created = self.accounts.insert_batch(inserts).await?.len();
        summary.accounts_updated = self.accounts.update_batch(updates).await?;

        let account_ids_by_external: HashMap<String, String> = self
            .accounts
            .list_by_connection(&connection.id)?
            .into_iter()
            .map(|a| (a.external_id, a.id))
            .collect();

        // 4. Resolve every distinct ticker to a local instrument.
        let tickers: HashSet<String> = fetched_positions
            .values()
            .flatten()
            .filter_map(|p| p.symbol.as_deref().and_then(normalize_ticker))
            .collect();
        let instrument_ids = self
            .resolve_instruments(&connection.user_id, tickers)
            .await?;

        // 5. Diff positions per account.
        let mut position_inserts: Vec<NewPosition> = Vec::new();
        let mut position_updates: Vec<PositionUpdate> = Vec::new();

        for (external_account_id, positions) in &fetched_positions {
            let local_account_id = match account_ids_by_external.get(external_account_id) {
                Some(id) => id,
                None => {
                    warn!(
                        "Positions reference unknown account '{}'; skipping {} rows",
                        external_account_id,
                        positions.len()
                    );
                    summary.positions_skipped += positions.len();
                    continue;
                }
            };

            let existing_by_ticker: HashMap<String, String> = self
                .positions
                .list_by_account(local_account_id)?
                .into_iter()
                .map(|p| (p.ticker.clone(), p.id))
                .collect();

            for fetched in positions {
                let ticker = match fetched.symbol.as_deref().and_then(normalize_ticker) {
                    Some(ticker) => ticker,
                    None => {
                        warn!(
                            "Skipping position with empty symbol in account {}",
                            external_account_id
                        );
                        summary.positions_skipped += 1;
                        continue;
                    }
                };

                let quantity = match fetched.parsed_quantity() {
                    Some(quantity) => quantity,
                    None => {
                        warn!(
                            "Skipping position {} with unusable quantity {:?}",
                            ticker, fetched.quantity
                        );
                        summary.positions_skipped += 1;
                        continue;
                    }
                };

                let cost_basis = fetched.parsed_cost_basis();

                // Snapshot the provider payload and back-reference the
                // resolved instrument.
                let mut meta = fetched.meta_snapshot();
                if let (Some(obj), Some(instrument_id)) =
                    (meta.as_object_mut(), instrument_ids.get(&ticker))
                {
                    obj.insert(
                        META_INSTRUMENT_ID.to_string(),
                        serde_json::Value::String(instrument_id.clone()),
                    );
                }

                if let Some(position_id) = existing_by_ticker.get(&ticker) {
                    position_updates.push(PositionUpdate {
                        id: position_id.clone(),
                        quantity,
                        cost_basis,
                        meta: Some(meta),
                    });
                } else {
                    position_inserts.push(NewPosition {
                        account_id: local_account_id.clone(),
                        ticker,
                        quantity,
                        cost_basis,
                        meta: Some(meta),
                    });
                }
            }
        }

        // 6. Apply and stamp the connection.
        summary.positions_created = self.positions.insert_batch(position_inserts).await?.len();
        summary.positions_updated = self.positions.update_batch(position_updates).await?;

        self.connections
            .update(
                &connection.id,
                ConnectionUpdate {
                    last_synced_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            "Reconciled connection {}: {}+{} accounts, {}+{} positions ({} skipped)",
            connection.id,
            summary.accounts_created,
            summary.accounts_updated,
            summary.positions_created,
            summary.positions_updated,
            summary.accounts_skipped + summary.positions_skipped
        );

        Ok(summary)
    }

    /// Get-or-create instruments for the given normalized tickers, keyed by
    /// (owner, ticker). Returns ticker → instrument id.
    async fn resolve_instruments(
        &self,
        user_id: &str,
        tickers: HashSet<String>,
    ) -> Result<HashMap<String, String>> {
        let ticker_list: Vec<String> = tickers.into_iter().collect();
        let mut resolved: HashMap<String, String> = self
            .instruments
            .list_by_tickers(user_id, &ticker_list)?
            .into_iter()
            .map(|i| (i.ticker.clone(), i.id))
            .collect();

        for ticker in &ticker_list {
            if resolved.contains_key(ticker) {
                continue;
            }
            match self
                .instruments
                .create(NewInstrument::equity(user_id, ticker))
                .await
            {
                Ok(instrument) => {
                    debug!("Created instrument {} for {}", instrument.id, ticker);
                    resolved.insert(ticker.clone(), instrument.id);
                }
                Err(Error::Database(DatabaseError::UniqueViolation(_))) => {
                    // Lost a race with a concurrent sync; fetch the winner.
                    if let Some(existing) = self
                        .instruments
                        .list_by_tickers(user_id, std::slice::from_ref(ticker))?
                        .pop()
                    {
                        resolved.insert(ticker.clone(), existing.id);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Ok(resolved)
    }
}
