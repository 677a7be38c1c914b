//! Fetch-and-reconcile for a single connection.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::debug;
use serde::Serialize;

use crate::client::BrokerDataClient;
use crate::models::BrokerPosition;
use crate::oauth::OAuthService;
use crate::reconcile::{ReconcileService, ReconcileSummary};
use crate::refresh_buffer;
use wealthbridge_core::connections::{ConnectionRepositoryTrait, ConnectionStatus};
use wealthbridge_core::errors::{Error, Result};

/// Result of a single-connection sync, shaped for the HTTP layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub connection_id: String,
    pub status: ConnectionStatus,
    /// Accounts reported by the provider in this fetch.
    pub accounts: usize,
    /// Positions reported by the provider in this fetch.
    pub positions: usize,
    pub summary: ReconcileSummary,
}

/// Orchestrates token freshness, provider fetches, and reconciliation for
/// one connection. Provider calls for a connection are issued strictly
/// sequentially; most provider limits are per-minute call counts.
pub struct SyncService {
    connections: Arc<dyn ConnectionRepositoryTrait>,
    clients: HashMap<String, Arc<dyn BrokerDataClient>>,
    oauth: Arc<OAuthService>,
    reconciler: Arc<ReconcileService>,
}

impl SyncService {
    pub fn new(
        connections: Arc<dyn ConnectionRepositoryTrait>,
        clients: HashMap<String, Arc<dyn BrokerDataClient>>,
        oauth: Arc<OAuthService>,
        reconciler: Arc<ReconcileService>,
    ) -> Self {
        Self {
            connections,
            clients,
            oauth,
            reconciler,
        }
    }

    /// Fetch accounts and positions from the provider and reconcile them
    /// into the store, refreshing the access token first when it is inside
    /// the expiry buffer.
    pub async fn sync_connection(&self, connection_id: &str) -> Result<SyncReport> {
        let connection = self.connections.get_by_id(connection_id)?;

        let client = self
            .clients
            .get(&connection.provider)
            .ok_or_else(|| {
                Error::Config(format!(
                    "no API client configured for provider {}",
                    connection.provider
                ))
            })?
            .clone();

        // Make sure we call the provider with a usable token.
        let access_token = if connection.needs_refresh(Utc::now(), refresh_buffer()) {
            self.oauth.refresh(&connection).await?.access_token
        } else {
            connection
                .access_token
                .as_ref()
                .map(|t| t.decode())
                .transpose()?
        };
        let access_token = access_token.ok_or_else(|| Error::ProviderRejected {
            status: 401,
            message: format!(
                "connection {} has no access token and no refresh path",
                connection_id
            ),
        })?;

        let fetched_accounts = client.list_accounts(&access_token).await?;
        debug!(
            "Fetched {} accounts for connection {}",
            fetched_accounts.len(),
            connection_id
        );

        let mut fetched_positions: HashMap<String, Vec<BrokerPosition>> = HashMap::new();
        for account in &fetched_accounts {
            if let Some(external_id) = account.id.as_deref().filter(|id| !id.is_empty()) {
                let positions = client.list_positions(&access_token, external_id).await?;
                fetched_positions.insert(external_id.to_string(), positions);
            }
        }
        let position_count: usize = fetched_positions.values().map(Vec::len).sum();

        let summary = self
            .reconciler
            .reconcile(&connection, fetched_accounts.clone(), fetched_positions)
            .await?;

        let after = self.connections.get_by_id(connection_id)?;
        Ok(SyncReport {
            connection_id: connection_id.to_string(),
            status: after.status,
            accounts: fetched_accounts.len(),
            positions: position_count,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BrokerAccount;
    use crate::oauth::{AuthFlow, ProviderAuthConfig};
    use crate::testing::{
        InMemoryAccountRepo, InMemoryConnectionRepo, InMemoryInstrumentRepo, InMemoryPositionRepo,
        ScriptedBrokerClient,
    };
    use serde_json::json;

    fn direct_token_provider() -> ProviderAuthConfig {
        ProviderAuthConfig {
            provider: "tradier".to_string(),
            flow: AuthFlow::DirectToken,
            client_id: None,
            client_secret: None,
            authorize_url: None,
            token_url: None,
            default_scope: None,
        }
    }

    fn build_service(
        connections: Arc<InMemoryConnectionRepo>,
        client: Arc<ScriptedBrokerClient>,
    ) -> SyncService {
        let accounts = Arc::new(InMemoryAccountRepo::new());
        let positions = Arc::new(InMemoryPositionRepo::new());
        let instruments = Arc::new(InMemoryInstrumentRepo::new());
        let oauth = Arc::new(OAuthService::new(
            connections.clone(),
            vec![direct_token_provider()],
        ));
        let reconciler = Arc::new(ReconcileService::new(
            connections.clone(),
            accounts,
            positions,
            instruments,
        ));
        SyncService::new(
            connections,
            HashMap::from([(
                "tradier".to_string(),
                client as Arc<dyn BrokerDataClient>,
            )]),
            oauth,
            reconciler,
        )
    }

    #[tokio::test]
    async fn syncs_accounts_and_positions_end_to_end() {
        let connections = Arc::new(InMemoryConnectionRepo::new());
        connections.insert_active("c1", "tradier", "user-1", "tok-1");

        let client = Arc::new(ScriptedBrokerClient::new());
        client.script_accounts(
            "tok-1",
            vec![BrokerAccount {
                id: Some("A1".to_string()),
                name: Some("Main".to_string()),
                account_type: None,
                currency: Some("USD".to_string()),
                extra: Default::default(),
            }],
        );
        client.script_positions(
            "A1",
            vec![crate::models::BrokerPosition {
                symbol: Some("aapl".to_string()),
                quantity: Some(json!("2")),
                cost_basis: None,
                extra: Default::default(),
            }],
        );

        let service = build_service(connections, client);
        let report = service.sync_connection("c1").await.unwrap();

        assert_eq!(report.accounts, 1);
        assert_eq!(report.positions, 1);
        assert_eq!(report.status, ConnectionStatus::Active);
        assert_eq!(report.summary.positions_created, 1);
    }

    #[tokio::test]
    async fn unknown_provider_is_a_config_error() {
        let connections = Arc::new(InMemoryConnectionRepo::new());
        connections.insert_active("c1", "mystery-broker", "user-1", "tok-1");
        let service = build_service(connections, Arc::new(ScriptedBrokerClient::new()));

        let err = service.sync_connection("c1").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
