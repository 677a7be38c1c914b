//! Periodic refresh batch over the stalest active connections.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{info, warn};
use serde::Serialize;

use crate::oauth::OAuthService;
use crate::refresh_buffer;
use crate::sync::SyncService;
use wealthbridge_core::connections::ConnectionRepositoryTrait;
use wealthbridge_core::errors::Result;

/// Default cap on connections processed per batch.
pub const DEFAULT_BATCH_LIMIT: i64 = 10;

/// Default pause between connections. Keeps a batch under provider
/// per-minute call limits.
pub const DEFAULT_INTER_CONNECTION_DELAY: Duration = Duration::from_secs(2);

/// One connection's failure inside a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub connection_id: String,
    pub error: String,
}

/// Outcome of one refresh batch.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshBatchReport {
    /// Connections selected for this batch.
    pub connections: usize,
    /// Connections whose token was actually rotated.
    pub refreshed: usize,
    /// Connections that completed fetch-and-reconcile.
    pub synced: usize,
    pub failures: Vec<BatchFailure>,
}

/// Processes refresh batches. Connections are handled strictly
/// sequentially; one bad connection never blocks the rest.
pub struct RefreshRunner {
    connections: Arc<dyn ConnectionRepositoryTrait>,
    oauth: Arc<OAuthService>,
    sync: Arc<SyncService>,
    delay: Duration,
}

impl RefreshRunner {
    pub fn new(
        connections: Arc<dyn ConnectionRepositoryTrait>,
        oauth: Arc<OAuthService>,
        sync: Arc<SyncService>,
        delay: Duration,
    ) -> Self {
        Self {
            connections,
            oauth,
            sync,
            delay,
        }
    }

    /// Run one batch: select up to `limit` active connections (stalest
    /// first), refresh tokens inside the expiry buffer, and reconcile each.
    pub async fn run(&self, limit: i64) -> Result<RefreshBatchReport> {
        let candidates = self.connections.list_active_stalest_first(limit)?;
        let mut report = RefreshBatchReport {
            connections: candidates.len(),
            ..Default::default()
        };

        for (index, connection) in candidates.iter().enumerate() {
            // Delay between connections, not within a connection's own
            // sub-calls.
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            if connection.needs_refresh(Utc::now(), refresh_buffer()) {
                match self.oauth.refresh(connection).await {
                    Ok(outcome) if outcome.refreshed => report.refreshed += 1,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Refresh failed for connection {}: {}", connection.id, e);
                        report.failures.push(BatchFailure {
                            connection_id: connection.id.clone(),
                            error: e.to_string(),
                        });
                        continue;
                    }
                }
            }

            match self.sync.sync_connection(&connection.id).await {
                Ok(_) => report.synced += 1,
                Err(e) => {
                    warn!("Sync failed for connection {}: {}", connection.id, e);
                    report.failures.push(BatchFailure {
                        connection_id: connection.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Refresh batch done: {} connections, {} refreshed, {} synced, {} failures",
            report.connections,
            report.refreshed,
            report.synced,
            report.failures.len()
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BrokerDataClient;
    use crate::models::BrokerAccount;
    use crate::oauth::{AuthFlow, ProviderAuthConfig};
    use crate::reconcile::ReconcileService;
    use crate::testing::{
        InMemoryAccountRepo, InMemoryConnectionRepo, InMemoryInstrumentRepo, InMemoryPositionRepo,
        ScriptedBrokerClient,
    };
    use std::collections::HashMap;

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

    fn account(id: &str) -> BrokerAccount {
        BrokerAccount {
            id: Some(id.to_string()),
            name: Some(format!("Account {}", id)),
            account_type: None,
            currency: Some("USD".to_string()),
            extra: Default::default(),
        }
    }

    #[tokio::test]
    async fn one_failing_connection_does_not_abort_the_batch() {
        let connections = Arc::new(InMemoryConnectionRepo::new());
        connections.insert_active("c1", "tradier", "user-1", "tok-1");
        connections.insert_active("c2", "tradier", "user-1", "tok-2");
        connections.insert_active("c3", "tradier", "user-1", "tok-3");

        let client = Arc::new(ScriptedBrokerClient::new());
        client.script_accounts("tok-1", vec![account("A1")]);
        client.script_accounts("tok-3", vec![account("A3")]);
        client.fail_for_token("tok-2");

        let oauth = Arc::new(OAuthService::new(
            connections.clone(),
            vec![direct_token_provider()],
        ));
        let reconciler = Arc::new(ReconcileService::new(
            connections.clone(),
            Arc::new(InMemoryAccountRepo::new()),
            Arc::new(InMemoryPositionRepo::new()),
            Arc::new(InMemoryInstrumentRepo::new()),
        ));
        let sync = Arc::new(SyncService::new(
            connections.clone(),
            HashMap::from([(
                "tradier".to_string(),
                client.clone() as Arc<dyn BrokerDataClient>,
            )]),
            oauth.clone(),
            reconciler,
        ));
        let runner = RefreshRunner::new(connections, oauth, sync, Duration::ZERO);

        let report = runner.run(10).await.unwrap();

        assert_eq!(report.connections, 3);
        assert_eq!(report.synced, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].connection_id, "c2");
        // Static tokens never rotate.
        assert_eq!(report.refreshed, 0);
    }

    #[tokio::test]
    async fn empty_batch_is_a_clean_no_op() {
        let connections = Arc::new(InMemoryConnectionRepo::new());
        let oauth = Arc::new(OAuthService::new(
            connections.clone(),
            vec![direct_token_provider()],
        ));
        let reconciler = Arc::new(ReconcileService::new(
            connections.clone(),
            Arc::new(InMemoryAccountRepo::new()),
            Arc::new(InMemoryPositionRepo::new()),
            Arc::new(InMemoryInstrumentRepo::new()),
        ));
        let sync = Arc::new(SyncService::new(
            connections.clone(),
            HashMap::new(),
            oauth.clone(),
            reconciler,
        ));
        let runner = RefreshRunner::new(connections, oauth, sync, Duration::ZERO);

        let report = runner.run(10).await.unwrap();
        assert_eq!(report.connections, 0);
        assert!(report.failures.is_empty());
    }
}
