//! Brokerage connectivity for the Wealthbridge sync engine.
//!
//! This crate owns the OAuth negotiation state machine, the brokerage API
//! client, account/position reconciliation, and the refresh batch runner.
//! Durable state lives behind the repository traits of `wealthbridge-core`;
//! this crate holds no state between invocations.

pub mod client;
pub mod models;
pub mod oauth;
pub mod reconcile;
pub mod refresh;
pub mod sync;

#[cfg(test)]
mod testing;

pub use client::{BrokerApiConfig, BrokerDataClient, BrokerHttpClient, TokenHeader};
pub use models::{usd_amount, BrokerAccount, BrokerPosition, Money};
pub use oauth::{
    AuthFlow, AuthorizationRequest, ExchangeOutcome, OAuthService, ProviderAuthConfig,
    RefreshOutcome,
};
pub use reconcile::{ReconcileService, ReconcileSummary};
pub use refresh::{BatchFailure, RefreshBatchReport, RefreshRunner};
pub use sync::{SyncReport, SyncService};

/// Window before token expiry within which a proactive refresh is attempted.
pub fn refresh_buffer() -> chrono::Duration {
    chrono::Duration::minutes(5)
}
