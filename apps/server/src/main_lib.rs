//! Application state wiring.

use std::collections::HashMap;
use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{broker_api_configs, provider_auth_configs, Config};
use wealthbridge_broker::{
    BrokerDataClient, BrokerHttpClient, OAuthService, ReconcileService, RefreshRunner, SyncService,
};
use wealthbridge_core::connections::ConnectionRepositoryTrait;
use wealthbridge_market_data::provider::{AlphaVantageProvider, FinnhubProvider};
use wealthbridge_market_data::{BackfillEngine, MarketDataProvider, QuoteChain};
use wealthbridge_storage_sqlite::accounts::AccountRepository;
use wealthbridge_storage_sqlite::connections::ConnectionRepository;
use wealthbridge_storage_sqlite::instruments::InstrumentRepository;
use wealthbridge_storage_sqlite::positions::PositionRepository;
use wealthbridge_storage_sqlite::{create_pool, init, run_migrations};

pub struct AppState {
    pub config: Config,
    pub connection_repository: Arc<dyn ConnectionRepositoryTrait>,
    pub oauth_service: Arc<OAuthService>,
    pub sync_service: Arc<SyncService>,
    pub refresh_runner: Arc<RefreshRunner>,
    pub quote_chain: Arc<QuoteChain>,
    /// Absent when no market data provider is configured.
    pub backfill_engine: Option<Arc<BackfillEngine>>,
}

pub fn init_tracing() {
    let log_format = std::env::var("WB_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = create_pool(&db_path)?;
    run_migrations(&pool)?;

    let connection_repository: Arc<dyn ConnectionRepositoryTrait> =
        Arc::new(ConnectionRepository::new(pool.clone()));
    let account_repository = Arc::new(AccountRepository::new(pool.clone()));
    let position_repository = Arc::new(PositionRepository::new(pool.clone()));
    let instrument_repository = Arc::new(InstrumentRepository::new(pool.clone()));

    let oauth_service = Arc::new(OAuthService::new(
        connection_repository.clone(),
        provider_auth_configs(),
    ));

    let mut broker_clients: HashMap<String, Arc<dyn BrokerDataClient>> = HashMap::new();
    for (provider, api_config) in broker_api_configs() {
        let client = BrokerHttpClient::new(api_config).map_err(anyhow::Error::new)?;
        broker_clients.insert(provider, Arc::new(client));
    }

    let reconcile_service = Arc::new(ReconcileService::new(
        connection_repository.clone(),
        account_repository,
        position_repository,
        instrument_repository,
    ));

    let sync_service = Arc::new(SyncService::new(
        connection_repository.clone(),
        broker_clients,
        oauth_service.clone(),
        reconcile_service,
    ));

    let refresh_runner = Arc::new(RefreshRunner::new(
        connection_repository.clone(),
        oauth_service.clone(),
        sync_service.clone(),
        wealthbridge_broker::refresh::DEFAULT_INTER_CONNECTION_DELAY,
    ));

    // Quote providers: Finnhub first, Alpha Vantage as fallback. Callers
    // can still reorder per request.
    let mut providers: Vec<Arc<dyn MarketDataProvider>> = Vec::new();
    if let Some(key) = &config.finnhub_api_key {
        providers.push(Arc::new(FinnhubProvider::new(key.clone())));
    }
    if let Some(key) = &config.alpha_vantage_api_key {
        providers.push(Arc::new(AlphaVantageProvider::new(key.clone())));
    }
    if providers.is_empty() {
        tracing::warn!("No market data provider API keys configured; quote endpoints will fail");
    }

    let backfill_engine = providers
        .first()
        .map(|primary| Arc::new(BackfillEngine::new(primary.clone())));
    let quote_chain = Arc::new(QuoteChain::new(providers));

    Ok(Arc::new(AppState {
        config,
        connection_repository,
        oauth_service,
        sync_service,
        refresh_runner,
        quote_chain,
        backfill_engine,
    }))
}
