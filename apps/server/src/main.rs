mod api;
mod config;
mod error;
mod main_lib;
mod scheduler;

use config::Config;
use main_lib::{build_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env();
    let bind_addr = config.bind_addr.clone();
    let scheduler_enabled = config.scheduler_enabled;

    let state = build_state(config).await?;

    if scheduler_enabled {
        scheduler::start_refresh_scheduler(state.clone());
    } else {
        tracing::info!("Refresh scheduler disabled (WB_SCHEDULER_ENABLED=0)");
    }

    let app = api::router(state).layer(tower_http::trace::TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Wealthbridge server listening on {}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
