//! Background scheduler for periodic connection refresh.

use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

use crate::main_lib::AppState;

/// Initial delay before the first batch (let the server fully start).
const INITIAL_DELAY_SECS: u64 = 60;

/// Starts the background refresh scheduler.
pub fn start_refresh_scheduler(state: Arc<AppState>) {
    let interval_secs = state.config.refresh_interval_secs;
    tokio::spawn(async move {
        info!(
            "Refresh scheduler started ({}s interval)",
            interval_secs
        );

        tokio::time::sleep(Duration::from_secs(INITIAL_DELAY_SECS)).await;

        // First tick is immediate, subsequent ticks are interval apart.
        let mut tick = interval(Duration::from_secs(interval_secs));
        loop {
            tick.tick().await;
            run_scheduled_batch(&state).await;
        }
    });
}

async fn run_scheduled_batch(state: &Arc<AppState>) {
    info!("Running scheduled refresh batch...");

    match state
        .refresh_runner
        .run(state.config.refresh_batch_limit)
        .await
    {
        Ok(report) => {
            if report.connections == 0 {
                info!("Scheduled refresh: no active connections");
            } else {
                info!(
                    "Scheduled refresh completed: {} synced, {} refreshed, {} failures",
                    report.synced,
                    report.refreshed,
                    report.failures.len()
                );
            }
        }
        Err(e) => warn!("Scheduled refresh batch failed: {}", e),
    }
}
