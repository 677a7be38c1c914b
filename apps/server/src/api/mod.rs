//! HTTP surface of the sync engine.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::main_lib::AppState;

mod connections;
mod health;
mod oauth;
mod quotes;
mod sync;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/v1/oauth/initiate", post(oauth::initiate))
        .route("/api/v1/oauth/token", post(oauth::exchange))
        .route("/api/v1/token/submit", post(oauth::submit_token))
        .route("/api/v1/sync", post(sync::sync_connection))
        .route("/api/v1/refresh", post(sync::refresh_batch))
        .route("/api/v1/quotes/{ticker}", get(quotes::get_quote))
        .route("/api/v1/quotes/{ticker}/history", get(quotes::get_history))
        .route("/api/v1/connections", get(connections::list_connections))
        .route("/api/v1/connections/{id}", get(connections::get_connection))
        .with_state(state)
}
