//! Sync and refresh-batch endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::error::ApiResult;
use crate::main_lib::AppState;
use wealthbridge_broker::{RefreshBatchReport, SyncReport};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub connection_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshParams {
    pub limit: Option<i64>,
}

pub async fn sync_connection(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SyncRequest>,
) -> ApiResult<Json<SyncReport>> {
    let report = state.sync_service.sync_connection(&body.connection_id).await?;
    info!(
        "Synced connection {}: {} accounts, {} positions",
        report.connection_id, report.accounts, report.positions
    );
    Ok(Json(report))
}

pub async fn refresh_batch(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RefreshParams>,
) -> ApiResult<Json<RefreshBatchReport>> {
    let limit = params
        .limit
        .unwrap_or(state.config.refresh_batch_limit)
        .clamp(1, 100);
    let report = state.refresh_runner.run(limit).await?;
    Ok(Json(report))
}
