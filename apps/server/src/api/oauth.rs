//! OAuth endpoints: initiate, code exchange, direct token submission.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiResult;
use crate::main_lib::AppState;
use wealthbridge_broker::{AuthorizationRequest, ExchangeOutcome};
use wealthbridge_core::connections::ConnectionStatus;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    pub connection_id: String,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    pub connection_id: String,
    pub code: String,
    pub state: Option<String>,
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTokenRequest {
    pub connection_id: String,
    pub api_token: String,
    /// Caller identity; end-user authentication is enforced outside this
    /// engine, ownership of the connection is enforced here.
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTokenResponse {
    pub status: ConnectionStatus,
}

pub async fn initiate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InitiateRequest>,
) -> ApiResult<Json<AuthorizationRequest>> {
    let request = state
        .oauth_service
        .initiate(&body.connection_id, body.redirect_uri, body.scope)
        .await?;
    Ok(Json(request))
}

pub async fn exchange(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ExchangeRequest>,
) -> ApiResult<Json<ExchangeOutcome>> {
    let outcome = state
        .oauth_service
        .exchange(
            &body.connection_id,
            &body.code,
            body.state.as_deref(),
            body.redirect_uri,
        )
        .await?;
    info!("Connection {} activated via code exchange", body.connection_id);
    Ok(Json(outcome))
}

pub async fn submit_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitTokenRequest>,
) -> ApiResult<Json<SubmitTokenResponse>> {
    let status = state
        .oauth_service
        .submit_direct_token(&body.connection_id, &body.api_token, &body.user_id)
        .await?;
    Ok(Json(SubmitTokenResponse { status }))
}
