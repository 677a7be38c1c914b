//! Read-only connection listing for UI callers. Tokens are never
//! serialized (the domain model skips them).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::main_lib::AppState;
use wealthbridge_core::connections::Connection;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub user_id: String,
}

pub async fn list_connections(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Connection>>> {
    let connections = state.connection_repository.list_by_user(&params.user_id)?;
    Ok(Json(connections))
}

pub async fn get_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Connection>> {
    let connection = state.connection_repository.get_by_id(&id)?;
    Ok(Json(connection))
}
