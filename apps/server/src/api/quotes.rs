//! Quote and history endpoints, backed by the provider chain and the
//! backfill engine.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;
use wealthbridge_market_data::{Candle, Period, Quote};

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    /// Preferred provider id; the chain tries it first.
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub period: Option<String>,
}

pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(params): Query<QuoteParams>,
) -> ApiResult<Json<Quote>> {
    let symbol = ticker.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ApiError::BadRequest("ticker must not be empty".to_string()));
    }

    let quote = state
        .quote_chain
        .get_quote(&symbol, params.provider.as_deref())
        .await?;
    Ok(Json(quote))
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<Vec<Candle>>> {
    let symbol = ticker.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ApiError::BadRequest("ticker must not be empty".to_string()));
    }

    let period: Period = params
        .period
        .as_deref()
        .unwrap_or("1Y")
        .parse()
        .map_err(ApiError::BadRequest)?;

    let engine = state
        .backfill_engine
        .as_ref()
        .ok_or_else(|| ApiError::Internal("no market data providers configured".to_string()))?;

    let candles = engine.backfill(&symbol, period).await?;
    Ok(Json(candles))
}
