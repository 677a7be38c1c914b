//! Finnhub market data provider implementation.
//!
//! Quotes via /quote, history via /stock/candle.
//! Finnhub free tier is limited to 60 API calls per minute.
//! API documentation: https://finnhub.io/docs/api

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{Candle, Quote, Resolution};
use crate::provider::MarketDataProvider;

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_ID: &str = "FINNHUB";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// Change
    d: Option<f64>,
    /// Percent change
    dp: Option<f64>,
    /// High price of the day
    h: Option<f64>,
    /// Low price of the day
    l: Option<f64>,
    /// Timestamp (Unix)
    t: Option<i64>,
    // Note: o (open) and pc (previous close) exist but are not used
}

/// Response from /stock/candle endpoint
#[derive(Debug, Deserialize)]
struct CandleResponse {
    /// Status: "ok" or "no_data"
    s: String,
    /// Close prices
    #[serde(default)]
    c: Vec<f64>,
    /// High prices
    #[serde(default)]
    h: Vec<f64>,
    /// Low prices
    #[serde(default)]
    l: Vec<f64>,
    /// Open prices
    #[serde(default)]
    o: Vec<f64>,
    /// Volume
    #[serde(default)]
    v: Vec<f64>,
    /// Timestamps (Unix)
    #[serde(default)]
    t: Vec<i64>,
}

/// Error response from Finnhub
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

// ============================================================================
// FinnhubProvider
// ============================================================================

/// Finnhub market data provider.
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
}

impl FinnhubProvider {
    /// Create a new Finnhub provider with the given API key.
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// Make a GET request to the Finnhub API.
    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, MarketDataError> {
        let url = format!("{}{}", BASE_URL, endpoint);

        let mut request = self.client.get(&url);
        request = request.header("X-Finnhub-Token", &self.api_key);
        for (key, value) in params {
            request = request.query(&[(key, value)]);
        }

        debug!("Finnhub request: {} with {} params", endpoint, params.len());

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: format!("Request failed: {}", e),
                }
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        // API key quota exceeded surfaces as 403
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error)
                .unwrap_or_else(|| format!("HTTP {}", status));

            if status.is_client_error() {
                return Err(MarketDataError::ClientError {
                    provider: PROVIDER_ID.to_string(),
                    status: status.as_u16(),
                    message,
                });
            }
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message,
            });
        }

        response
            .text()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            })
    }

    fn resolution_code(resolution: Resolution) -> &'static str {
        match resolution {
            Resolution::FiveMinute => "5",
            Resolution::Daily => "D",
        }
    }

    fn decimal(value: f64) -> Option<Decimal> {
        Decimal::from_f64(value)
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let text = self.fetch("/quote", &[("symbol", symbol)]).await?;
        let response: QuoteResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse quote response: {}", e),
            })?;

        // Finnhub answers unknown symbols with an all-zero payload.
        let price = match response.c {
            Some(c) if c != 0.0 => Self::decimal(c),
            _ => None,
        }
        .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let timestamp = response
            .t
            .and_then(|t| Utc.timestamp_opt(t, 0).single())
            .unwrap_or_else(Utc::now);

        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            change: response.d.and_then(Self::decimal),
            percent_change: response.dp.and_then(Self::decimal),
            high: response.h.and_then(Self::decimal),
            low: response.l.and_then(Self::decimal),
            volume: None,
            timestamp,
            provider: PROVIDER_ID.to_string(),
        })
    }

    async fn get_candles(
        &self,
        symbol: &str,
        resolution: Resolution,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let from = start.timestamp().to_string();
        let to = end.timestamp().to_string();
        let params = [
            ("symbol", symbol),
            ("resolution", Self::resolution_code(resolution)),
            ("from", from.as_str()),
            ("to", to.as_str()),
        ];

        let text = self.fetch("/stock/candle", &params).await?;
        let response: CandleResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse candle response: {}", e),
            })?;

        if response.s == "no_data" {
            return Err(MarketDataError::NoDataForRange);
        }
        if response.s != "ok" {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Unexpected candle status: {}", response.s),
            });
        }

        let mut candles: Vec<Candle> = response
            .t
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| {
                let timestamp = Utc.timestamp_opt(*ts, 0).single()?;
                Some(Candle {
                    timestamp,
                    open: Self::decimal(*response.o.get(i)?)?,
                    high: Self::decimal(*response.h.get(i)?)?,
                    low: Self::decimal(*response.l.get(i)?)?,
                    close: Self::decimal(*response.c.get(i)?)?,
                    volume: response.v.get(i).copied().and_then(Self::decimal),
                })
            })
            .collect();

        candles.sort_by_key(|c| c.timestamp);

        debug!(
            "Finnhub: fetched {} candles for {} ({:?})",
            candles.len(),
            symbol,
            resolution
        );

        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_id_is_stable() {
        let provider = FinnhubProvider::new("test_key".to_string());
        assert_eq!(provider.id(), "FINNHUB");
    }

    #[test]
    fn quote_response_parses() {
        let json = r#"{"c": 261.74, "d": 1.5, "dp": 0.58, "h": 263.31, "l": 260.68, "o": 261.07, "pc": 260.24, "t": 1582641000}"#;
        let response: QuoteResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.c, Some(261.74));
        assert_eq!(response.dp, Some(0.58));
        assert_eq!(response.t, Some(1582641000));
    }

    #[test]
    fn candle_response_parses_no_data() {
        let json = r#"{"s": "no_data"}"#;
        let response: CandleResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.s, "no_data");
        assert!(response.c.is_empty());
    }

    #[test]
    fn resolution_codes() {
        assert_eq!(FinnhubProvider::resolution_code(Resolution::FiveMinute), "5");
        assert_eq!(FinnhubProvider::resolution_code(Resolution::Daily), "D");
    }
}
