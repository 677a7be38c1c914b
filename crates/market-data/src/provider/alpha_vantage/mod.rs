//! Alpha Vantage market data provider implementation.
//!
//! Quotes via GLOBAL_QUOTE, history via TIME_SERIES_DAILY and
//! TIME_SERIES_INTRADAY.
//!
//! Note: Alpha Vantage free tier is limited to 5 API calls per minute, and
//! rate limiting arrives as an informational JSON payload rather than an
//! HTTP status.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{Candle, Quote, Resolution};
use crate::provider::MarketDataProvider;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";

// ============================================================================
// Response structures for Alpha Vantage API
// ============================================================================

/// GLOBAL_QUOTE response
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

/// TIME_SERIES_DAILY response
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    daily: Option<HashMap<String, Bar>>,
    #[serde(rename = "Time Series (5min)")]
    intraday: Option<HashMap<String, Bar>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Bar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: Option<String>,
}

// ============================================================================
// AlphaVantageProvider implementation
// ============================================================================

/// Alpha Vantage market data provider.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider with the given API key.
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// Make a request to the Alpha Vantage API.
    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let url = reqwest::Url::parse_with_params(BASE_URL, &all_params).map_err(|e| {
            MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to build URL: {}", e),
            }
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            if status.is_client_error() {
                return Err(MarketDataError::ClientError {
                    provider: PROVIDER_ID.to_string(),
                    status: status.as_u16(),
                    message: format!("HTTP {}", status),
                });
            }
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {}", status),
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

    /// Check for API-level errors in the response body.
    ///
    /// Alpha Vantage reports rate limiting through "Note"/"Information"
    /// payloads on a 200 response; those are treated like any other
    /// failure by the chain (always fall back, never retry in place).
    fn check_api_error(
        error_message: &Option<String>,
        note: &Option<String>,
        information: &Option<String>,
    ) -> Result<(), MarketDataError> {
        if let Some(msg) = error_message {
            if msg.contains("Invalid API call") || msg.contains("not found") {
                return Err(MarketDataError::SymbolNotFound(msg.clone()));
            }
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: msg.clone(),
            });
        }

        for msg in [note, information].into_iter().flatten() {
            if msg.contains("API call frequency")
                || msg.contains("rate limit")
                || msg.contains("requests per day")
            {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            warn!("Alpha Vantage informational response: {}", msg);
        }

        Ok(())
    }

    /// Parse a daily date (YYYY-MM-DD) or intraday timestamp
    /// (YYYY-MM-DD HH:MM:SS) to DateTime<Utc>.
    fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
            return Utc.from_local_datetime(&dt).single();
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .and_then(|dt| Utc.from_local_datetime(&dt).single())
    }

    fn parse_decimal(s: &str) -> Option<Decimal> {
        Decimal::from_str(s).ok()
    }

    /// Parse "0.58%" style change-percent strings.
    fn parse_percent(s: &str) -> Option<Decimal> {
        Decimal::from_str(s.trim().trim_end_matches('%')).ok()
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let params = [("function", "GLOBAL_QUOTE"), ("symbol", symbol)];
        let text = self.fetch(&params).await?;

        let response: GlobalQuoteResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse response: {}", e),
            })?;

        Self::check_api_error(
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        let quote = response
            .global_quote
            .filter(|q| q.symbol.is_some())
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let price = quote
            .price
            .as_deref()
            .and_then(Self::parse_decimal)
            .ok_or_else(|| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Quote for {} is missing a price", symbol),
            })?;

        let timestamp = quote
            .latest_trading_day
            .as_deref()
            .and_then(Self::parse_timestamp)
            .unwrap_or_else(Utc::now);

        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            change: quote.change.as_deref().and_then(Self::parse_decimal),
            percent_change: quote
                .change_percent
                .as_deref()
                .and_then(Self::parse_percent),
            high: quote.high.as_deref().and_then(Self::parse_decimal),
            low: quote.low.as_deref().and_then(Self::parse_decimal),
            volume: quote.volume.as_deref().and_then(Self::parse_decimal),
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
        let params: Vec<(&str, &str)> = match resolution {
            Resolution::Daily => vec![
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", "full"),
            ],
            Resolution::FiveMinute => vec![
                ("function", "TIME_SERIES_INTRADAY"),
                ("symbol", symbol),
                ("interval", "5min"),
                ("outputsize", "full"),
            ],
        };

        let text = self.fetch(&params).await?;
        let response: TimeSeriesResponse =
            serde_json::from_str(&text).map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse response: {}", e),
            })?;

        Self::check_api_error(
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        let series = response
            .daily
            .or(response.intraday)
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let mut candles: Vec<Candle> = series
            .into_iter()
            .filter_map(|(date_str, bar)| {
                let timestamp = Self::parse_timestamp(&date_str)?;
                if timestamp < start || timestamp > end {
                    return None;
                }
                Some(Candle {
                    timestamp,
                    open: Self::parse_decimal(&bar.open)?,
                    high: Self::parse_decimal(&bar.high)?,
                    low: Self::parse_decimal(&bar.low)?,
                    close: Self::parse_decimal(&bar.close)?,
                    volume: bar.volume.as_deref().and_then(Self::parse_decimal),
                })
            })
            .collect();

        candles.sort_by_key(|c| c.timestamp);

        debug!(
            "Alpha Vantage: fetched {} candles for {} ({:?})",
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
    fn parse_timestamp_handles_both_formats() {
        let daily = AlphaVantageProvider::parse_timestamp("2024-01-15").unwrap();
        assert_eq!(daily.date_naive().to_string(), "2024-01-15");

        let intraday = AlphaVantageProvider::parse_timestamp("2024-01-15 15:55:00").unwrap();
        assert_eq!(intraday.format("%H:%M").to_string(), "15:55");

        assert!(AlphaVantageProvider::parse_timestamp("15/01/2024").is_none());
    }

    #[test]
    fn parse_percent_strips_suffix() {
        assert_eq!(
            AlphaVantageProvider::parse_percent("0.5804%").unwrap().to_string(),
            "0.5804"
        );
        assert!(AlphaVantageProvider::parse_percent("n/a").is_none());
    }

    #[test]
    fn global_quote_parses() {
        let json = r#"{
            "Global Quote": {
                "01. symbol": "IBM",
                "02. open": "263.00",
                "03. high": "265.09",
                "04. low": "262.62",
                "05. price": "264.96",
                "06. volume": "3247560",
                "07. latest trading day": "2024-01-15",
                "08. previous close": "263.43",
                "09. change": "1.53",
                "10. change percent": "0.5808%"
            }
        }"#;
        let response: GlobalQuoteResponse = serde_json::from_str(json).unwrap();
        let quote = response.global_quote.unwrap();
        assert_eq!(quote.price.as_deref(), Some("264.96"));
        assert_eq!(quote.change_percent.as_deref(), Some("0.5808%"));
    }

    #[test]
    fn note_payload_classifies_as_rate_limited() {
        let result = AlphaVantageProvider::check_api_error(
            &None,
            &Some("Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute".to_string()),
            &None,
        );
        assert!(matches!(
            result,
            Err(MarketDataError::RateLimited { .. })
        ));
    }

    #[test]
    fn invalid_api_call_classifies_as_symbol_not_found() {
        let result = AlphaVantageProvider::check_api_error(
            &Some("Invalid API call. Please retry or visit the documentation".to_string()),
            &None,
            &None,
        );
        assert!(matches!(result, Err(MarketDataError::SymbolNotFound(_))));
    }
}
