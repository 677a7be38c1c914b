//! HTTP client for brokerage data APIs.
//!
//! One client instance serves one provider; the server wires one up per
//! configured brokerage. All responses are JSON; non-2xx statuses are mapped
//! to the engine error taxonomy (4xx surfaced as provider rejection, the
//! rest as retryable upstream failures).

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::models::{BrokerAccount, BrokerPosition};
use wealthbridge_core::errors::{Error, Result};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How the provider expects the access token in the Authorization header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenHeader {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// `Authorization: <token>`
    Raw,
}

/// Per-provider client configuration.
#[derive(Debug, Clone)]
pub struct BrokerApiConfig {
    pub base_url: String,
    pub token_header: TokenHeader,
}

/// Trait for fetching account and position data from a brokerage API.
#[async_trait]
pub trait BrokerDataClient: Send + Sync {
    /// Fetch all accounts visible to the connection's credentials.
    async fn list_accounts(&self, access_token: &str) -> Result<Vec<BrokerAccount>>;

    /// Fetch all positions of one account.
    async fn list_positions(
        &self,
        access_token: &str,
        external_account_id: &str,
    ) -> Result<Vec<BrokerPosition>>;
}

#[derive(Debug, serde::Deserialize)]
struct ApiAccountsResponse {
    #[serde(default)]
    accounts: Vec<BrokerAccount>,
}

#[derive(Debug, serde::Deserialize)]
struct ApiPositionsResponse {
    #[serde(default)]
    positions: Vec<BrokerPosition>,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Reqwest-backed implementation of [`BrokerDataClient`].
#[derive(Debug, Clone)]
pub struct BrokerHttpClient {
    client: reqwest::Client,
    config: BrokerApiConfig,
}

impl BrokerHttpClient {
    pub fn new(config: BrokerApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Unexpected(format!("Failed to initialize HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: BrokerApiConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    fn headers(&self, access_token: &str) -> Result<HeaderMap> {
        let value = match self.config.token_header {
            TokenHeader::Bearer => format!("Bearer {}", access_token),
            TokenHeader::Raw => access_token.to_string(),
        };
        let auth = HeaderValue::from_str(&value)
            .map_err(|e| Error::Validation(format!("Invalid access token format: {}", e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, access_token: &str) -> Result<T> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!("[BrokerApi] GET {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers(access_token)?)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Request failed: {}", e)))?;

        self.parse_response(response).await
    }

    async fn parse_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Upstream(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .ok()
                .and_then(|e| e.message.or(e.error))
                .unwrap_or_else(|| body.chars().take(200).collect());

            if status.is_client_error() {
                return Err(Error::ProviderRejected {
                    status: status.as_u16(),
                    message,
                });
            }
            return Err(Error::Upstream(format!("HTTP {}: {}", status, message)));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Upstream(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl BrokerDataClient for BrokerHttpClient {
    async fn list_accounts(&self, access_token: &str) -> Result<Vec<BrokerAccount>> {
        let response: ApiAccountsResponse = self.get("/v1/accounts", access_token).await?;
        debug!("[BrokerApi] Fetched {} accounts", response.accounts.len());
        Ok(response.accounts)
    }

    async fn list_positions(
        &self,
        access_token: &str,
        external_account_id: &str,
    ) -> Result<Vec<BrokerPosition>> {
        let path = format!("/v1/accounts/{}/positions", external_account_id);
        let response: ApiPositionsResponse = self.get(&path, access_token).await?;
        debug!(
            "[BrokerApi] Fetched {} positions for account {}",
            response.positions.len(),
            external_account_id
        );
        Ok(response.positions)
    }
}
