//! Environment-driven server configuration.
//!
//! All variables carry the `WB_` prefix. Deployment-level values that a
//! flow requires but that are missing surface as `Error::Config` at the
//! point of use, not at startup: a deployment that never touches Alpha
//! Vantage should not need its key.

use wealthbridge_broker::{AuthFlow, BrokerApiConfig, ProviderAuthConfig, TokenHeader};

pub const PROVIDER_SNAPTRADE: &str = "snaptrade";
pub const PROVIDER_TRADIER: &str = "tradier";

const DEFAULT_DB_PATH: &str = "./data/wealthbridge.db";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8090";
/// Refresh cadence: 4 hours (not user-tunable below 1 minute to prevent
/// provider API abuse).
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 4 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub bind_addr: String,
    pub finnhub_api_key: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
    pub scheduler_enabled: bool,
    pub refresh_interval_secs: u64,
    pub refresh_batch_limit: i64,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            db_path: env_var("WB_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            bind_addr: env_var("WB_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            finnhub_api_key: env_var("WB_FINNHUB_API_KEY"),
            alpha_vantage_api_key: env_var("WB_ALPHA_VANTAGE_API_KEY"),
            scheduler_enabled: env_var("WB_SCHEDULER_ENABLED")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
            refresh_interval_secs: env_var("WB_REFRESH_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .map(|secs: u64| secs.max(60))
                .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS),
            refresh_batch_limit: env_var("WB_REFRESH_BATCH_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(wealthbridge_broker::refresh::DEFAULT_BATCH_LIMIT),
        }
    }
}

/// Auth configuration for the built-in brokerage providers.
pub fn provider_auth_configs() -> Vec<ProviderAuthConfig> {
    vec![
        ProviderAuthConfig {
            provider: PROVIDER_SNAPTRADE.to_string(),
            flow: AuthFlow::CodeExchange,
            client_id: env_var("WB_SNAPTRADE_CLIENT_ID"),
            client_secret: env_var("WB_SNAPTRADE_CLIENT_SECRET"),
            authorize_url: env_var("WB_SNAPTRADE_AUTHORIZE_URL")
                .or_else(|| Some("https://app.snaptrade.com/oauth/authorize".to_string())),
            token_url: env_var("WB_SNAPTRADE_TOKEN_URL")
                .or_else(|| Some("https://api.snaptrade.com/oauth/token".to_string())),
            default_scope: env_var("WB_SNAPTRADE_SCOPE").or_else(|| Some("read".to_string())),
        },
        // Tradier hands out static bearer tokens; no code exchange.
        ProviderAuthConfig {
            provider: PROVIDER_TRADIER.to_string(),
            flow: AuthFlow::DirectToken,
            client_id: None,
            client_secret: None,
            authorize_url: None,
            token_url: None,
            default_scope: None,
        },
    ]
}

/// Data API configuration for the built-in brokerage providers.
pub fn broker_api_configs() -> Vec<(String, BrokerApiConfig)> {
    vec![
        (
            PROVIDER_SNAPTRADE.to_string(),
            BrokerApiConfig {
                base_url: env_var("WB_SNAPTRADE_API_URL")
                    .unwrap_or_else(|| "https://api.snaptrade.com".to_string()),
                token_header: TokenHeader::Bearer,
            },
        ),
        (
            PROVIDER_TRADIER.to_string(),
            BrokerApiConfig {
                base_url: env_var("WB_TRADIER_API_URL")
                    .unwrap_or_else(|| "https://api.tradier.com".to_string()),
                token_header: TokenHeader::Bearer,
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible_without_env() {
        // Not setting WB_* here; rely on a clean test environment.
        let config = Config::from_env();
        assert!(!config.db_path.is_empty());
        assert!(config.refresh_interval_secs >= 60);
        assert!(config.refresh_batch_limit > 0);
    }

    #[test]
    fn builtin_providers_cover_both_flows() {
        let providers = provider_auth_configs();
        assert!(providers
            .iter()
            .any(|p| p.provider == PROVIDER_SNAPTRADE && p.flow == AuthFlow::CodeExchange));
        assert!(providers
            .iter()
            .any(|p| p.provider == PROVIDER_TRADIER && p.flow == AuthFlow::DirectToken));
    }
}
