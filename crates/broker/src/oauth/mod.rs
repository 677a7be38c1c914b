//! OAuth negotiation for brokerage connections.
//!
//! Drives the three-phase authorization-code flow
//! (`initiate → redirect → exchange`) and, for providers whose API uses a
//! static bearer-style token, the direct submission path. Also owns token
//! refresh, including the `requires_auth` transition when a provider
//! rejects the refresh grant.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use serde::Deserialize;
use uuid::Uuid;

use wealthbridge_core::connections::{
    Connection, ConnectionRepositoryTrait, ConnectionStatus, ConnectionUpdate, META_OAUTH_REDIRECT_URI,
    META_OAUTH_STATE,
};
use wealthbridge_core::credentials::SecretToken;
use wealthbridge_core::errors::{Error, Result};

/// Timeout for token endpoint calls.
const TOKEN_TIMEOUT_SECS: u64 = 15;

/// How a provider hands out credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    /// Standard authorization-code exchange.
    CodeExchange,
    /// The user pastes a static API token; no authorize/token endpoints.
    DirectToken,
}

/// Auth-related configuration for one provider.
#[derive(Debug, Clone)]
pub struct ProviderAuthConfig {
    pub provider: String,
    pub flow: AuthFlow,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub default_scope: Option<String>,
}

/// Result of `initiate`: where to send the user, and the CSRF state that
/// was persisted.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequest {
    pub authorization_url: String,
    pub state: String,
}

/// Result of a successful code exchange.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeOutcome {
    pub status: ConnectionStatus,
    pub access_token_expires_at: Option<DateTime<Utc>>,
}

/// Result of a refresh attempt. `refreshed` is false when the connection
/// has no refresh path; the existing access token (decoded) is reused
/// best-effort in that case.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub refreshed: bool,
    pub access_token: Option<String>,
}

/// Token endpoint response, shared by exchange and refresh grants.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Drives credential acquisition and rotation for connections.
pub struct OAuthService {
    connections: Arc<dyn ConnectionRepositoryTrait>,
    providers: HashMap<String, ProviderAuthConfig>,
    http: reqwest::Client,
}

impl OAuthService {
    pub fn new(
        connections: Arc<dyn ConnectionRepositoryTrait>,
        providers: Vec<ProviderAuthConfig>,
    ) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.provider.clone(), p))
            .collect();
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(TOKEN_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            connections,
            providers,
            http,
        }
    }

    fn provider_config(&self, provider: &str) -> Result<&ProviderAuthConfig> {
        self.providers
            .get(provider)
            .ok_or_else(|| Error::Config(format!("provider {} is not configured", provider)))
    }

    /// Start the authorization-code flow: persist a fresh state value and
    /// build the provider authorization URL.
    pub async fn initiate(
        &self,
        connection_id: &str,
        redirect_uri: Option<String>,
        scope: Option<String>,
    ) -> Result<AuthorizationRequest> {
        let connection = self.connections.get_by_id(connection_id)?;
        let config = self.provider_config(&connection.provider)?;

        if config.flow != AuthFlow::CodeExchange {
            return Err(Error::Unsupported(format!(
                "provider {} does not use code exchange",
                connection.provider
            )));
        }

        let client_id = config
            .client_id
            .as_deref()
            .ok_or_else(|| Error::Config(format!("{}: client_id missing", connection.provider)))?;
        let authorize_url = config.authorize_url.as_deref().ok_or_else(|| {
            Error::Config(format!("{}: authorize_url missing", connection.provider))
        })?;

        let state = Uuid::new_v4().simple().to_string();
        let scope = scope.or_else(|| config.default_scope.clone());

        let mut params: Vec<(&str, &str)> = vec![
            ("response_type", "code"),
            ("client_id", client_id),
            ("state", state.as_str()),
        ];
        if let Some(uri) = redirect_uri.as_deref() {
            params.push(("redirect_uri", uri));
        }
        if let Some(s) = scope.as_deref() {
            params.push(("scope", s));
        }

        let url = reqwest::Url::parse_with_params(authorize_url, &params)
            .map_err(|e| Error::Config(format!("invalid authorize_url: {}", e)))?;

        // Persist the transient flow state into connection metadata.
        let mut meta = connection
            .meta
            .clone()
            .and_then(|m| m.as_object().cloned())
            .unwrap_or_default();
        meta.insert(META_OAUTH_STATE.into(), serde_json::Value::String(state.clone()));
        match &redirect_uri {
            Some(uri) => {
                meta.insert(
                    META_OAUTH_REDIRECT_URI.into(),
                    serde_json::Value::String(uri.clone()),
                );
            }
            None => {
                meta.remove(META_OAUTH_REDIRECT_URI);
            }
        }

        self.connections
            .update(
                connection_id,
                ConnectionUpdate {
                    meta: Some(Some(serde_json::Value::Object(meta))),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            "Initiated OAuth flow for connection {} ({})",
            connection_id, connection.provider
        );

        Ok(AuthorizationRequest {
            authorization_url: url.to_string(),
            state,
        })
    }

    /// Exchange an authorization code for tokens, validating the CSRF state
    /// when both sides have one.
    pub async fn exchange(
        &self,
        connection_id: &str,
        code: &str,
        state: Option<&str>,
        redirect_uri: Option<String>,
    ) -> Result<ExchangeOutcome> {
        let connection = self.connections.get_by_id(connection_id)?;
        let config = self.provider_config(&connection.provider)?;

        if config.flow != AuthFlow::CodeExchange {
            return Err(Error::Unsupported(format!(
                "provider {} does not use code exchange",
                connection.provider
            )));
        }

        let persisted_state = connection.meta_str(META_OAUTH_STATE);
        if let (Some(expected), Some(supplied)) = (persisted_state.as_deref(), state) {
            if expected != supplied {
                warn!(
                    "OAuth state mismatch for connection {}; rejecting exchange",
                    connection_id
                );
                return Err(Error::StateMismatch(connection_id.to_string()));
            }
        }

        let token_url = config
            .token_url
            .as_deref()
            .ok_or_else(|| Error::Config(format!("{}: token_url missing", connection.provider)))?;
        let client_id = config
            .client_id
            .as_deref()
            .ok_or_else(|| Error::Config(format!("{}: client_id missing", connection.provider)))?;

        let redirect_uri = redirect_uri.or_else(|| connection.meta_str(META_OAUTH_REDIRECT_URI));

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id),
        ];
        if let Some(secret) = config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }
        if let Some(uri) = redirect_uri.as_deref() {
            form.push(("redirect_uri", uri));
        }

        let token = self.post_token_request(token_url, &form).await?;
        let expires_at = token.expires_in.map(|s| Utc::now() + Duration::seconds(s));

        // Store tokens and clear the transient OAuth metadata.
        let cleaned_meta = connection.meta.clone().map(|mut m| {
            if let Some(obj) = m.as_object_mut() {
                obj.remove(META_OAUTH_STATE);
                obj.remove(META_OAUTH_REDIRECT_URI);
            }
            m
        });

        self.connections
            .update(
                connection_id,
                ConnectionUpdate {
                    status: Some(ConnectionStatus::Active),
                    access_token: Some(Some(SecretToken::encode(&token.access_token))),
                    refresh_token: Some(token.refresh_token.as_deref().map(SecretToken::encode)),
                    access_token_expires_at: Some(expires_at),
                    meta: Some(cleaned_meta),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            "Completed token exchange for connection {} ({})",
            connection_id, connection.provider
        );

        Ok(ExchangeOutcome {
            status: ConnectionStatus::Active,
            access_token_expires_at: expires_at,
        })
    }

    /// Store a static API token for providers that support it. The caller
    /// must own the connection.
    pub async fn submit_direct_token(
        &self,
        connection_id: &str,
        api_token: &str,
        caller_user_id: &str,
    ) -> Result<ConnectionStatus> {
        let connection = self.connections.get_by_id(connection_id)?;
        let config = self.provider_config(&connection.provider)?;

        if config.flow != AuthFlow::DirectToken {
            return Err(Error::Unsupported(format!(
                "provider {} does not accept direct tokens",
                connection.provider
            )));
        }

        if connection.user_id != caller_user_id {
            return Err(Error::Forbidden(format!(
                "connection {} does not belong to the caller",
                connection_id
            )));
        }

        // Static tokens have no expiry and no refresh counterpart.
        self.connections
            .update(
                connection_id,
                ConnectionUpdate {
                    status: Some(ConnectionStatus::Active),
                    access_token: Some(Some(SecretToken::encode(api_token))),
                    refresh_token: Some(None),
                    access_token_expires_at: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            "Stored direct API token for connection {} ({})",
            connection_id, connection.provider
        );

        Ok(ConnectionStatus::Active)
    }

    /// Refresh the connection's access token if it has a refresh path.
    ///
    /// Without a refresh token or token endpoint this degrades to best
    /// effort: `refreshed: false`, reusing the existing decoded access
    /// token. A 400/401 from the provider marks the connection
    /// `requires_auth` before raising, so it is skipped until the user
    /// re-authenticates; any other failure leaves state untouched for the
    /// next scheduled attempt.
    pub async fn refresh(&self, connection: &Connection) -> Result<RefreshOutcome> {
        let config = self.provider_config(&connection.provider)?;

        let (refresh_token, token_url) = match (&connection.refresh_token, &config.token_url) {
            (Some(token), Some(url)) => (token.decode()?, url.as_str()),
            _ => {
                let existing = connection
                    .access_token
                    .as_ref()
                    .map(|t| t.decode())
                    .transpose()?;
                return Ok(RefreshOutcome {
                    refreshed: false,
                    access_token: existing,
                });
            }
        };

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];
        if let Some(id) = config.client_id.as_deref() {
            form.push(("client_id", id));
        }
        if let Some(secret) = config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let token = match self.post_token_request(token_url, &form).await {
            Ok(token) => token,
            Err(Error::ProviderRejected { status, message })
                if status == 400 || status == 401 =>
            {
                warn!(
                    "Refresh rejected for connection {} ({}): {}",
                    connection.id, status, message
                );
                self.connections
                    .update(
                        &connection.id,
                        ConnectionUpdate {
                            status: Some(ConnectionStatus::RequiresAuth),
                            ..Default::default()
                        },
                    )
                    .await?;
                return Err(Error::ProviderRejected { status, message });
            }
            Err(e) => return Err(e),
        };

        let expires_at = token.expires_in.map(|s| Utc::now() + Duration::seconds(s));
        self.connections
            .update(
                &connection.id,
                ConnectionUpdate {
                    status: Some(ConnectionStatus::Active),
                    access_token: Some(Some(SecretToken::encode(&token.access_token))),
                    // Providers may rotate the refresh token; keep the old
                    // one when they don't.
                    refresh_token: token
                        .refresh_token
                        .as_deref()
                        .map(|t| Some(SecretToken::encode(t))),
                    access_token_expires_at: Some(expires_at),
                    ..Default::default()
                },
            )
            .await?;

        info!("Refreshed access token for connection {}", connection.id);

        Ok(RefreshOutcome {
            refreshed: true,
            access_token: Some(token.access_token),
        })
    }

    /// Form-encoded POST to a token endpoint with non-2xx classification.
    async fn post_token_request(
        &self,
        token_url: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse> {
        let response = self
            .http
            .post(token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Upstream(format!("failed to read token response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
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
            .map_err(|e| Error::Upstream(format!("failed to parse token response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryConnectionRepo;
    use serde_json::json;

    fn code_exchange_config() -> ProviderAuthConfig {
        ProviderAuthConfig {
            provider: "snaptrade".to_string(),
            flow: AuthFlow::CodeExchange,
            client_id: Some("client-1".to_string()),
            client_secret: Some("secret-1".to_string()),
            authorize_url: Some("https://auth.example.com/authorize".to_string()),
            token_url: Some("https://auth.example.com/token".to_string()),
            default_scope: Some("read".to_string()),
        }
    }

    fn direct_token_config() -> ProviderAuthConfig {
        ProviderAuthConfig {
            provider: "tradier".to_string(),
            flow: AuthFlow::DirectToken,
            client_id: None,
            client_secret: None,
            authorize_url: None,
            token_url: None,
            default_scope: None,
        }
    }

    fn service(repo: Arc<InMemoryConnectionRepo>) -> OAuthService {
        OAuthService::new(repo, vec![code_exchange_config(), direct_token_config()])
    }

    #[tokio::test]
    async fn initiate_persists_state_and_builds_url() {
        let repo = Arc::new(InMemoryConnectionRepo::new());
        repo.insert_pending("c1", "snaptrade", "user-1");
        let oauth = service(repo.clone());

        let request = oauth
            .initiate("c1", Some("https://app.example.com/cb".to_string()), None)
            .await
            .unwrap();

        assert!(request.authorization_url.starts_with("https://auth.example.com/authorize?"));
        assert!(request.authorization_url.contains("client_id=client-1"));
        assert!(request.authorization_url.contains(&format!("state={}", request.state)));
        assert!(request.authorization_url.contains("scope=read"));

        let stored = repo.get_by_id("c1").unwrap();
        assert_eq!(stored.meta_str(META_OAUTH_STATE), Some(request.state));
        assert_eq!(
            stored.meta_str(META_OAUTH_REDIRECT_URI),
            Some("https://app.example.com/cb".to_string())
        );
    }

    #[tokio::test]
    async fn initiate_requires_code_exchange_provider() {
        let repo = Arc::new(InMemoryConnectionRepo::new());
        repo.insert_pending("c1", "tradier", "user-1");
        let oauth = service(repo);

        let err = oauth.initiate("c1", None, None).await.unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[tokio::test]
    async fn initiate_without_client_id_is_config_error() {
        let repo = Arc::new(InMemoryConnectionRepo::new());
        repo.insert_pending("c1", "snaptrade", "user-1");
        let mut config = code_exchange_config();
        config.client_id = None;
        let oauth = OAuthService::new(repo, vec![config]);

        let err = oauth.initiate("c1", None, None).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn initiate_unknown_connection_is_not_found() {
        let repo = Arc::new(InMemoryConnectionRepo::new());
        let oauth = service(repo);

        let err = oauth.initiate("ghost", None, None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn exchange_rejects_mismatched_state_and_keeps_tokens() {
        let repo = Arc::new(InMemoryConnectionRepo::new());
        repo.insert_pending("c1", "snaptrade", "user-1");
        repo.set_meta("c1", json!({ META_OAUTH_STATE: "expected-state" }));
        let oauth = service(repo.clone());

        let err = oauth
            .exchange("c1", "auth-code", Some("tampered-state"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StateMismatch(_)));

        // The connection's tokens and status are untouched.
        let stored = repo.get_by_id("c1").unwrap();
        assert_eq!(stored.status, ConnectionStatus::Pending);
        assert!(stored.access_token.is_none());
        assert_eq!(
            stored.meta_str(META_OAUTH_STATE),
            Some("expected-state".to_string())
        );
    }

    #[tokio::test]
    async fn direct_token_requires_ownership() {
        let repo = Arc::new(InMemoryConnectionRepo::new());
        repo.insert_pending("c1", "tradier", "user-1");
        let oauth = service(repo);

        let err = oauth
            .submit_direct_token("c1", "api-token", "someone-else")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn direct_token_activates_and_encodes() {
        let repo = Arc::new(InMemoryConnectionRepo::new());
        repo.insert_pending("c1", "tradier", "user-1");
        let oauth = service(repo.clone());

        let status = oauth
            .submit_direct_token("c1", "api-token", "user-1")
            .await
            .unwrap();
        assert_eq!(status, ConnectionStatus::Active);

        let stored = repo.get_by_id("c1").unwrap();
        assert_eq!(stored.status, ConnectionStatus::Active);
        assert!(stored.access_token_expires_at.is_none());
        assert!(stored.refresh_token.is_none());
        let token = stored.access_token.unwrap();
        // Stored encoded, decodes back to the submitted value.
        assert_ne!(token.encoded(), "api-token");
        assert_eq!(token.decode().unwrap(), "api-token");
    }

    #[tokio::test]
    async fn direct_token_on_code_exchange_provider_is_unsupported() {
        let repo = Arc::new(InMemoryConnectionRepo::new());
        repo.insert_pending("c1", "snaptrade", "user-1");
        let oauth = service(repo);

        let err = oauth
            .submit_direct_token("c1", "api-token", "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_degrades_to_best_effort() {
        let repo = Arc::new(InMemoryConnectionRepo::new());
        repo.insert_pending("c1", "tradier", "user-1");
        let oauth = service(repo.clone());
        oauth
            .submit_direct_token("c1", "static-token", "user-1")
            .await
            .unwrap();

        let connection = repo.get_by_id("c1").unwrap();
        let outcome = oauth.refresh(&connection).await.unwrap();

        assert!(!outcome.refreshed);
        assert_eq!(outcome.access_token.as_deref(), Some("static-token"));
    }
}
