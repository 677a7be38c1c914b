//! Error types for the market data crate.

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// The chain and the HTTP layer care about two classifications:
/// [`is_client_error`](Self::is_client_error) (the request itself is bad,
/// surfaced to the caller) and [`is_retryable`](Self::is_retryable)
/// (a later attempt can succeed). For fallback purposes every failure is
/// equal: the chain moves on to the next provider regardless of class.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The symbol exists but has no quotes in the requested period.
    #[error("No data for date range")]
    NoDataForRange,

    /// The provider rate limited the request, either via HTTP 429 or an
    /// informational payload.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider answered with a client-class (4xx) status.
    #[error("Client error from {provider} ({status}): {message}")]
    ClientError {
        provider: String,
        status: u16,
        message: String,
    },

    /// Any other provider failure: network trouble, 5xx, unparseable body.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The chain was constructed without any providers.
    #[error("No providers configured")]
    NoProvidersConfigured,
}

impl MarketDataError {
    /// Whether the failure is a client-class problem that retrying cannot
    /// fix.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::SymbolNotFound(_) | Self::NoDataForRange | Self::ClientError { .. }
        )
    }

    /// Whether a later attempt against the same provider can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::ProviderError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_retryable_but_not_client() {
        let err = MarketDataError::RateLimited {
            provider: "FINNHUB".to_string(),
        };
        assert!(err.is_retryable());
        assert!(!err.is_client_error());
    }

    #[test]
    fn symbol_not_found_is_client_class() {
        let err = MarketDataError::SymbolNotFound("NOPE".to_string());
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn http_400_is_client_class() {
        let err = MarketDataError::ClientError {
            provider: "ALPHA_VANTAGE".to_string(),
            status: 400,
            message: "bad symbol".to_string(),
        };
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
    }
}
