//! HTTP error mapping for the engine error taxonomy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use wealthbridge_core::errors::{DatabaseError, Error};
use wealthbridge_market_data::MarketDataError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    TooManyRequests(String),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::TooManyRequests(m)
            | ApiError::BadGateway(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("API error ({}): {}", status, self.message());
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Config(m) => ApiError::Internal(m),
            Error::NotFound(m) => ApiError::NotFound(m),
            Error::Forbidden(m) => ApiError::Forbidden(m),
            Error::StateMismatch(m) => {
                ApiError::BadRequest(format!("OAuth state mismatch for connection {}", m))
            }
            Error::Unsupported(m) => ApiError::BadRequest(m),
            Error::ProviderRejected { status, message } => {
                ApiError::BadRequest(format!("provider rejected the request ({}): {}", status, message))
            }
            Error::Upstream(m) => ApiError::BadGateway(m),
            Error::Decode(m) => ApiError::Internal(format!("credential decode failed: {}", m)),
            Error::NoData(m) => ApiError::NotFound(m),
            Error::Validation(m) => ApiError::BadRequest(m),
            Error::Database(DatabaseError::NotFound(m)) => ApiError::NotFound(m),
            Error::Database(e) => ApiError::Internal(e.to_string()),
            Error::Unexpected(m) => ApiError::Internal(m),
        }
    }
}

impl From<MarketDataError> for ApiError {
    fn from(err: MarketDataError) -> Self {
        match err {
            MarketDataError::SymbolNotFound(s) => {
                ApiError::NotFound(format!("symbol not found: {}", s))
            }
            MarketDataError::NoDataForRange => {
                ApiError::NotFound("no data for the requested range".to_string())
            }
            MarketDataError::RateLimited { provider } => {
                ApiError::TooManyRequests(format!("rate limited by {}", provider))
            }
            MarketDataError::ClientError {
                provider,
                status,
                message,
            } => ApiError::BadRequest(format!("{} rejected the request ({}): {}", provider, status, message)),
            MarketDataError::NoProvidersConfigured => {
                ApiError::Internal("no market data providers configured".to_string())
            }
            other => ApiError::BadGateway(other.to_string()),
        }
    }
}
