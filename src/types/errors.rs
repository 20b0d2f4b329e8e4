//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and carry
//! enough structure to translate directly into the HTTP error envelope of
//! `{error, errorType, timestamp, metadata?}` without re-parsing messages.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The `errorType` discriminant carried in every error envelope (§6.1, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    UserError,
    AuthRequired,
    AuthForbidden,
    ValidationError,
    QuotaExceeded,
    KubernetesError,
    Timeout,
    SystemError,
}

/// Main error enum for the chatops operator core.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller could not be authenticated (401).
    #[error("authentication required: {0}")]
    Unauthorized(String),

    /// Caller authenticated but lacks the required role (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Malformed or out-of-contract request payload (400).
    #[error("validation error: {0}")]
    Validation(String),

    /// FREE-tier quota exhausted (429).
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Kubernetes API failure or network failure reaching the cluster (502).
    /// The `source` carries the raw cause for logging; `message` is the
    /// sanitized text that is allowed to cross the API boundary.
    #[error("kubernetes error: {message}")]
    Kubernetes {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A call exceeded the per-call adapter timeout (500 — logged as a
    /// system condition even though it originates at the adapter boundary).
    #[error("timeout: {0}")]
    Timeout(String),

    /// Worker/mutex/state invariant violation (500).
    #[error("system error: {0}")]
    System(String),

    /// Any other user-facing 4xx not covered above.
    #[error("request error: {0}")]
    UserError(String),

    /// Request body failed to parse as JSON.
    #[error("invalid request body: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn quota_exceeded(msg: impl Into<String>) -> Self {
        Self::QuotaExceeded(msg.into())
    }

    pub fn kubernetes(msg: impl Into<String>) -> Self {
        Self::Kubernetes {
            message: msg.into(),
            source: None,
        }
    }

    pub fn kubernetes_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Kubernetes {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn system(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }

    pub fn user(msg: impl Into<String>) -> Self {
        Self::UserError(msg.into())
    }

    /// The taxonomy tag carried in the error envelope (§6.1, §7).
    pub fn error_type(&self) -> ErrorType {
        match self {
            Error::Unauthorized(_) => ErrorType::AuthRequired,
            Error::Forbidden(_) => ErrorType::AuthForbidden,
            Error::Validation(_) | Error::Serialization(_) => ErrorType::ValidationError,
            Error::QuotaExceeded(_) => ErrorType::QuotaExceeded,
            Error::Kubernetes { .. } => ErrorType::KubernetesError,
            Error::Timeout(_) => ErrorType::Timeout,
            Error::System(_) => ErrorType::SystemError,
            Error::UserError(_) => ErrorType::UserError,
        }
    }

    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Validation(_) | Error::Serialization(_) | Error::UserError(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            Error::Kubernetes { .. } => StatusCode::BAD_GATEWAY,
            Error::Timeout(_) | Error::System(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The sanitized message allowed to cross the API boundary. Never
    /// includes the raw source of a Kubernetes error.
    pub fn public_message(&self) -> String {
        self.to_string()
    }
}

/// Wire shape of `{error, errorType, timestamp, metadata?}` (§6.1).
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: String,
    #[serde(rename = "errorType")]
    error_type: ErrorType,
    timestamp: chrono::DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if let Error::Kubernetes { source: Some(src), .. } = &self {
            tracing::error!(error = %src, "kubernetes adapter call failed");
        }
        let body = ErrorEnvelope {
            error: self.public_message(),
            error_type: self.error_type(),
            timestamp: Utc::now(),
            metadata: None,
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_exceeded_maps_to_429() {
        let err = Error::quota_exceeded("limit reached");
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.error_type(), ErrorType::QuotaExceeded);
    }

    #[test]
    fn kubernetes_error_maps_to_502_and_hides_source() {
        let err = Error::kubernetes("scale failed");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.public_message(), "kubernetes error: scale failed");
    }

    #[test]
    fn validation_and_unauthorized_map_to_expected_status() {
        assert_eq!(
            Error::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::unauthorized("no token").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Error::forbidden("not admin").status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
