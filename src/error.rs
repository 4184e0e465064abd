use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Structured body for errors raised locally (not relayed from upstream).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
}

/// Per-request failure. None of these outlive the request that raised them.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Repository not allowed")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    /// Upstream answered with status >= 400; relayed verbatim.
    #[error("upstream returned {status}")]
    Upstream { status: StatusCode, body: Value },
    #[error("upstream request timed out: {0}")]
    Timeout(String),
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream returned a non-JSON body: {0}")]
    InvalidUpstreamBody(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upstream { status, .. } => *status,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Transport(_) | Self::InvalidUpstreamBody(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Local error envelope; `None` for upstream errors, whose body is relayed as-is.
    pub fn envelope(&self) -> Option<ErrorEnvelope> {
        let code = match self {
            Self::Upstream { .. } => return None,
            Self::Forbidden => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Timeout(_) => "UPSTREAM_TIMEOUT",
            Self::Transport(_) => "UPSTREAM_UNAVAILABLE",
            Self::InvalidUpstreamBody(_) => "BAD_UPSTREAM_RESPONSE",
        };
        Some(ErrorEnvelope {
            code: code.to_string(),
            message: self.to_string(),
        })
    }

    /// JSON body sent to the caller.
    pub fn body(&self) -> Value {
        match (self, self.envelope()) {
            (Self::Upstream { body, .. }, _) => body.clone(),
            (_, envelope) => serde_json::to_value(envelope).unwrap_or(Value::Null),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Upstream { body, .. } => (status, Json(body)).into_response(),
            other => (status, Json(other.body())).into_response(),
        }
    }
}
