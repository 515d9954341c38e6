use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// IdentityError
///
/// Failures talking to the Identity Service. The rehydrator folds every variant into
/// "logged out"; login surfaces them to the caller.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity service responded with status {0}")]
    Status(u16),
    #[error("identity service unreachable: {0}")]
    Transport(String),
    #[error("identity service returned an unexpected body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            IdentityError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            IdentityError::Status(status.as_u16())
        } else {
            IdentityError::Transport(e.to_string())
        }
    }
}

/// GateError
///
/// Errors produced by the gateway's own handlers.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = match self {
            GateError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        tracing::warn!(error = %self, status = status.as_u16(), "request failed");
        (status, self.to_string()).into_response()
    }
}
