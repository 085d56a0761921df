//! Error handling module

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failures of a single Simbase API call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimbaseError {
    /// Timeout or connection failure
    #[error("Simbase API unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Simbase API returned status {status}")]
    UpstreamError { status: u16 },

    #[error("Validation Error: Check message length/format.")]
    ValidationError,

    #[error("Insufficient Balance: Please top up your account.")]
    InsufficientBalance,

    #[error("SIM Not Found: The ICCID is invalid.")]
    SimNotFound,

    /// 2xx response whose body could not be decoded
    #[error("Invalid response from Simbase API: {0}")]
    InvalidResponse(String),
}

impl SimbaseError {
    /// Errors a scheduler simply retries on its next cycle
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SimbaseError::UpstreamUnavailable(_)
                | SimbaseError::UpstreamError { .. }
                | SimbaseError::InvalidResponse(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SimbaseError::ValidationError => StatusCode::BAD_REQUEST,
            SimbaseError::InsufficientBalance => StatusCode::PAYMENT_REQUIRED,
            SimbaseError::SimNotFound => StatusCode::NOT_FOUND,
            SimbaseError::UpstreamUnavailable(_) => StatusCode::GATEWAY_TIMEOUT,
            SimbaseError::UpstreamError { .. } | SimbaseError::InvalidResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl From<reqwest::Error> for SimbaseError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            SimbaseError::UpstreamUnavailable(e.to_string())
        } else if e.is_decode() {
            SimbaseError::InvalidResponse(e.to_string())
        } else if let Some(status) = e.status() {
            SimbaseError::UpstreamError {
                status: status.as_u16(),
            }
        } else {
            SimbaseError::UpstreamUnavailable(e.to_string())
        }
    }
}

/// Setup of a configuration entry could not complete
#[derive(Error, Debug)]
pub enum SetupError {
    /// Initial fetch failed; setup should be retried later
    #[error("Simbase not ready: {0}")]
    NotReady(#[from] SimbaseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Simbase integration is not ready")]
    NotReady,

    #[error("{0}")]
    Upstream(#[from] SimbaseError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::NotReady => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::Upstream(e) => (e.status_code(), e.to_string()),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
