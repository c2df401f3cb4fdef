//! Error types for the ClickUp API client.
//!
//! # Design
//! Four kinds of failure reach callers and each stays distinguishable:
//! transport failures (network or non-2xx status), cancellation, responses
//! that violate a "payload must be present" contract, and request validation
//! failures raised before anything is sent. `NotFound` keeps a dedicated
//! transport variant because callers frequently branch on it.

use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Network or HTTP-layer failures. Never retried by this crate.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned 429.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// The server returned a non-2xx status other than 404/429.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        /// `ECODE` from the API's error body, when present.
        code: Option<String>,
        message: String,
    },

    /// A 2xx body could not be decoded into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

/// Errors returned by every client operation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The cancellation scope fired before or during the call.
    #[error("operation cancelled")]
    Cancelled,

    /// The transport succeeded but a required payload was missing.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A request model failed its constraints at build time.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Transport(TransportError::NotFound))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(TransportError::Network(err.to_string()))
    }
}
