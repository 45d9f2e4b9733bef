use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ConnectionState;

/// Broad error category used for logging and degrade decisions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PushErrorCategory {
    /// Invalid input, bad URL, or other configuration issue.
    Config,
    /// Client token rejected by the broker.
    Auth,
    /// Transient network or transport failure.
    Network,
    /// Broker asked us to slow down.
    RateLimited,
    /// Malformed frame or response body.
    Serialization,
    /// Local-notification subsystem failure.
    Notifier,
    /// Invariant break inside this client.
    Internal,
}

/// Stable error payload used across the push client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct PushError {
    pub category: PushErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    pub message: String,
}

impl PushError {
    pub fn new(
        category: PushErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build a standard invalid-state-transition error.
    pub fn invalid_state(current: ConnectionState, action: impl Into<String>) -> Self {
        let action = action.into();
        Self::new(
            PushErrorCategory::Internal,
            "invalid_state_transition",
            format!("cannot run '{action}' while connection is {current:?}"),
        )
    }

    /// Error for a non-success HTTP status returned by the broker.
    pub fn http_status(status: u16, operation: &str) -> Self {
        Self::new(
            classify_http_status(status),
            "http_status",
            format!("{operation} failed with HTTP {status}"),
        )
    }

    /// Whether the transport's retry loop should keep going after this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.category,
            PushErrorCategory::Network | PushErrorCategory::RateLimited
        )
    }
}

/// Map HTTP status codes to error categories.
pub fn classify_http_status(status: u16) -> PushErrorCategory {
    match status {
        401 | 403 => PushErrorCategory::Auth,
        408 | 429 => PushErrorCategory::RateLimited,
        400..=499 => PushErrorCategory::Config,
        500..=599 => PushErrorCategory::Network,
        _ => PushErrorCategory::Internal,
    }
}

/// Failures reported by the local-notification subsystem.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifierError {
    #[error("notification subsystem unavailable: {0}")]
    Unavailable(String),
    #[error("notification permission denied")]
    PermissionDenied,
    #[error("notification backend failure: {0}")]
    Backend(String),
}

impl From<NotifierError> for PushError {
    fn from(err: NotifierError) -> Self {
        let code = match err {
            NotifierError::Unavailable(_) => "notifier_unavailable",
            NotifierError::PermissionDenied => "notifier_permission_denied",
            NotifierError::Backend(_) => "notifier_backend_error",
        };
        Self::new(PushErrorCategory::Notifier, code, err.to_string())
    }
}
