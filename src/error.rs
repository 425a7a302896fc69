//! Failure taxonomy for the backend gateway
//!
//! Every gateway operation resolves to a `RequestResult<T>`: either the data
//! or exactly one error from this taxonomy. The gateway never panics or
//! bubbles transport exceptions past its boundary; unexpected failures are
//! folded into `Unknown` with the original message preserved, because the UI
//! renders these strings directly.

use thiserror::Error;

/// Universal result envelope returned by every gateway operation.
pub type RequestResult<T> = Result<T, ApiError>;

/// Failure categories surfaced to callers.
///
/// The `Display` output is the user-visible string; downstream code matches
/// on the variant instead of parsing messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Health probe failed, or the primary call timed out / hit a network error.
    #[error("Backend unavailable: {0}")]
    UnreachableBackend(String),

    /// 401 equivalent. Triggers credential clearing at the gateway.
    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    /// 403 equivalent. Also triggers credential clearing.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input rejected by the backend or by the gateway itself.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The gateway could not route the logical path. Unknown routes fail
    /// closed; this is a contract, not an accident.
    #[error("Endpoint not implemented: {0}")]
    UnimplementedEndpoint(String),

    /// Catch-all with the original message preserved.
    #[error("{0}")]
    Unknown(String),
}

impl ApiError {
    /// Create an `UnreachableBackend` error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::UnreachableBackend(message.into())
    }

    /// Create an `Unauthenticated` error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    /// Create a `NotFound` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a `ValidationFailed` error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }

    /// Create an `Unknown` error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    /// Map an HTTP status and response message into the taxonomy.
    ///
    /// Statuses without a dedicated category keep the backend's message
    /// verbatim (e.g. 409 "User already exists").
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Self::Unauthenticated(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            400 | 422 => Self::ValidationFailed(message),
            502 | 503 | 504 => Self::UnreachableBackend(message),
            _ => Self::Unknown(message),
        }
    }

    /// Whether this error must clear the persisted credential (fail-secure).
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthenticated(_) | Self::Forbidden(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::UnreachableBackend(format!("Network error: {}", err))
        } else if err.is_decode() {
            Self::Unknown(format!("Failed to parse response: {}", err))
        } else {
            Self::Unknown(format!("Network error: {}", err))
        }
    }
}
