//! Error taxonomy for tailnet administration
//!
//! Two layers of errors exist in this crate:
//!
//! - [`ApiError`] describes a single failed call against the Tailscale API.
//!   Its `Display` text is what ends up as the reason of a failed device write.
//! - [`AdminError`] describes command-level failures. `DirectoryUnavailable`
//!   and `Configuration` abort a command before any tag is touched, while
//!   `WritesFailed` is raised after a run in apply mode so the process exits
//!   non-zero once every device has been attempted.
//!
//! Per-identifier resolution problems are not errors at all; they are
//! reported by [`crate::resolver::Resolution`].

use thiserror::Error;

/// A failed request against the Tailscale API
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-success status code
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a usable response
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Credential exchange or validation failed
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl ApiError {
    /// Whether the failure is worth retrying (rate limiting, server errors,
    /// timeouts and connection failures)
    pub fn is_retriable(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            ApiError::Transport(e) => e.is_timeout() || e.is_connect(),
            ApiError::Auth(_) => false,
        }
    }
}

/// Command-level errors
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("device directory unavailable: {0}")]
    DirectoryUnavailable(#[source] ApiError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid tag {tag:?}: {reason}")]
    InvalidTag { tag: String, reason: String },

    #[error("{failed} of {attempted} device writes failed")]
    WritesFailed { failed: usize, attempted: usize },
}
