//! Error types for eventwire.
//!
//! Uses `thiserror`. Data problems, handler misuse and collaborator failures
//! are separate variants so callers can tell "you sent bad data" from "you
//! used the handler incorrectly".

use thiserror::Error;

/// The top-level error type for all eventwire operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Data validation ---
    #[error("Response content must be JSON serializable: {0}")]
    Validation(#[source] serde_json::Error),

    // --- Protocol misuse ---
    #[error("Cannot emit chunk to closed stream {stream_id}")]
    StreamClosed { stream_id: String },

    #[error("Cannot send to a completed response handler")]
    HandlerClosed,

    // --- Delivery ---
    #[error("Delivery channel is closed")]
    ChannelClosed,

    // --- Collaborators ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for errors caused by calling the protocol in the wrong state.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::StreamClosed { .. } | Error::HandlerClosed)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Failures reported by the model or search collaborators.
///
/// The protocol never interprets these; the orchestrating code decides whether
/// to surface them as error events.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Numeric code to report on an error event for this failure.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::ApiError { status_code, .. } => i32::from(*status_code),
            Self::RateLimited { .. } => 429,
            Self::AuthenticationFailed(_) => 401,
            Self::Timeout(_) => 504,
            Self::NotConfigured(_)
            | Self::StreamInterrupted(_)
            | Self::Network(_)
            | Self::InvalidResponse(_) => 502,
        }
    }
}
