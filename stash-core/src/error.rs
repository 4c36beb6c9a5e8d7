//! Error types for stash.
//!
//! A single `thiserror` hierarchy shared by the store, the instrumentation
//! layer, and the web cache. A cache miss is never an error: absent keys are
//! reported as `None`.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using `StashError`.
pub type Result<T> = std::result::Result<T, StashError>;

/// Main error type for all stash operations.
#[derive(Debug, Error)]
pub enum StashError {
    // ═══════════════════════════════════════════════════════════════════════════
    // DECODE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A stored value could not be decoded into the requested type.
    #[error("Failed to decode value at '{key}': {reason}")]
    DecodeError { key: String, reason: String },

    /// The entry holds a different kind of value than the operation expects.
    #[error("Wrong type for key '{key}': expected {expected}, found {found}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Integer increment would overflow.
    #[error("Increment overflow for key '{key}'")]
    Overflow { key: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // BACKEND ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The storage backend is closed or cannot be reached.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A page fetch exceeded its deadline.
    #[error("Fetch of '{url}' timed out after {timeout:?}")]
    FetchTimeout { url: String, timeout: Duration },

    /// A page fetch failed.
    #[error("Fetch of '{url}' failed: {reason}")]
    FetchError { url: String, reason: String },

    /// The URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// TTL must be strictly positive.
    #[error("Invalid TTL: must be greater than zero")]
    InvalidTtl,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A wrapped operation reported a failure of its own.
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl StashError {
    /// Builds a decode error for `key`.
    pub fn decode(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        StashError::DecodeError {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if the caller may retry the failed call.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StashError::BackendUnavailable(_)
                | StashError::FetchTimeout { .. }
                | StashError::FetchError { .. }
        )
    }

    /// Returns true if a stored value failed to decode.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            StashError::DecodeError { .. }
                | StashError::WrongType { .. }
                | StashError::Overflow { .. }
                | StashError::JsonError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StashError::decode("abc-key", "invalid digit found in string");
        assert!(err.to_string().contains("abc-key"));
        assert!(err.to_string().contains("invalid digit"));

        let err = StashError::FetchTimeout {
            url: "http://example.com".into(),
            timeout: Duration::from_secs(5),
        };
        assert!(err.to_string().contains("5s"));
    }

    #[test]
    fn test_error_classification() {
        assert!(StashError::BackendUnavailable("closed".into()).is_recoverable());
        assert!(StashError::FetchError {
            url: "http://example.com".into(),
            reason: "reset".into()
        }
        .is_recoverable());
        assert!(!StashError::InvalidTtl.is_recoverable());

        assert!(StashError::decode("k", "bad").is_decode_error());
        assert!(StashError::Overflow { key: "k".into() }.is_decode_error());
        assert!(!StashError::BackendUnavailable("closed".into()).is_decode_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid");
        let stash_result: Result<serde_json::Value> = json_result.map_err(StashError::from);
        assert!(matches!(stash_result, Err(StashError::JsonError(_))));
    }
}
