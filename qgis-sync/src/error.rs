//! Error types used by the crate.

use thiserror::Error;

use crate::engine::EngineError;

/// Synchronization error type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// Transport level failure: DNS, connection refused, TLS etc.
    #[error("network error: {0}")]
    Network(String),
    /// Server responded with a non-success status.
    #[error("server responded with status {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },
    /// Request took longer than the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// Response body could not be decoded.
    #[error("failed to decode data: {0}")]
    Decoding(String),
    /// Project tree contains a cycle, repeated ids or is nested too deep.
    #[error("malformed layer tree: {0}")]
    MalformedTree(String),
    /// Features cannot be drawn with any of the supported paint layers.
    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),
    /// Map style did not become ready in time.
    #[error("map style is not loaded")]
    StyleNotLoaded,
    /// A newer synchronization started before this one finished.
    #[error("superseded by a newer synchronization")]
    Superseded,
    /// Map engine rejected an operation.
    #[error("map engine error: {0}")]
    Engine(#[from] EngineError),
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Item not found.
    #[error("item not found")]
    NotFound,
}

impl From<reqwest::Error> for SyncError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::Timeout
        } else if value.is_decode() {
            Self::Decoding(value.to_string())
        } else if let Some(status) = value.status() {
            Self::Http {
                status: status.as_u16(),
            }
        } else {
            Self::Network(value.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decoding(value.to_string())
    }
}

impl SyncError {
    /// Returns true if retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout | Self::StyleNotLoaded => true,
            Self::Http { status } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(SyncError::Timeout.is_transient());
        assert!(SyncError::Http { status: 503 }.is_transient());
        assert!(!SyncError::Http { status: 404 }.is_transient());
        assert!(!SyncError::MalformedTree("cycle".into()).is_transient());
    }

    #[test]
    fn engine_errors_convert() {
        let error: SyncError = EngineError::StyleNotLoaded.into();
        assert_eq!(error.to_string(), "map engine error: style is not done loading");
    }
}
