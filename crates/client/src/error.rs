//! Unified error handling.
//!
//! Provides a unified `ClientError` type for callers that do not want to
//! match on the per-module error enums. Each subsystem keeps its own
//! error type; this is the top-level sum at the crate boundary.

use thiserror::Error;

use crate::api::ApiError;
use crate::cart::CartError;
use crate::config::ConfigError;
use crate::persist::SnapshotError;

/// Top-level error type for the client library.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration loading failed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// API request failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Cart operation failed.
    #[error("cart error: {0}")]
    Cart(#[from] CartError),

    /// Durable snapshot operation failed.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::Config(ConfigError::MissingEnvVar("TAMARIND_API_BASE_URL".into()));
        assert_eq!(
            err.to_string(),
            "configuration error: Missing environment variable: TAMARIND_API_BASE_URL"
        );
    }
}
