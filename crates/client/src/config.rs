//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TAMARIND_API_BASE_URL` - Base URL of the marketplace API
//!
//! ## Optional
//! - `TAMARIND_CART_PATH` - File path for the durable cart snapshot
//!   (default: in-memory, cart does not survive restarts)
//! - `TAMARIND_HTTP_TIMEOUT_SECS` - Request timeout in seconds (default: 10)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default HTTP request timeout in seconds.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration for the session and cart layer.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the marketplace API. Always ends with a trailing
    /// slash so relative endpoint paths join underneath it.
    pub base_url: Url,
    /// File path for the durable cart snapshot. `None` keeps the cart
    /// in memory only.
    pub cart_path: Option<PathBuf>,
    /// HTTP request timeout.
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the base URL.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            cart_path: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    /// Set the durable cart snapshot path.
    #[must_use]
    pub fn with_cart_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cart_path = Some(path.into());
        self
    }

    /// Set the HTTP request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = get_required_env("TAMARIND_API_BASE_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("TAMARIND_API_BASE_URL".to_string(), e.to_string())
            })?;

        let timeout_secs = get_env_or_default(
            "TAMARIND_HTTP_TIMEOUT_SECS",
            &DEFAULT_HTTP_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("TAMARIND_HTTP_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        let mut config = Self::new(base_url).with_timeout(Duration::from_secs(timeout_secs));
        config.cart_path = get_optional_env("TAMARIND_CART_PATH").map(PathBuf::from);

        Ok(config)
    }
}

/// Ensure the base URL path ends with a slash so `Url::join` treats the
/// final segment as a directory rather than replacing it.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
