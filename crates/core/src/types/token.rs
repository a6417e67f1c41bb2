//! Access token credential.
//!
//! Type-safe wrapper for the short-lived bearer token issued by the
//! backend. Deliberately implements neither `Serialize` nor
//! `Deserialize`: tokens must never reach the persisted cart snapshot
//! or any other durable record.

use secrecy::{ExposeSecret, SecretString};

/// Bearer access token for the marketplace API.
///
/// Implements `Debug` manually to redact the token value.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    /// Create a new access token from its raw string form.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(SecretString::from(raw.into()))
    }

    /// Get the raw token value for header injection.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

impl From<String> for AccessToken {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}
