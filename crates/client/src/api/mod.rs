//! Marketplace API client with silent re-authentication.
//!
//! # Architecture
//!
//! - Every outbound request is described by a [`RequestSpec`] and issued
//!   through [`ApiClient::send`]
//! - The current credential is attached as a bearer token; caller headers
//!   are never mutated
//! - A 401 on an authenticated request joins (or starts) the single
//!   in-flight refresh, then the request is replayed exactly once
//! - A second 401 after the replay is terminal: the session is cleared
//!   and the caller receives [`ApiError::AuthExpired`]
//!
//! # Example
//!
//! ```rust,ignore
//! use tamarind_client::api::{ApiClient, RequestSpec};
//!
//! let client = ApiClient::new(http, base_url, tokens);
//!
//! let details: Vec<ItemDetail> = client
//!     .fetch_json(&RequestSpec::get("items").query("ids", "pizza-1,burger-9"))
//!     .await?;
//! ```

mod accounts;
mod items;
mod refresh;
mod request;
pub mod types;

pub use refresh::RefreshError;
pub use request::RequestSpec;
pub use types::{ItemDetail, UserProfile};

use std::sync::Arc;

use reqwest::{StatusCode, header};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use tamarind_core::AccessToken;

use crate::session::TokenManager;
use refresh::RefreshCoordinator;

/// Errors that can occur when talking to the marketplace API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request URL could not be built.
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    /// Backend returned a non-success status.
    #[error("unexpected status {status}: {message}")]
    Status {
        /// Response status code.
        status: StatusCode,
        /// Truncated response body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Sign-in or sign-up was rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The session could not be re-established: refresh failed, or the
    /// one-time replay was rejected again. The credential has been
    /// cleared and session observers notified.
    #[error("session expired")]
    AuthExpired,

    /// Rate limited by the backend.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the marketplace API.
///
/// Cheaply cloneable via `Arc`. All consumer-app requests go through this
/// type so that credential attachment and re-authentication behave the
/// same everywhere.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    tokens: TokenManager,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// The `reqwest::Client` should carry a cookie store: the refresh
    /// endpoint authenticates via an HTTP-only cookie set at sign-in.
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: Url, tokens: TokenManager) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url,
                tokens,
                refresh: RefreshCoordinator::new(),
            }),
        }
    }

    /// Get a reference to the token manager.
    #[must_use]
    pub fn tokens(&self) -> &TokenManager {
        &self.inner.tokens
    }

    /// Issue a request through the re-authentication gate.
    ///
    /// Non-401 responses are returned unchanged, whatever their status.
    /// See the module docs for the refresh-and-replay behavior on 401.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::AuthExpired` when the session cannot be
    /// re-established, or a transport error if the request never
    /// completed.
    #[instrument(skip(self, spec), fields(method = %spec.method, path = %spec.path))]
    pub async fn send(&self, spec: &RequestSpec) -> Result<reqwest::Response, ApiError> {
        let first = self.issue(spec, self.inner.tokens.current()).await?;
        if !(spec.requires_auth && first.status() == StatusCode::UNAUTHORIZED) {
            return Ok(first);
        }

        debug!("request rejected with 401, joining token refresh");
        let Ok(token) = self.inner.refresh.refresh(&self.inner.tokens).await else {
            return Err(ApiError::AuthExpired);
        };

        // One replay with the fresh credential; its result is final.
        let second = self.issue(spec, Some(token)).await?;
        if second.status() == StatusCode::UNAUTHORIZED {
            // Still rejected with a token the backend just issued: the
            // session is broken beyond what a refresh can fix.
            self.inner.tokens.clear();
            return Err(ApiError::AuthExpired);
        }
        Ok(second)
    }

    /// Issue a request and decode a JSON response body.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures, non-success statuses, and
    /// malformed payloads.
    pub async fn fetch_json<T: DeserializeOwned>(&self, spec: &RequestSpec) -> Result<T, ApiError> {
        let response = self.send(spec).await?;
        Self::decode(response).await
    }

    /// Issue one request attempt with the given credential.
    async fn issue(
        &self,
        spec: &RequestSpec,
        token: Option<AccessToken>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(spec)?;
        let mut request = self.inner.http.request(spec.method.clone(), url);

        for (name, value) in &spec.headers {
            request = request.header(name, value);
        }

        // Inject the credential unless the caller supplied its own
        if let Some(token) = token
            && !spec.has_authorization_header()
        {
            request = request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose()),
            );
        }

        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    /// Build the absolute endpoint URL for a request.
    fn endpoint(&self, spec: &RequestSpec) -> Result<Url, ApiError> {
        let mut url = self
            .inner
            .base_url
            .join(spec.path.trim_start_matches('/'))?;

        if !spec.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(spec.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        Ok(url)
    }

    /// Decode a JSON response, mapping non-success statuses to errors.
    pub(crate) async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %truncate_body(&response_text),
                "marketplace API returned non-success status"
            );
            return Err(ApiError::Status {
                status,
                message: truncate_body(&response_text),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate_body(&response_text),
                "failed to parse marketplace API response"
            );
            ApiError::Decode(e)
        })
    }
}

/// Cap response bodies quoted in errors and logs.
fn truncate_body(body: &str) -> String {
    body.chars().take(200).collect()
}
