//! Session credential management.
//!
//! [`TokenManager`] is the single owner of the access credential. It
//! performs no concurrency control of its own - coordinating concurrent
//! refreshes is the API gate's job - and `refresh()` is a plain
//! idempotent-effect operation each time it is invoked.
//!
//! The credential lives only in memory. Cross-restart session continuity
//! comes from the HTTP-only refresh cookie held by the transport, which
//! this module treats as opaque.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::instrument;
use url::Url;

use tamarind_core::AccessToken;

use crate::api::types::RefreshResponse;
use crate::api::{ApiClient, ApiError, RefreshError};

/// Whether the client currently holds a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// A credential is held.
    SignedIn,
    /// No credential is held.
    SignedOut,
}

/// Owner of the current access credential.
///
/// Cheaply cloneable via `Arc`; all clones share one credential and one
/// observer channel.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<TokenManagerInner>,
}

struct TokenManagerInner {
    http: reqwest::Client,
    refresh_url: Url,
    token: Mutex<Option<AccessToken>>,
    state: watch::Sender<SessionState>,
}

impl TokenManager {
    /// Create a new token manager.
    ///
    /// `base_url` must carry a trailing slash (see
    /// [`ClientConfig`](crate::config::ClientConfig), which normalizes
    /// it). The `reqwest::Client` must share its cookie store with the
    /// API client so the refresh cookie set at sign-in is available here.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh endpoint URL cannot be built.
    pub fn new(http: reqwest::Client, base_url: &Url) -> Result<Self, ApiError> {
        let refresh_url = base_url.join("auth/refresh")?;
        let (state, _) = watch::channel(SessionState::SignedOut);

        Ok(Self {
            inner: Arc::new(TokenManagerInner {
                http,
                refresh_url,
                token: Mutex::new(None),
                state,
            }),
        })
    }

    /// Replace the held credential and notify observers.
    pub fn set(&self, token: AccessToken) {
        *self.lock() = Some(token);
        self.inner.state.send_replace(SessionState::SignedIn);
        tracing::debug!("session credential replaced");
    }

    /// Drop the credential and signal the logged-out state.
    pub fn clear(&self) {
        *self.lock() = None;
        self.inner.state.send_replace(SessionState::SignedOut);
        tracing::debug!("session credential cleared");
    }

    /// Get a clone of the current credential, if any.
    #[must_use]
    pub fn current(&self) -> Option<AccessToken> {
        self.lock().clone()
    }

    /// Current session state.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Subscribe to session-state changes.
    ///
    /// Dependent UI (account menus, guarded views) re-renders off this
    /// channel; a forced logout after an unrecoverable refresh failure
    /// arrives here as [`SessionState::SignedOut`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Call the backend refresh endpoint and install the new credential.
    ///
    /// On success the credential is replaced via [`set`](Self::set); on
    /// failure it is dropped via [`clear`](Self::clear) and the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `RefreshError` when the refresh endpoint rejects the
    /// session or cannot be reached.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<AccessToken, RefreshError> {
        match self.fetch_token().await {
            Ok(token) => {
                self.set(token.clone());
                Ok(token)
            }
            Err(error) => {
                tracing::warn!(%error, "token refresh failed, signing out");
                self.clear();
                Err(RefreshError::new(error.to_string()))
            }
        }
    }

    /// Cookie-authenticated `GET /auth/refresh`, no request body.
    async fn fetch_token(&self) -> Result<AccessToken, ApiError> {
        let response = self
            .inner
            .http
            .get(self.inner.refresh_url.clone())
            .send()
            .await?;

        let body: RefreshResponse = ApiClient::decode(response).await?;
        Ok(AccessToken::new(body.token))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<AccessToken>> {
        self.inner
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
