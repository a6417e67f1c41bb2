//! Single-flight coordination for token refresh.
//!
//! The refresh state is an explicit machine: `Idle`, or `Refreshing`
//! holding a shared future that every waiter awaits a clone of. N
//! concurrently failing requests therefore trigger exactly one call to
//! [`TokenManager::refresh`]. The state is process-wide and transient; a
//! new process starts `Idle`.

use std::sync::{Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use thiserror::Error;

use tamarind_core::AccessToken;

use crate::session::TokenManager;

/// Refresh failure, cloneable so every waiter of the shared future
/// receives it.
#[derive(Debug, Clone, Error)]
#[error("token refresh failed: {message}")]
pub struct RefreshError {
    message: String,
}

impl RefreshError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

type RefreshFuture = Shared<BoxFuture<'static, Result<AccessToken, RefreshError>>>;

enum RefreshState {
    Idle,
    Refreshing(RefreshFuture),
}

/// Coordinates at most one in-flight refresh at a time.
pub(crate) struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub(crate) const fn new() -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle),
        }
    }

    /// Join the in-flight refresh if one exists, otherwise start one.
    ///
    /// Waiters resume in the order they observed the auth failure.
    pub(crate) async fn refresh(
        &self,
        tokens: &TokenManager,
    ) -> Result<AccessToken, RefreshError> {
        let future = {
            let mut state = self.lock();
            match &*state {
                RefreshState::Refreshing(inflight) => inflight.clone(),
                RefreshState::Idle => {
                    let tokens = tokens.clone();
                    let fresh: RefreshFuture =
                        async move { tokens.refresh().await }.boxed().shared();
                    *state = RefreshState::Refreshing(fresh.clone());
                    fresh
                }
            }
        };

        let result = future.clone().await;

        // Reset to Idle, but only if no newer refresh has been installed
        // since this one completed.
        let mut state = self.lock();
        if let RefreshState::Refreshing(inflight) = &*state
            && inflight.ptr_eq(&future)
        {
            *state = RefreshState::Idle;
        }

        result
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
