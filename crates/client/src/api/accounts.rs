//! Account endpoints: sign-in, sign-up, sign-out.
//!
//! Thin wrappers over the auth endpoints. Their only session-layer
//! responsibility is calling [`TokenManager::set`] / [`clear`] at the
//! right moments; everything else about accounts (profiles, addresses,
//! order history) lives in the ordinary CRUD surface of the apps.
//!
//! [`TokenManager::set`]: crate::session::TokenManager::set
//! [`clear`]: crate::session::TokenManager::clear

use reqwest::StatusCode;
use serde_json::json;
use tracing::instrument;

use tamarind_core::AccessToken;

use super::types::SignInResponse;
use super::{ApiClient, ApiError, RequestSpec, UserProfile};

impl ApiClient {
    /// Sign in with email and password.
    ///
    /// On success the returned token is installed in the token manager
    /// and the refresh cookie lands in the shared cookie store.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidCredentials` if the backend rejects the
    /// email/password pair.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let spec = RequestSpec::post("auth/signin")
            .json(json!({ "email": email, "password": password }))
            .public();

        self.authenticate(&spec).await
    }

    /// Register a new account.
    ///
    /// The backend signs the new user in directly, so this installs a
    /// credential exactly like [`sign_in`](Self::sign_in).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidCredentials` if the backend rejects the
    /// registration (e.g. email already taken).
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<UserProfile, ApiError> {
        let spec = RequestSpec::post("auth/signup")
            .json(json!({ "email": email, "password": password, "name": name }))
            .public();

        self.authenticate(&spec).await
    }

    /// Sign out of the current session.
    ///
    /// The local credential is dropped whatever the backend answers: a
    /// sign-out must never leave a half-authenticated client behind.
    /// Marked public so an already-expired session cannot trigger a
    /// refresh on its way out.
    ///
    /// # Errors
    ///
    /// Returns transport errors; an already-expired session is not an
    /// error here.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), ApiError> {
        let result = self.send(&RequestSpec::post("auth/signout").public()).await;
        self.tokens().clear();

        match result {
            Ok(_) | Err(ApiError::AuthExpired) => Ok(()),
            Err(error) => Err(error),
        }
    }

    /// Shared sign-in/sign-up path: decode, install token, return profile.
    async fn authenticate(&self, spec: &RequestSpec) -> Result<UserProfile, ApiError> {
        let response = self.send(spec).await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::CONFLICT
        {
            return Err(ApiError::InvalidCredentials);
        }

        let body: SignInResponse = Self::decode(response).await?;
        self.tokens().set(AccessToken::new(body.token));
        Ok(body.user)
    }
}
