//! Client facade wiring transport, session, and cart together.

use crate::api::{ApiClient, ApiError};
use crate::cart::{CartStore, ItemDetailCache};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::persist::{FileStore, MemoryStore};
use crate::session::TokenManager;

/// Entry point for the consumer apps.
///
/// Builds one HTTP transport with a shared cookie store (so the refresh
/// cookie set at sign-in is available to the refresh endpoint), the token
/// manager, the API gate, and the cart - restored from durable storage
/// when a snapshot path is configured.
#[derive(Clone)]
pub struct TamarindClient {
    api: ApiClient,
    cart: CartStore,
}

impl TamarindClient {
    /// Build a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transport cannot be constructed or
    /// the API base URL is unusable.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.http_timeout)
            .build()
            .map_err(ApiError::from)?;

        let tokens = TokenManager::new(http.clone(), &config.base_url)?;
        let api = ApiClient::new(http, config.base_url.clone(), tokens);
        let details = ItemDetailCache::new(api.clone());

        let cart = match &config.cart_path {
            Some(path) => CartStore::restore(details, FileStore::new(path.clone())),
            None => CartStore::new(details, MemoryStore::new()),
        };

        Ok(Self { api, cart })
    }

    /// Build a client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(&ClientConfig::from_env()?)
    }

    /// Get a reference to the API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// Get a reference to the token manager.
    #[must_use]
    pub fn tokens(&self) -> &TokenManager {
        self.api.tokens()
    }
}
