//! Integration tests for the Tamarind client layer.
//!
//! Tests run against a `wiremock` mock backend, so no real marketplace
//! API or credentials are needed.
//!
//! # Test Categories
//!
//! - `session_refresh` - Silent re-authentication and single-flight refresh
//! - `cart_flow` - Cart mutations, batched detail fetches, durability
//!
//! Run with: `cargo test -p tamarind-integration-tests`

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tamarind_client::{ClientConfig, TamarindClient};

/// One mock backend plus a client wired to it.
pub struct TestContext {
    pub backend: MockServer,
    pub config: ClientConfig,
    pub client: TamarindClient,
}

impl TestContext {
    /// Start a mock backend and build a client against it.
    pub async fn new() -> Self {
        Self::build(|config| config).await
    }

    /// Like [`new`](Self::new), with a hook to adjust the configuration.
    pub async fn build(configure: impl FnOnce(ClientConfig) -> ClientConfig) -> Self {
        // Honor RUST_LOG when debugging a failing test
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();

        let backend = MockServer::start().await;
        let config = configure(ClientConfig::new(
            backend.uri().parse().expect("mock server URI"),
        ));
        let client = TamarindClient::new(&config).expect("failed to build client");

        Self {
            backend,
            config,
            client,
        }
    }

    /// Rebuild the client from the same configuration, as a fresh process
    /// start would.
    pub fn reopen(&self) -> TamarindClient {
        TamarindClient::new(&self.config).expect("failed to rebuild client")
    }

    /// Mount a refresh endpoint that issues `token`, verifying it is
    /// called exactly `expected_calls` times.
    pub async fn mount_refresh(&self, token: &str, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": token })))
            .expect(expected_calls)
            .mount(&self.backend)
            .await;
    }

    /// Mount a refresh endpoint that rejects the session.
    pub async fn mount_failing_refresh(&self, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .expect(expected_calls)
            .mount(&self.backend)
            .await;
    }
}

/// Backend-shaped item detail JSON.
#[must_use]
pub fn item_json(id: &str, name: &str, price: f64) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "price": price,
        "image": format!("https://cdn.tamarind.test/{id}.jpg"),
        "available": true
    })
}
