//! Silent re-authentication behavior of the API gate.
//!
//! Covers the single-flight refresh guarantee, the one-time replay, and
//! the forced logout on unrecoverable auth failures.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use futures::future::join_all;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use tamarind_client::{ApiError, RequestSpec, SessionState};
use tamarind_core::AccessToken;
use tamarind_integration_tests::TestContext;

/// Mount `GET /orders` answering `status` for the given bearer token.
async fn mount_orders(ctx: &TestContext, token: &str, status: u16, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(header("authorization", format!("Bearer {token}")))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&ctx.backend)
        .await;
}

#[tokio::test]
async fn test_five_concurrent_auth_failures_trigger_one_refresh() {
    let ctx = TestContext::new().await;
    ctx.client.tokens().set(AccessToken::new("stale"));

    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&ctx.backend)
        .await;
    mount_orders(&ctx, "fresh", 200, json!([])).await;

    // expect(1): five concurrent 401s share one refresh call. The
    // response is delayed so every request observes its 401 while the
    // refresh is still in flight.
    Mock::given(method("GET"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "token": "fresh" }))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&ctx.backend)
        .await;

    let api = ctx.client.api();
    let results = join_all((0..5).map(|_| async {
        api.send(&RequestSpec::get("orders")).await
    }))
    .await;

    for result in results {
        assert_eq!(result.unwrap().status(), 200);
    }
}

#[tokio::test]
async fn test_replayed_response_reaches_the_caller() {
    let ctx = TestContext::new().await;
    ctx.client.tokens().set(AccessToken::new("stale"));

    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&ctx.backend)
        .await;
    mount_orders(&ctx, "fresh", 200, json!({ "ok": true })).await;
    ctx.mount_refresh("fresh", 1).await;

    // The caller sees the replayed 200, never the original 401
    let response = ctx
        .client
        .api()
        .send(&RequestSpec::get("orders"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn test_second_rejection_after_refresh_is_terminal() {
    let ctx = TestContext::new().await;
    ctx.client.tokens().set(AccessToken::new("stale"));

    // Rejects whatever token is presented
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&ctx.backend)
        .await;

    // Refresh succeeds, but must run only once: no second refresh/replay
    // cycle for the same request
    ctx.mount_refresh("fresh", 1).await;

    let result = ctx.client.api().send(&RequestSpec::get("orders")).await;
    assert!(matches!(result, Err(ApiError::AuthExpired)));

    // A token the backend just rejected is not kept around
    assert!(ctx.client.tokens().current().is_none());
    assert_eq!(ctx.client.tokens().session_state(), SessionState::SignedOut);
}

#[tokio::test]
async fn test_refresh_failure_forces_logout() {
    let ctx = TestContext::new().await;
    ctx.client.tokens().set(AccessToken::new("stale"));
    let mut observer = ctx.client.tokens().subscribe();

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&ctx.backend)
        .await;
    ctx.mount_failing_refresh(1).await;

    let result = ctx.client.api().send(&RequestSpec::get("orders")).await;
    assert!(matches!(result, Err(ApiError::AuthExpired)));

    assert!(ctx.client.tokens().current().is_none());
    assert_eq!(*observer.borrow_and_update(), SessionState::SignedOut);
}

#[tokio::test]
async fn test_sign_in_rejection_does_not_refresh() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/auth/signin"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&ctx.backend)
        .await;

    // A public request's 401 must not touch the refresh endpoint
    ctx.mount_refresh("fresh", 0).await;

    let result = ctx.client.api().sign_in("ada@example.com", "wrong").await;
    assert!(matches!(result, Err(ApiError::InvalidCredentials)));
    assert_eq!(ctx.client.tokens().session_state(), SessionState::SignedOut);
}

#[tokio::test]
async fn test_sign_in_installs_credential() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/auth/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "fresh",
            "user": { "id": "u-1", "email": "ada@example.com", "name": "Ada" }
        })))
        .expect(1)
        .mount(&ctx.backend)
        .await;
    mount_orders(&ctx, "fresh", 200, json!([])).await;

    let profile = ctx
        .client
        .api()
        .sign_in("ada@example.com", "hunter2!aB9")
        .await
        .unwrap();
    assert_eq!(profile.email, "ada@example.com");
    assert_eq!(ctx.client.tokens().session_state(), SessionState::SignedIn);

    // Subsequent requests carry the installed credential
    let response = ctx
        .client
        .api()
        .send(&RequestSpec::get("orders"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_sign_out_clears_session_even_if_backend_rejects() {
    let ctx = TestContext::new().await;
    ctx.client.tokens().set(AccessToken::new("stale"));

    Mock::given(method("POST"))
        .and(path("/auth/signout"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&ctx.backend)
        .await;
    ctx.mount_refresh("fresh", 0).await;

    ctx.client.api().sign_out().await.unwrap();

    assert!(ctx.client.tokens().current().is_none());
    assert_eq!(ctx.client.tokens().session_state(), SessionState::SignedOut);
}

#[tokio::test]
async fn test_rate_limit_maps_to_typed_error() {
    let ctx = TestContext::new().await;
    ctx.client.tokens().set(AccessToken::new("fresh"));

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&ctx.backend)
        .await;

    let result = ctx
        .client
        .api()
        .fetch_json::<serde_json::Value>(&RequestSpec::get("orders"))
        .await;
    assert!(matches!(result, Err(ApiError::RateLimited(7))));
}
