//! Token refresh through the full client.
//!
//! An expired access token must cost exactly one refresh however many
//! requests notice it, and every rejected request is retried at most once.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tableside_client::http::{Method, StatusCode};
use tableside_client::storage::keys;
use tableside_client::{ApiError, ErrorKind, KeyValueStore, SessionStatus};
use tableside_integration_tests::{FakeBackend, client_for, stored_session};

const MY_ORDERS: &str = "/api/orders/my-orders/";

fn attempts_per_request(backend: &FakeBackend, path: &str) -> HashMap<String, usize> {
    let mut attempts = HashMap::new();
    for call in backend.calls_to(path) {
        *attempts.entry(call.request_id).or_insert(0) += 1;
    }
    attempts
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_refresh() {
    let backend = FakeBackend::new();
    backend.route(Method::GET, MY_ORDERS, StatusCode::OK, json!([]));
    let pair = backend.issue_session();
    let durable = Arc::new(stored_session(&pair));
    let client = client_for(&backend, durable.clone());

    backend.expire_access();
    backend.set_refresh_delay(Duration::from_millis(50));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.my_orders().await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().unwrap().is_empty());
    }

    assert_eq!(backend.refresh_count(), 1);

    let attempts = attempts_per_request(&backend, MY_ORDERS);
    assert_eq!(attempts.len(), 8);
    assert!(attempts.values().all(|&n| n <= 2), "{attempts:?}");

    // The rotated token is what gets stored and used from now on.
    let fresh = backend.valid_access().unwrap();
    assert_eq!(durable.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some(fresh.as_str()));
    assert_eq!(durable.get(keys::REFRESH_TOKEN).unwrap(), pair_refresh(&pair));
    assert_eq!(client.session_status(), SessionStatus::SignedIn);
}

#[tokio::test]
async fn unauthorized_after_retry_is_returned_not_retried_again() {
    let backend = FakeBackend::new();
    backend.route(
        Method::GET,
        "/user_details",
        StatusCode::UNAUTHORIZED,
        json!({"detail": "Account disabled"}),
    );
    let pair = backend.issue_session();
    let client = client_for(&backend, Arc::new(stored_session(&pair)));

    let err = client.load_user_details().await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Account disabled"), "{err:?}");
    assert_eq!(err.kind(), ErrorKind::AuthenticationRequired);
    assert_eq!(backend.refresh_count(), 1);
    assert_eq!(backend.calls_to("/user_details").len(), 2);
    assert!(client.current_user().is_none());
}

#[tokio::test]
async fn other_failures_are_not_retried() {
    let backend = FakeBackend::new();
    backend.route(
        Method::GET,
        MY_ORDERS,
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": "database unavailable"}),
    );
    let pair = backend.issue_session();
    let client = client_for(&backend, Arc::new(stored_session(&pair)));

    let err = client.my_orders().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(backend.refresh_count(), 0);
    assert_eq!(backend.calls_to(MY_ORDERS).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn revoked_refresh_token_signs_everyone_out_once() {
    let backend = FakeBackend::new();
    backend.route(Method::GET, MY_ORDERS, StatusCode::OK, json!([]));
    let pair = backend.issue_session();
    let durable = Arc::new(stored_session(&pair));
    let client = client_for(&backend, durable.clone());
    let mut status = client.subscribe();

    backend.expire_access();
    backend.revoke_refresh();
    backend.set_refresh_delay(Duration::from_millis(20));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.my_orders().await })
        })
        .collect();
    for task in tasks {
        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationRequired, "{err:?}");
    }

    assert_eq!(backend.refresh_count(), 1);
    assert_eq!(client.session_status(), SessionStatus::ReauthRequired);
    assert!(durable.get(keys::ACCESS_TOKEN).unwrap().is_none());
    assert!(durable.get(keys::REFRESH_TOKEN).unwrap().is_none());

    // One transition, observed once.
    assert!(status.has_changed().unwrap());
    assert_eq!(*status.borrow_and_update(), SessionStatus::ReauthRequired);
    assert!(!status.has_changed().unwrap());
}

#[tokio::test]
async fn later_requests_use_the_refreshed_token_directly() {
    let backend = FakeBackend::new();
    backend.route(Method::GET, MY_ORDERS, StatusCode::OK, json!([]));
    let pair = backend.issue_session();
    let client = client_for(&backend, Arc::new(stored_session(&pair)));

    backend.expire_access();
    client.my_orders().await.unwrap();
    client.my_orders().await.unwrap();

    let calls = backend.calls_to(MY_ORDERS);
    assert_eq!(calls.len(), 3);
    let fresh = backend.valid_access();
    assert_eq!(calls.get(1).unwrap().bearer, fresh);
    assert_eq!(calls.get(2).unwrap().bearer, fresh);
    assert_eq!(backend.refresh_count(), 1);
}

fn pair_refresh(pair: &tableside_client::auth::CredentialPair) -> Option<String> {
    use secrecy::ExposeSecret;
    pair.refresh.as_ref().map(|r| r.expose_secret().to_string())
}
