//! Sign-in, session restore and sign-out against the fake backend.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tableside_client::api::INVALID_CREDENTIALS;
use tableside_client::auth::CredentialPair;
use tableside_client::http::{Method, StatusCode};
use tableside_client::storage::keys;
use tableside_client::{ErrorKind, KeyValueStore, MemoryStore, SessionStatus};
use tableside_core::Email;
use tableside_integration_tests::{
    FakeBackend, TEST_EMAIL, TEST_PASSWORD, client_for, stored_session,
};

fn profile() -> serde_json::Value {
    json!({
        "email": TEST_EMAIL,
        "name": "anna",
        "first_name": "Anna",
        "last_name": "Kovács",
        "phone": "+36301234567",
        "points": 120,
    })
}

fn email() -> Email {
    Email::parse(TEST_EMAIL).unwrap()
}

#[tokio::test]
async fn sign_in_stores_tokens_and_loads_profile() {
    let backend = FakeBackend::new();
    backend.route(Method::GET, "/user_details", StatusCode::OK, profile());
    let durable = Arc::new(MemoryStore::new());
    let client = client_for(&backend, durable.clone());
    assert_eq!(client.session_status(), SessionStatus::SignedOut);

    client
        .sign_in(&email(), &SecretString::from(TEST_PASSWORD))
        .await
        .unwrap();

    assert_eq!(client.session_status(), SessionStatus::SignedIn);
    assert_eq!(client.current_user().unwrap().display_name(), "Anna Kovács");
    assert_eq!(durable.get(keys::ACCESS_TOKEN).unwrap(), backend.valid_access());
    assert!(durable.contains(keys::REFRESH_TOKEN));

    let sign_in = backend.calls_to("/sign_in");
    assert_eq!(sign_in.len(), 1);
    assert_eq!(sign_in.first().unwrap().bearer, None);
    assert_eq!(
        backend.calls_to("/user_details").first().unwrap().bearer,
        backend.valid_access()
    );
}

#[tokio::test]
async fn wrong_password_is_rejected_without_refresh() {
    let backend = FakeBackend::new();
    let client = client_for(&backend, Arc::new(MemoryStore::new()));

    let err = client
        .sign_in(&email(), &SecretString::from("wrong"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.user_message(), INVALID_CREDENTIALS);
    assert_eq!(backend.refresh_count(), 0);
    assert_eq!(backend.calls().len(), 1);
    assert_eq!(client.session_status(), SessionStatus::SignedOut);
}

#[tokio::test]
async fn sign_in_over_a_stale_session_replaces_it() {
    let backend = FakeBackend::new();
    backend.route(Method::GET, "/user_details", StatusCode::OK, profile());
    let stale = CredentialPair {
        access: SecretString::from("access-from-last-week"),
        refresh: Some(SecretString::from("refresh-from-last-week")),
    };
    let durable = Arc::new(stored_session(&stale));
    let client = client_for(&backend, durable.clone());

    client
        .sign_in(&email(), &SecretString::from(TEST_PASSWORD))
        .await
        .unwrap();

    // The stale pair is never presented, so nothing needs refreshing.
    assert_eq!(backend.refresh_count(), 0);
    assert_eq!(backend.calls_to("/sign_in").first().unwrap().bearer, None);
    assert_eq!(
        durable.get(keys::REFRESH_TOKEN).unwrap().as_deref(),
        Some("refresh-1")
    );
}

#[tokio::test]
async fn restore_session_refreshes_an_expired_token() {
    let backend = FakeBackend::new();
    backend.route(Method::GET, "/user_details", StatusCode::OK, profile());
    let pair = backend.issue_session();
    let durable = Arc::new(stored_session(&pair));
    backend.expire_access();

    let client = client_for(&backend, durable.clone());
    assert_eq!(client.session_status(), SessionStatus::SignedIn);

    let user = client.restore_session().await.unwrap();

    assert_eq!(user.email, TEST_EMAIL);
    assert_eq!(backend.refresh_count(), 1);
    assert_eq!(durable.get(keys::ACCESS_TOKEN).unwrap(), backend.valid_access());
    assert_ne!(
        backend.valid_access().as_deref(),
        Some(pair.access.expose_secret())
    );
}

#[tokio::test]
async fn restore_session_with_revoked_tokens_signs_out() {
    let backend = FakeBackend::new();
    backend.route(Method::GET, "/user_details", StatusCode::OK, profile());
    let pair = backend.issue_session();
    let durable = Arc::new(stored_session(&pair));
    backend.expire_access();
    backend.revoke_refresh();

    let client = client_for(&backend, durable.clone());

    assert!(client.restore_session().await.is_none());
    assert!(!client.session_status().is_signed_in());
    assert!(!durable.contains(keys::ACCESS_TOKEN));
    assert!(client.current_user().is_none());
}

#[tokio::test]
async fn restore_session_without_tokens_makes_no_request() {
    let backend = FakeBackend::new();
    let client = client_for(&backend, Arc::new(MemoryStore::new()));

    assert!(client.restore_session().await.is_none());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn logout_forgets_credentials() {
    let backend = FakeBackend::new();
    backend.route(Method::GET, "/user_details", StatusCode::OK, profile());
    backend.route(Method::GET, "/api/orders/my-orders/", StatusCode::OK, json!([]));
    let durable = Arc::new(MemoryStore::new());
    let client = client_for(&backend, durable.clone());
    client
        .sign_in(&email(), &SecretString::from(TEST_PASSWORD))
        .await
        .unwrap();

    client.logout();

    assert_eq!(client.session_status(), SessionStatus::SignedOut);
    assert!(client.current_user().is_none());
    assert!(!durable.contains(keys::ACCESS_TOKEN));
    assert!(!durable.contains(keys::REFRESH_TOKEN));

    let err = client.my_orders().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthenticationRequired);
    assert_eq!(backend.refresh_count(), 0);
    assert_eq!(
        backend.calls_to("/api/orders/my-orders/").first().unwrap().bearer,
        None
    );
}
