//! Integration test support for Tableside.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tableside-integration-tests
//! ```
//!
//! The tests drive a real [`ApiClient`] against [`FakeBackend`], an
//! in-process stand-in for the restaurant backend. It plays both seams the
//! client exposes: it is the [`Transport`] every request goes through and
//! the [`TokenRefresher`] the gateway calls. It validates bearer tokens the
//! way the real backend does, so expiring an access token server-side and
//! watching the client recover is a one-liner.
//!
//! # Test Categories
//!
//! - `auth_refresh` - single-flight refresh and the one-retry rule
//! - `session` - sign-in, restore, sign-out and the reauth signal
//! - `cart` - cart persistence, hydration and checkout

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tableside_client::auth::{CredentialPair, TokenRefresher};
use tableside_client::http::{ApiRequest, ApiResponse, Method, RequestBody, StatusCode, Transport};
use tableside_client::storage::keys;
use tableside_client::{ApiClient, ApiError, KeyValueStore, MemoryStore, RefreshFailure};

/// Client type used throughout the tests.
pub type TestClient = ApiClient<Arc<FakeBackend>, Arc<FakeBackend>>;

/// Account the backend accepts at `/sign_in`.
pub const TEST_EMAIL: &str = "anna@example.com";
/// Password for [`TEST_EMAIL`].
pub const TEST_PASSWORD: &str = "correct horse";

/// One request as the backend saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
    /// Correlation id; a retried request keeps its id.
    pub request_id: String,
}

#[derive(Default)]
struct BackendState {
    access: Option<String>,
    refresh: Option<String>,
    issued: u32,
    routes: HashMap<(Method, String), (StatusCode, Value)>,
    public: HashSet<String>,
    calls: Vec<RecordedCall>,
}

impl BackendState {
    fn mint_access(&mut self) -> String {
        self.issued += 1;
        let token = format!("access-{}", self.issued);
        self.access = Some(token.clone());
        token
    }
}

/// In-process backend: token validation, canned routes, and a call log.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
    refresh_calls: AtomicUsize,
    refresh_delay: Mutex<Duration>,
}

impl FakeBackend {
    /// A backend with no session and no routes.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer `method path` with `status` and `body` for authorized callers.
    pub fn route(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        self.lock()
            .routes
            .insert((method, path.to_string()), (status, body));
    }

    /// Like [`route`](Self::route), but answered without checking the bearer.
    pub fn route_public(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        let mut state = self.lock();
        state.public.insert(path.to_string());
        state.routes.insert((method, path.to_string()), (status, body));
    }

    /// Issue a fresh token pair, as a sign-in would.
    pub fn issue_session(&self) -> CredentialPair {
        let mut state = self.lock();
        let access = state.mint_access();
        let refresh = format!("refresh-{}", state.issued);
        state.refresh = Some(refresh.clone());
        CredentialPair {
            access: SecretString::from(access),
            refresh: Some(SecretString::from(refresh)),
        }
    }

    /// Expire the current access token. The refresh token stays valid.
    pub fn expire_access(&self) {
        self.lock().access = Some("expired-elsewhere".to_string());
    }

    /// Revoke the refresh token; further refreshes are rejected with 401.
    pub fn revoke_refresh(&self) {
        self.lock().refresh = None;
    }

    /// Make every refresh take `delay` before answering.
    pub fn set_refresh_delay(&self, delay: Duration) {
        *self
            .refresh_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Number of refresh exchanges performed.
    #[must_use]
    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Every request received, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Requests received for `path`.
    #[must_use]
    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.path == path)
            .cloned()
            .collect()
    }

    /// The access token the backend currently accepts.
    #[must_use]
    pub fn valid_access(&self) -> Option<String> {
        self.lock().access.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn answer(&self, request: &ApiRequest, bearer: Option<&SecretString>) -> ApiResponse {
        let bearer = bearer.map(|b| b.expose_secret().to_string());
        let body = match request.body() {
            RequestBody::Json(value) => Some(value.clone()),
            _ => None,
        };

        let mut state = self.lock();
        state.calls.push(RecordedCall {
            method: request.method().clone(),
            path: request.path().to_string(),
            bearer: bearer.clone(),
            body: body.clone(),
            request_id: request.request_id().to_string(),
        });

        if request.path() == "/sign_in" {
            drop(state);
            return self.sign_in(body.as_ref());
        }

        let public = state.public.contains(request.path());
        if !public && (bearer.is_none() || bearer != state.access) {
            return ApiResponse::with_json(
                StatusCode::UNAUTHORIZED,
                &json!({"detail": "Given token not valid for any token type"}),
            );
        }

        match state
            .routes
            .get(&(request.method().clone(), request.path().to_string()))
        {
            Some((status, body)) => ApiResponse::with_json(*status, body),
            None => ApiResponse::with_json(StatusCode::NOT_FOUND, &json!({"detail": "Not found."})),
        }
    }

    fn sign_in(&self, body: Option<&Value>) -> ApiResponse {
        let field = |name: &str| {
            body.and_then(|b| b.get(name))
                .and_then(Value::as_str)
                .unwrap_or_default()
        };
        if field("email") != TEST_EMAIL || field("password") != TEST_PASSWORD {
            return ApiResponse::with_json(
                StatusCode::UNAUTHORIZED,
                &json!({"detail": "No active account found with the given credentials"}),
            );
        }

        let pair = self.issue_session();
        ApiResponse::with_json(
            StatusCode::OK,
            &json!({
                "access": pair.access.expose_secret(),
                "refresh": pair.refresh.as_ref().map(|r| r.expose_secret()),
            }),
        )
    }
}

impl Transport for FakeBackend {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&SecretString>,
    ) -> Result<ApiResponse, ApiError> {
        // Let other tasks interleave as they would on a real network.
        tokio::task::yield_now().await;
        Ok(self.answer(request, bearer))
    }
}

impl TokenRefresher for FakeBackend {
    async fn refresh(&self, refresh_token: &SecretString) -> Result<SecretString, RefreshFailure> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self
            .refresh_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if state.refresh.as_deref() != Some(refresh_token.expose_secret()) {
            tracing::debug!("fake backend rejecting refresh token");
            return Err(RefreshFailure::Rejected(401));
        }
        Ok(SecretString::from(state.mint_access()))
    }
}

/// A client talking to `backend`, with credentials kept in `durable`.
#[must_use]
pub fn client_for(backend: &Arc<FakeBackend>, durable: Arc<dyn KeyValueStore>) -> TestClient {
    ApiClient::new(
        Arc::clone(backend),
        Arc::clone(backend),
        durable,
        Duration::from_secs(60),
    )
}

/// Durable storage already holding `pair`, as left by an earlier session.
///
/// # Panics
///
/// Panics if the in-memory store rejects the write.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn stored_session(pair: &CredentialPair) -> MemoryStore {
    let store = MemoryStore::new();
    store
        .set(keys::ACCESS_TOKEN, pair.access.expose_secret())
        .unwrap();
    if let Some(refresh) = &pair.refresh {
        store
            .set(keys::REFRESH_TOKEN, refresh.expose_secret())
            .unwrap();
    }
    store
}

/// A dish as the backend lists it.
#[must_use]
pub fn dish_json(id: i64, name: &str, price: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": "",
        "price": price,
        "category": "Mains",
        "allergies": [],
    })
}
