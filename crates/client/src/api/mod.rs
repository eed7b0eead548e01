//! Typed client for the Tableside backend.
//!
//! Every call goes through the shared [`AuthGateway`], so a token refresh
//! triggered by one caller is seen by every clone of the client. Catalog
//! reads are cached using `moka` (TTL from `TABLESIDE_CATALOG_TTL_SECS`).

mod auth;
mod cache;
mod catalog;
mod contact;
mod coupons;
mod orders;
mod statistics;
pub mod types;

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::debug;

use crate::auth::{AuthGateway, CredentialStore, HttpRefresher, SessionStatus, TokenRefresher};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{ApiRequest, ApiResponse, HttpTransport, Transport};
use crate::storage::KeyValueStore;

use cache::{CacheKey, CacheValue};
use types::User;

pub use auth::INVALID_CREDENTIALS;
pub use orders::DEFAULT_CANCEL_REASON;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Tableside backend.
///
/// Cheap to clone; all clones share one gateway, one catalog cache and one
/// signed-in user.
pub struct ApiClient<T = HttpTransport, R = HttpRefresher> {
    inner: Arc<ApiClientInner<T, R>>,
}

struct ApiClientInner<T, R> {
    gateway: AuthGateway<T, R>,
    cache: Cache<CacheKey, CacheValue>,
    user: RwLock<Option<User>>,
}

impl<T, R> Clone for ApiClient<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, R> std::fmt::Debug for ApiClient<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("gateway", &self.inner.gateway)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client talking HTTP to the configured backend.
    ///
    /// `durable` holds the credential pair across sessions.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the HTTP clients cannot be built.
    pub fn from_config(
        config: &ClientConfig,
        durable: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(config)?;
        let refresher = HttpRefresher::new(config)?;
        Ok(Self::new(transport, refresher, durable, config.catalog_ttl))
    }
}

impl<T: Transport, R: TokenRefresher> ApiClient<T, R> {
    /// Create a client from its parts.
    pub fn new(
        transport: T,
        refresher: R,
        durable: Arc<dyn KeyValueStore>,
        catalog_ttl: Duration,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(catalog_ttl)
            .build();

        let credentials = CredentialStore::load(durable);

        Self {
            inner: Arc::new(ApiClientInner {
                gateway: AuthGateway::new(transport, refresher, credentials),
                cache,
                user: RwLock::new(None),
            }),
        }
    }

    /// Send a request through the gateway and fail on a non-success status.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error, or [`ApiError::from_response`] for a
    /// non-2xx response.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let response = self.inner.gateway.execute(request).await?;
        if !response.is_success() {
            let err = ApiError::from_response(&response);
            debug!(status = response.status().as_u16(), error = %err, "request failed");
            return Err(err);
        }
        Ok(response)
    }

    async fn get_json<D: DeserializeOwned>(&self, path: &str) -> Result<D, ApiError> {
        let response = self.send(ApiRequest::get(path)).await?;
        Ok(response.json()?)
    }

    async fn post_json<B, D>(&self, path: &str, body: &B) -> Result<D, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        D: DeserializeOwned,
    {
        let response = self.send(ApiRequest::post(path).json(body)?).await?;
        Ok(response.json()?)
    }
}

impl<T, R> ApiClient<T, R> {
    /// The auth gateway shared by all clones.
    #[must_use]
    pub fn gateway(&self) -> &AuthGateway<T, R> {
        &self.inner.gateway
    }

    /// Current session status.
    #[must_use]
    pub fn session_status(&self) -> SessionStatus {
        self.inner.gateway.status()
    }

    /// Subscribe to session status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.inner.gateway.subscribe()
    }

    /// Profile of the signed-in user, once loaded.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner
            .user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_user(&self, user: Option<User>) {
        *self.inner.user.write().unwrap_or_else(PoisonError::into_inner) = user;
    }
}
