//! Auth gateway: single-flight credential refresh in front of every request.
//!
//! Every request goes out with the current access token. When the backend
//! answers 401 the gateway decides, under one short-lived lock, which of
//! three things happens:
//!
//! - the token the request was sent with is already stale (another refresh
//!   finished meanwhile): retry once with the current token
//! - a refresh is in flight: park the request on a oneshot channel until the
//!   refresh settles, then retry once with the new token or fail with the
//!   refresh error
//! - nothing is in flight: lead the refresh, settle every parked request,
//!   then retry once
//!
//! The state machine has exactly two states, `Idle` and
//! `Refreshing { waiters }`. The lock is never held across an `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use secrecy::SecretString;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, instrument, warn};

use super::SessionStatus;
use super::credentials::{CredentialPair, CredentialStore};
use super::refresh::TokenRefresher;
use crate::error::{ApiError, RefreshFailure};
use crate::http::{ApiRequest, ApiResponse, StatusCode, Transport};

type RefreshOutcome = Result<SecretString, RefreshFailure>;

enum RefreshState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

/// What a request that just got a 401 should do next.
enum Turn<'a> {
    /// Retry immediately with this (already refreshed) token.
    Retry(SecretString),
    /// Wait for the in-flight refresh.
    Wait(oneshot::Receiver<RefreshOutcome>),
    /// Perform the refresh.
    Lead(RefreshGuard<'a>),
}

/// Held by the request leading a refresh.
///
/// Settling hands the outcome to every waiter and returns the state to
/// `Idle`. If the leader is dropped without settling (its task was
/// cancelled) the state still returns to `Idle`, and the waiters see their
/// channel close.
struct RefreshGuard<'a> {
    state: &'a Mutex<RefreshState>,
    settled: bool,
}

impl RefreshGuard<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) -> usize {
        self.settled = true;
        let previous = std::mem::replace(&mut *lock(self.state), RefreshState::Idle);

        let RefreshState::Refreshing { waiters } = previous else {
            return 0;
        };
        let count = waiters.len();
        for waiter in waiters {
            // A closed receiver means that caller went away; nothing to do.
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let previous = std::mem::replace(&mut *lock(self.state), RefreshState::Idle);
            if let RefreshState::Refreshing { waiters } = previous {
                warn!(waiters = waiters.len(), "token refresh abandoned before settling");
            }
        }
    }
}

fn lock(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wraps a [`Transport`] with bearer authentication and transparent token
/// refresh.
///
/// One gateway exists per session; every clone of the API client shares it,
/// which is what makes the refresh single-flight across all callers.
pub struct AuthGateway<T, R> {
    transport: T,
    refresher: R,
    credentials: CredentialStore,
    state: Mutex<RefreshState>,
    session: watch::Sender<SessionStatus>,
}

impl<T, R> std::fmt::Debug for AuthGateway<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway")
            .field("credentials", &self.credentials)
            .field("status", &*self.session.borrow())
            .finish_non_exhaustive()
    }
}

impl<T: Transport, R: TokenRefresher> AuthGateway<T, R> {
    /// Create a gateway. The initial session status is `SignedIn` when the
    /// credential store already holds an access token.
    pub fn new(transport: T, refresher: R, credentials: CredentialStore) -> Self {
        let initial = if credentials.has_access_token() {
            SessionStatus::SignedIn
        } else {
            SessionStatus::SignedOut
        };
        let (session, _) = watch::channel(initial);

        Self {
            transport,
            refresher,
            credentials,
            state: Mutex::new(RefreshState::Idle),
            session,
        }
    }

    /// Send a request, refreshing the access token and retrying once if the
    /// backend answers 401.
    ///
    /// Responses other than 401 are returned unchanged, success or not. A
    /// 401 on a request that already used its retry is returned unchanged
    /// as well, and so is any response to an anonymous request.
    ///
    /// # Errors
    ///
    /// - `ApiError::AuthenticationRequired` if no refresh token is held
    /// - `ApiError::Refresh` if the refresh failed (credentials are cleared)
    /// - transport errors from either attempt
    #[instrument(
        skip(self, request),
        fields(method = %request.method(), path = %request.path(), request_id = %request.request_id())
    )]
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        if request.is_anonymous() {
            return self.transport.send(&request, None).await;
        }

        let sent_with = self.credentials.access_token();
        let response = self.transport.send(&request, sent_with.as_ref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        if request.is_retried() {
            debug!("unauthorized after retry, giving up");
            return Ok(response);
        }

        request.mark_retried();

        match self.take_turn(sent_with.as_ref()) {
            Turn::Retry(token) => {
                debug!("token was refreshed meanwhile, retrying");
                self.transport.send(&request, Some(&token)).await
            }
            Turn::Wait(receiver) => {
                debug!("waiting for in-flight token refresh");
                let token = match receiver.await {
                    Ok(Ok(token)) => token,
                    Ok(Err(failure)) => return Err(ApiError::Refresh(failure)),
                    Err(_) => return Err(ApiError::Refresh(RefreshFailure::Aborted)),
                };
                self.transport.send(&request, Some(&token)).await
            }
            Turn::Lead(guard) => self.lead_refresh(guard, &request).await,
        }
    }

    fn take_turn(&self, sent_with: Option<&SecretString>) -> Turn<'_> {
        let mut state = lock(&self.state);

        match &mut *state {
            RefreshState::Refreshing { waiters } => {
                let (sender, receiver) = oneshot::channel();
                waiters.push(sender);
                Turn::Wait(receiver)
            }
            RefreshState::Idle => {
                if !self.credentials.is_current(sent_with)
                    && let Some(current) = self.credentials.access_token()
                {
                    return Turn::Retry(current);
                }
                *state = RefreshState::Refreshing {
                    waiters: Vec::new(),
                };
                Turn::Lead(RefreshGuard {
                    state: &self.state,
                    settled: false,
                })
            }
        }
    }

    async fn lead_refresh(
        &self,
        guard: RefreshGuard<'_>,
        request: &ApiRequest,
    ) -> Result<ApiResponse, ApiError> {
        // On failure, credentials are cleared before the state returns to
        // Idle: a late 401 must not find the rejected pair still held.
        let Some(refresh_token) = self.credentials.refresh_token() else {
            warn!("access token rejected and no refresh token held");
            self.require_reauth();
            guard.settle(&Err(RefreshFailure::MissingRefreshToken));
            return Err(ApiError::AuthenticationRequired);
        };

        info!("access token rejected, refreshing");

        match self.refresher.refresh(&refresh_token).await {
            Ok(access) => {
                self.credentials.rotate_access(access.clone());
                let waiters = guard.settle(&Ok(access.clone()));
                info!(waiters, "token refreshed, retrying original request");
                self.transport.send(request, Some(&access)).await
            }
            Err(failure) => {
                self.require_reauth();
                let waiters = guard.settle(&Err(failure.clone()));
                warn!(error = %failure, waiters, "token refresh failed, signing out");
                Err(ApiError::Refresh(failure))
            }
        }
    }

    /// Clear credentials and raise the re-authentication signal, unless it
    /// is already raised.
    fn require_reauth(&self) {
        self.credentials.clear();
        let raised = self.session.send_if_modified(|status| {
            if *status == SessionStatus::ReauthRequired {
                false
            } else {
                *status = SessionStatus::ReauthRequired;
                true
            }
        });
        if raised {
            info!("re-authentication required");
        }
    }

    /// Store a freshly issued credential pair and mark the session signed in.
    pub fn sign_in(&self, pair: CredentialPair) {
        self.credentials.store_pair(pair);
        self.session.send_replace(SessionStatus::SignedIn);
    }

    /// Forget the credential pair and mark the session signed out.
    pub fn sign_out(&self) {
        self.credentials.clear();
        self.session.send_replace(SessionStatus::SignedOut);
    }
}

impl<T, R> AuthGateway<T, R> {
    /// The credential store.
    #[must_use]
    pub const fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Current session status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        *self.session.borrow()
    }

    /// Subscribe to session status changes, including the
    /// re-authentication signal.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.session.subscribe()
    }

    /// Whether a refresh is currently in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        matches!(*lock(&self.state), RefreshState::Refreshing { .. })
    }
}
