//! Authentication: credential storage, token refresh, and the gateway that
//! puts them in front of every request.

mod credentials;
mod gateway;
mod refresh;

pub use credentials::{CredentialPair, CredentialStore};
pub use gateway::AuthGateway;
pub use refresh::{HttpRefresher, REFRESH_PATH, TokenRefresher};

/// Where the session stands, as seen by the UI layer.
///
/// Published through a `tokio::sync::watch` channel by the gateway.
/// `ReauthRequired` is the "send the user to sign-in" signal: it is raised
/// when the credentials were cleared because they could not be refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    /// No credentials held.
    #[default]
    SignedOut,
    /// Credentials held and, as far as we know, valid.
    SignedIn,
    /// Credentials were rejected and have been cleared.
    ReauthRequired,
}

impl SessionStatus {
    /// Whether an access token is expected to be held.
    #[must_use]
    pub const fn is_signed_in(self) -> bool {
        matches!(self, Self::SignedIn)
    }
}
