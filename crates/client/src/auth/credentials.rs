//! The credential pair and its durable storage.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::storage::{KeyValueStore, keys};

/// Access and refresh token as issued at sign-in.
#[derive(Debug, Clone)]
pub struct CredentialPair {
    /// Short-lived bearer credential.
    pub access: SecretString,
    /// Long-lived credential exchanged for new access tokens.
    pub refresh: Option<SecretString>,
}

#[derive(Default)]
struct Held {
    access: Option<SecretString>,
    refresh: Option<SecretString>,
}

/// In-memory view of the credential pair, written through to durable storage.
///
/// The in-memory copy is authoritative: a failed storage write is logged
/// and the process keeps using the token it holds.
pub struct CredentialStore {
    storage: Arc<dyn KeyValueStore>,
    held: RwLock<Held>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("has_access_token", &self.has_access_token())
            .field("has_refresh_token", &self.refresh_token().is_some())
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Load whatever tokens `storage` holds.
    ///
    /// Unreadable storage is treated as holding nothing.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let read = |key: &str| match storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()).map(SecretString::from),
            Err(e) => {
                warn!(key, error = %e, "failed to read stored credential");
                None
            }
        };

        let held = Held {
            access: read(keys::ACCESS_TOKEN),
            refresh: read(keys::REFRESH_TOKEN),
        };

        Self {
            storage,
            held: RwLock::new(held),
        }
    }

    /// Current access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.held
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access
            .clone()
    }

    /// Current refresh token, if any.
    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.held
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh
            .clone()
    }

    /// Whether an access token is held.
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.held
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access
            .is_some()
    }

    /// Whether `token` is the access token currently held.
    #[must_use]
    pub fn is_current(&self, token: Option<&SecretString>) -> bool {
        let held = self.held.read().unwrap_or_else(PoisonError::into_inner);
        match (held.access.as_ref(), token) {
            (Some(current), Some(token)) => current.expose_secret() == token.expose_secret(),
            (None, None) => true,
            _ => false,
        }
    }

    /// Replace both tokens (sign-in).
    pub fn store_pair(&self, pair: CredentialPair) {
        {
            let mut held = self.held.write().unwrap_or_else(PoisonError::into_inner);
            held.access = Some(pair.access.clone());
            held.refresh.clone_from(&pair.refresh);
        }

        self.persist(keys::ACCESS_TOKEN, Some(&pair.access));
        self.persist(keys::REFRESH_TOKEN, pair.refresh.as_ref());
    }

    /// Replace the access token, keeping the refresh token (refresh).
    pub fn rotate_access(&self, access: SecretString) {
        self.held
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .access = Some(access.clone());

        self.persist(keys::ACCESS_TOKEN, Some(&access));
    }

    /// Forget both tokens, in memory and in storage.
    pub fn clear(&self) {
        *self.held.write().unwrap_or_else(PoisonError::into_inner) = Held::default();

        self.persist(keys::ACCESS_TOKEN, None);
        self.persist(keys::REFRESH_TOKEN, None);
    }

    fn persist(&self, key: &str, value: Option<&SecretString>) {
        let result = match value {
            Some(token) => self.storage.set(key, token.expose_secret()),
            None => self.storage.remove(key),
        };
        if let Err(e) = result {
            warn!(key, error = %e, "failed to persist credential");
        }
    }
}
