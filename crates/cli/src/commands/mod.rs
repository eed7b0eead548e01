//! CLI command implementations.
//!
//! Each submodule maps one group of subcommands onto [`ApiClient`] calls.
//! They share a [`Context`]: one client whose credentials live in
//! `credentials.json`, and one cart persisted to `session.json`.

pub mod backoffice;
pub mod cart;
pub mod coupons;
pub mod menu;
pub mod orders;
pub mod session;

use std::io::BufRead;
use std::sync::Arc;

use secrecy::SecretString;
use tableside_client::{ApiClient, ApiError, CartStore, ClientConfig, FileStore, KeyValueStore};
use tableside_core::{Email, EmailError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Malformed email address.
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    /// Reading from stdin or a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An argument was rejected before contacting the backend.
    #[error("{0}")]
    InvalidArgument(String),
}

impl CliError {
    /// Text to show on the terminal.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Shared state for one command invocation.
pub struct Context {
    pub client: ApiClient,
    session: Arc<dyn KeyValueStore>,
}

impl Context {
    /// Build the client from configuration; the stored credential pair is
    /// picked up by the client on construction.
    pub fn open(config: &ClientConfig) -> Result<Self, CliError> {
        let durable = Arc::new(FileStore::new(config.credentials_path()));
        let client = ApiClient::from_config(config, durable)?;
        let session: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.session_path()));
        Ok(Self { client, session })
    }

    /// The persisted cart, with its dish details hydrated from the catalog.
    pub async fn cart(&self) -> CartStore {
        let cart = CartStore::load(Arc::clone(&self.session), &self.client);
        cart.wait_hydrated().await;
        cart
    }

    /// The persisted cart without fetching the catalog.
    pub fn cart_offline(&self) -> CartStore {
        CartStore::restore(Arc::clone(&self.session))
    }
}

/// Parse an email argument.
pub fn parse_email(raw: &str) -> Result<Email, CliError> {
    Ok(Email::parse(raw)?)
}

/// Use the given password or read one line from stdin.
pub fn password_or_stdin(password: Option<String>) -> Result<SecretString, CliError> {
    if let Some(password) = password {
        return Ok(SecretString::from(password));
    }

    tracing::debug!("reading password from stdin");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(CliError::InvalidArgument("Password must not be empty".to_string()));
    }
    Ok(SecretString::from(password))
}
