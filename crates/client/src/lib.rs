//! Tableside client library.
//!
//! Async client for the Tableside restaurant ordering backend.
//!
//! # Architecture
//!
//! - [`auth`] - credential storage and the [`AuthGateway`](auth::AuthGateway),
//!   which refreshes an expired access token once for all concurrent callers
//!   and retries each rejected request exactly once
//! - [`cart`] - the session-persisted cart and its lazy catalog hydration
//! - [`api`] - typed endpoint wrappers ([`ApiClient`])
//! - [`http`] - request/response values and the `reqwest` transport
//! - [`storage`] - durable and session key/value stores
//! - [`config`] - environment-driven configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tableside_client::{ApiClient, CartStore, ClientConfig, FileStore, MemoryStore};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let client = ApiClient::from_config(&config, Arc::new(FileStore::new(config.credentials_path())))?;
//! client.restore_session().await;
//!
//! let cart = CartStore::load(Arc::new(MemoryStore::new()), &client);
//! for dish in client.dishes().await?.iter().take(1) {
//!     cart.add(dish, None, 1);
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod config;
pub mod error;
pub mod http;
pub mod storage;

pub use api::ApiClient;
pub use auth::SessionStatus;
pub use cart::{CartLine, CartLineView, CartStore, CatalogSource};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, ErrorKind, RefreshFailure};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
