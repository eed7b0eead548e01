//! Tableside Core - Shared domain types.
//!
//! This crate provides the types used across all Tableside components:
//! - `client` - Async API client (auth gateway, cart reconciler, endpoints)
//! - `cli` - Command-line front end for customers and back-office staff
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
