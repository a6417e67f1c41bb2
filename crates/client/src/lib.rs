//! Tamarind client library - session and cart layer.
//!
//! This crate provides the state layer shared by the Tamarind consumer
//! apps: an authenticated API session that survives silent token refresh,
//! and a single-branch cart that merges local mutations with
//! authoritative item data and survives process restarts.
//!
//! # Architecture
//!
//! - Every outbound request passes through [`ApiClient`], which attaches
//!   the current credential and coordinates a single-flight token refresh
//!   on auth failures
//! - [`TokenManager`] owns the credential; it is never persisted
//! - [`CartStore`] owns cart state; mutations are synchronous and are
//!   followed by a durable snapshot write
//! - Item details are authoritative backend data, batch-fetched and
//!   cached via `moka` by [`ItemDetailCache`]
//!
//! # Example
//!
//! ```rust,ignore
//! use tamarind_client::{ClientConfig, TamarindClient};
//! use tamarind_core::{BranchId, ItemId, Quantity};
//!
//! let client = TamarindClient::new(&ClientConfig::from_env()?)?;
//!
//! client.api().sign_in("ada@example.com", "hunter2!aB9").await?;
//!
//! let cart = client.cart();
//! cart.add_item(ItemId::new("pizza-1"), Quantity::ONE, &BranchId::new("branch-A"))?;
//! cart.ensure_details(&[ItemId::new("pizza-1")]).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
mod client;
pub mod config;
mod error;
pub mod persist;
pub mod session;

pub use api::{ApiClient, ApiError, ItemDetail, RequestSpec, UserProfile};
pub use cart::{CartError, CartLine, CartSnapshot, CartStore, ItemDetailCache};
pub use client::TamarindClient;
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use persist::{FileStore, MemoryStore, SnapshotError, SnapshotStore};
pub use session::{SessionState, TokenManager};
