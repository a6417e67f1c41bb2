//! Tamarind Core - Shared types library.
//!
//! This crate provides common types used across all Tamarind components:
//! - `client` - Session and cart layer shared by the consumer apps
//! - `integration-tests` - End-to-end tests against a mocked backend
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, quantities, and tokens

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
