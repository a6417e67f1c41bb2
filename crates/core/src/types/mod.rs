//! Core types for Tamarind.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod quantity;
pub mod token;

pub use id::*;
pub use quantity::Quantity;
pub use token::AccessToken;
