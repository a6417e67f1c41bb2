//! Wire types for the marketplace API.
//!
//! These are the typed decoding contracts at the API boundary: malformed
//! payloads fail fast with a decode error instead of propagating nulls.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tamarind_core::{ItemId, UserId};

/// Authoritative item data, always sourced from the backend.
///
/// The cart never fabricates or mutates these fields locally; a line
/// whose detail has not resolved yet simply contributes nothing to the
/// subtotal until it does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetail {
    /// Item ID.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Unit price. The backend stores prices as JSON numbers.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Description text.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the item is currently orderable.
    #[serde(default = "default_available")]
    pub available: bool,
}

const fn default_available() -> bool {
    true
}

/// Signed-in user data returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID.
    pub id: UserId,
    /// Account email.
    pub email: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Response body of the sign-in and sign-up endpoints.
#[derive(Debug, Deserialize)]
pub struct SignInResponse {
    /// Fresh access token.
    pub token: String,
    /// Profile of the signed-in user.
    pub user: UserProfile,
}

/// Response body of the refresh endpoint.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    /// Fresh access token.
    pub token: String,
}
