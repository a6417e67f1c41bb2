//! Type-safe cart line quantity.
//!
//! A stored quantity of zero is unrepresentable: removal deletes the
//! line instead. Wrapping `NonZeroU32` makes that structural, and serde
//! rejects a zero during deserialization of persisted snapshots.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Quantity of a single cart line. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// The default quantity for a newly added line.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity, returning `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Get the underlying u32 value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Add another quantity, saturating at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        match NonZeroU32::new(self.0.get().saturating_add(other.0.get())) {
            Some(sum) => Self(sum),
            // Both operands are non-zero, so the saturating sum is too.
            None => Self::ONE,
        }
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}
