//! Durable storage for cart snapshots.
//!
//! One logical record: the serialized cart snapshot. Every write fully
//! replaces the stored record - there are no partial-field patches, so a
//! reader can never observe an interleaved half-written state.
//!
//! A write failure is non-fatal by contract: in-memory cart state remains
//! the source of truth for the running session, and only cross-restart
//! durability is affected. The cart store logs and continues.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use thiserror::Error;

use crate::cart::CartSnapshot;

/// Errors that can occur reading or writing the durable snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Underlying storage I/O failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be serialized or parsed.
    #[error("snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable key/value storage for the cart snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Read the stored snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read or parsed.
    fn load(&self) -> Result<Option<CartSnapshot>, SnapshotError>;

    /// Replace the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save(&self, snapshot: &CartSnapshot) -> Result<(), SnapshotError>;

    /// Remove the stored snapshot. Removing an absent record is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be removed.
    fn clear(&self) -> Result<(), SnapshotError>;
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for Arc<T> {
    fn load(&self) -> Result<Option<CartSnapshot>, SnapshotError> {
        (**self).load()
    }

    fn save(&self, snapshot: &CartSnapshot) -> Result<(), SnapshotError> {
        (**self).save(snapshot)
    }

    fn clear(&self) -> Result<(), SnapshotError> {
        (**self).clear()
    }
}
