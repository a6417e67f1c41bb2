//! In-memory snapshot storage.

use std::sync::{Mutex, PoisonError};

use crate::cart::CartSnapshot;

use super::{SnapshotError, SnapshotStore};

/// Snapshot storage in process memory.
///
/// Used when no durable path is configured, and by tests. The record is
/// held in its serialized form so this store exercises the same
/// round-trip as [`FileStore`](super::FileStore).
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<CartSnapshot>, SnapshotError> {
        self.lock()
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(SnapshotError::from)
    }

    fn save(&self, snapshot: &CartSnapshot) -> Result<(), SnapshotError> {
        let serialized = serde_json::to_string(snapshot)?;
        *self.lock() = Some(serialized);
        Ok(())
    }

    fn clear(&self) -> Result<(), SnapshotError> {
        *self.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_clear() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        let snapshot = CartSnapshot::empty();
        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), snapshot);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
