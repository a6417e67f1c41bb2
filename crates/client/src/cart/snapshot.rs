//! Durable cart snapshot format.
//!
//! The snapshot is the exact persisted serialization of cart state. It
//! carries a format version and a timestamp; a restored record that is
//! from another version, too old, or internally inconsistent is treated
//! as absent and the cart starts empty.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use tamarind_core::{BranchId, ItemId};

use crate::api::ItemDetail;

use super::CartLine;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A food cart older than this is not worth restoring.
const MAX_SNAPSHOT_AGE_HOURS: i64 = 24;

/// Persisted serialization of cart state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Snapshot format version.
    pub version: u32,
    /// When this snapshot was written.
    pub saved_at: DateTime<Utc>,
    /// The branch whose items occupy the cart. `None` iff `lines` is empty.
    pub active_branch: Option<BranchId>,
    /// Cart lines, unique by item ID.
    pub lines: Vec<CartLine>,
    /// Last-fetched authoritative details for items in `lines`.
    pub details: HashMap<ItemId, ItemDetail>,
}

impl CartSnapshot {
    /// An empty snapshot stamped now.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            active_branch: None,
            lines: Vec::new(),
            details: HashMap::new(),
        }
    }

    /// Whether the snapshot holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Validate a restored snapshot, returning `None` if it cannot be
    /// trusted.
    ///
    /// Checks the format version, the age, the branch/lines coherence,
    /// and item ID uniqueness. Detail entries for items not in `lines`
    /// are dropped rather than rejected.
    pub(crate) fn validated(mut self, now: DateTime<Utc>) -> Option<Self> {
        if self.version != SNAPSHOT_VERSION {
            return None;
        }
        if now.signed_duration_since(self.saved_at) > Duration::hours(MAX_SNAPSHOT_AGE_HOURS) {
            return None;
        }
        if self.lines.is_empty() != self.active_branch.is_none() {
            return None;
        }

        let mut ids = HashSet::new();
        if !self.lines.iter().all(|line| ids.insert(line.item_id.clone())) {
            return None;
        }
        if self.details.values().any(|d| d.price.is_sign_negative()) {
            return None;
        }

        self.details.retain(|id, _| ids.contains(id));
        Some(self)
    }
}
