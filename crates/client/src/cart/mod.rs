//! Cart state and mutation rules.
//!
//! # Architecture
//!
//! - All items in the cart belong to one merchant branch; a multi-branch
//!   cart is structurally unreachable
//! - Mutations are synchronous on local state and apply in issue order;
//!   each one is followed by a durable snapshot write before it returns
//! - Item details are authoritative backend data merged in
//!   asynchronously; the merge checks current membership so a slow fetch
//!   can never resurrect a removed line
//!
//! The store is the single writer of cart state. UI layers observe it
//! through [`CartStore::subscribe`] and re-render from published
//! snapshots.

mod details;
mod snapshot;

pub use details::ItemDetailCache;
pub use snapshot::{CartSnapshot, SNAPSHOT_VERSION};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;

use tamarind_core::{BranchId, ItemId, Quantity};

use crate::api::{ApiError, ItemDetail};
use crate::persist::SnapshotStore;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The cart already holds items from another branch. Nothing was
    /// mutated; the caller decides whether to confirm a switch and call
    /// [`CartStore::replace_cart`].
    #[error("cart holds items from branch {active}, refusing item from branch {requested}")]
    BranchConflict {
        /// The branch whose items occupy the cart.
        active: BranchId,
        /// The branch of the refused item.
        requested: BranchId,
    },

    /// The batched detail fetch failed. Previously cached details are
    /// preserved; the caller may retry.
    #[error("could not load item details: {0}")]
    DetailFetch(#[from] ApiError),
}

/// One cart line: an item and how many of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// The item.
    pub item_id: ItemId,
    /// How many. Always at least 1; removal deletes the line.
    pub quantity: Quantity,
}

/// In-memory cart state. Single writer: [`CartStore`].
#[derive(Debug, Default)]
struct CartState {
    active_branch: Option<BranchId>,
    lines: Vec<CartLine>,
    details: HashMap<ItemId, ItemDetail>,
}

impl CartState {
    fn from_snapshot(snapshot: CartSnapshot) -> Self {
        Self {
            active_branch: snapshot.active_branch,
            lines: snapshot.lines,
            details: snapshot.details,
        }
    }

    fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            active_branch: self.active_branch.clone(),
            lines: self.lines.clone(),
            details: self.details.clone(),
        }
    }

    fn contains(&self, item_id: &ItemId) -> bool {
        self.lines.iter().any(|line| &line.item_id == item_id)
    }
}

// =============================================================================
// CartStore
// =============================================================================

/// Holder of the cart, its active-branch invariant, and its durability.
///
/// Cheaply cloneable via `Arc`; all clones share one cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    state: Mutex<CartState>,
    store: Box<dyn SnapshotStore>,
    details: ItemDetailCache,
    snapshots: watch::Sender<CartSnapshot>,
}

impl CartStore {
    /// Create an empty cart.
    #[must_use]
    pub fn new(details: ItemDetailCache, store: impl SnapshotStore + 'static) -> Self {
        Self::with_state(details, Box::new(store), CartState::default())
    }

    /// Create a cart restored from the given store.
    ///
    /// A missing, unreadable, stale, or inconsistent snapshot yields an
    /// empty cart; restore never fails.
    #[must_use]
    pub fn restore(details: ItemDetailCache, store: impl SnapshotStore + 'static) -> Self {
        let store = Box::new(store);
        let state = match store.load() {
            Ok(Some(persisted)) => match persisted.validated(Utc::now()) {
                Some(persisted) => CartState::from_snapshot(persisted),
                None => {
                    tracing::warn!("discarding unusable persisted cart snapshot");
                    CartState::default()
                }
            },
            Ok(None) => CartState::default(),
            Err(error) => {
                tracing::warn!(%error, "failed to load persisted cart snapshot");
                CartState::default()
            }
        };

        Self::with_state(details, store, state)
    }

    fn with_state(
        details: ItemDetailCache,
        store: Box<dyn SnapshotStore>,
        state: CartState,
    ) -> Self {
        let (snapshots, _) = watch::channel(state.snapshot());
        Self {
            inner: Arc::new(CartStoreInner {
                state: Mutex::new(state),
                store,
                details,
                snapshots,
            }),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add an item from the given branch.
    ///
    /// An empty cart adopts `branch_id` as its active branch. An existing
    /// line for the item has its quantity incremented.
    ///
    /// # Errors
    ///
    /// Returns `CartError::BranchConflict`, with no mutation performed,
    /// when the cart holds items from a different branch.
    #[instrument(skip(self), fields(item = %item_id, branch = %branch_id))]
    pub fn add_item(
        &self,
        item_id: ItemId,
        quantity: Quantity,
        branch_id: &BranchId,
    ) -> Result<(), CartError> {
        let mut state = self.lock();

        match &state.active_branch {
            Some(active) if active != branch_id => {
                return Err(CartError::BranchConflict {
                    active: active.clone(),
                    requested: branch_id.clone(),
                });
            }
            Some(_) => {}
            None => state.active_branch = Some(branch_id.clone()),
        }

        if let Some(line) = state.lines.iter_mut().find(|line| line.item_id == item_id) {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            state.lines.push(CartLine { item_id, quantity });
        }

        self.commit(&state);
        Ok(())
    }

    /// Set a line's quantity. Zero removes the line.
    #[instrument(skip(self), fields(item = %item_id, quantity))]
    pub fn update_quantity(&self, item_id: &ItemId, quantity: u32) {
        let Some(quantity) = Quantity::new(quantity) else {
            self.remove_item(item_id);
            return;
        };

        let mut state = self.lock();
        let Some(line) = state.lines.iter_mut().find(|line| &line.item_id == item_id) else {
            return;
        };
        line.quantity = quantity;

        self.commit(&state);
    }

    /// Remove a line. Removing the last line resets the active branch.
    #[instrument(skip(self), fields(item = %item_id))]
    pub fn remove_item(&self, item_id: &ItemId) {
        let mut state = self.lock();

        let before = state.lines.len();
        state.lines.retain(|line| &line.item_id != item_id);
        if state.lines.len() == before {
            return;
        }

        state.details.remove(item_id);
        if state.lines.is_empty() {
            state.active_branch = None;
            state.details.clear();
        }

        self.commit(&state);
    }

    /// Empty the cart and erase the persisted snapshot. Idempotent.
    #[instrument(skip(self))]
    pub fn clear(&self) {
        let mut state = self.lock();
        *state = CartState::default();
        self.inner.snapshots.send_replace(state.snapshot());

        if let Err(error) = self.inner.store.clear() {
            tracing::warn!(%error, "failed to erase persisted cart snapshot");
        }
    }

    /// Atomic bulk replace, used for the switch-branch confirmation path.
    ///
    /// Repeated item ids in `lines` are merged by summing quantities. An
    /// empty `lines` leaves the cart empty with no active branch.
    #[instrument(skip(self, lines), fields(branch = %branch_id, count = lines.len()))]
    pub fn replace_cart(&self, lines: Vec<CartLine>, branch_id: BranchId) {
        let mut merged: Vec<CartLine> = Vec::new();
        for line in lines {
            match merged.iter_mut().find(|l| l.item_id == line.item_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => merged.push(line),
            }
        }

        let mut state = self.lock();
        state.active_branch = if merged.is_empty() {
            None
        } else {
            Some(branch_id)
        };
        state.lines = merged;

        // Details for items not in the new cart no longer apply
        let retained: Vec<ItemId> = state.lines.iter().map(|l| l.item_id.clone()).collect();
        state.details.retain(|id, _| retained.contains(id));

        self.commit(&state);
    }

    /// Ensure authoritative details are present for the given items.
    ///
    /// Missing ids are fetched in one batched request. Results for items
    /// no longer in the cart are discarded, not re-added.
    ///
    /// # Errors
    ///
    /// Returns `CartError::DetailFetch` if the batch fetch fails;
    /// previously cached details are untouched.
    #[instrument(skip(self, item_ids), fields(count = item_ids.len()))]
    pub async fn ensure_details(&self, item_ids: &[ItemId]) -> Result<(), CartError> {
        let missing: Vec<ItemId> = {
            let state = self.lock();
            let mut missing = Vec::new();
            for id in item_ids {
                if !state.details.contains_key(id) && !missing.contains(id) {
                    missing.push(id.clone());
                }
            }
            missing
        };

        if missing.is_empty() {
            return Ok(());
        }

        // Suspension point: the state lock is not held across the fetch.
        let fetched = self.inner.details.get_many(&missing).await?;

        let mut state = self.lock();
        if Self::merge_details(&mut state, fetched) > 0 {
            self.commit(&state);
        }
        Ok(())
    }

    /// Merge fetched details, keeping only items still in the cart.
    fn merge_details(state: &mut CartState, fetched: HashMap<ItemId, ItemDetail>) -> usize {
        let mut merged = 0;
        for (id, detail) in fetched {
            if state.contains(&id) {
                state.details.insert(id, detail);
                merged += 1;
            }
        }
        merged
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Total number of items across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lock()
            .lines
            .iter()
            .map(|line| line.quantity.get())
            .fold(0, u32::saturating_add)
    }

    /// Sum of `price * quantity` over lines whose detail has resolved.
    ///
    /// A line without a resolved detail contributes 0 until the
    /// authoritative price arrives; the subtotal is never guessed.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        let state = self.lock();
        state
            .lines
            .iter()
            .map(|line| {
                state.details.get(&line.item_id).map_or(Decimal::ZERO, |d| {
                    d.price * Decimal::from(line.quantity.get())
                })
            })
            .sum()
    }

    /// Find a line by item ID.
    #[must_use]
    pub fn line(&self, item_id: &ItemId) -> Option<CartLine> {
        self.lock()
            .lines
            .iter()
            .find(|line| &line.item_id == item_id)
            .cloned()
    }

    /// The resolved detail for an item in the cart, if fetched yet.
    #[must_use]
    pub fn detail(&self, item_id: &ItemId) -> Option<ItemDetail> {
        self.lock().details.get(item_id).cloned()
    }

    /// The branch whose items occupy the cart.
    #[must_use]
    pub fn active_branch(&self) -> Option<BranchId> {
        self.lock().active_branch.clone()
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().lines.is_empty()
    }

    /// A snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.lock().snapshot()
    }

    /// Subscribe to state changes. The receiver always holds the latest
    /// snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.inner.snapshots.subscribe()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Publish the new state and write it through to durable storage.
    ///
    /// A failed write is logged and absorbed: in-memory state stays the
    /// source of truth for this session, only cross-restart durability is
    /// affected.
    fn commit(&self, state: &CartState) {
        let snapshot = state.snapshot();
        self.inner.snapshots.send_replace(snapshot.clone());

        if let Err(error) = self.inner.store.save(&snapshot) {
            tracing::warn!(%error, "failed to persist cart snapshot");
        }
    }

    fn lock(&self) -> MutexGuard<'_, CartState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use url::Url;

    use crate::persist::MemoryStore;
    use crate::session::TokenManager;

    use super::*;

    fn test_details() -> ItemDetailCache {
        let base_url: Url = "https://api.tamarind.test/".parse().unwrap();
        let tokens = TokenManager::new(reqwest::Client::new(), &base_url).unwrap();
        ItemDetailCache::new(crate::api::ApiClient::new(
            reqwest::Client::new(),
            base_url,
            tokens,
        ))
    }

    fn test_store() -> CartStore {
        CartStore::new(test_details(), MemoryStore::new())
    }

    fn detail(id: &str, price: Decimal) -> ItemDetail {
        ItemDetail {
            id: ItemId::new(id),
            name: id.to_uppercase(),
            price,
            image: None,
            description: None,
            available: true,
        }
    }

    fn quantity(value: u32) -> Quantity {
        Quantity::new(value).unwrap()
    }

    #[test]
    fn test_add_item_to_empty_cart_adopts_branch() {
        let cart = test_store();

        cart.add_item(ItemId::new("pizza-1"), quantity(2), &BranchId::new("branch-A"))
            .unwrap();

        let line = cart.line(&ItemId::new("pizza-1")).unwrap();
        assert_eq!(line.quantity.get(), 2);
        assert_eq!(cart.active_branch(), Some(BranchId::new("branch-A")));
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_add_existing_item_increments_quantity() {
        let cart = test_store();
        let branch = BranchId::new("branch-A");

        cart.add_item(ItemId::new("pizza-1"), quantity(2), &branch).unwrap();
        cart.add_item(ItemId::new("pizza-1"), Quantity::ONE, &branch).unwrap();

        assert_eq!(cart.line(&ItemId::new("pizza-1")).unwrap().quantity.get(), 3);
        assert_eq!(cart.snapshot().lines.len(), 1);
    }

    #[test]
    fn test_cross_branch_add_is_refused_without_mutation() {
        let cart = test_store();
        cart.add_item(ItemId::new("pizza-1"), Quantity::ONE, &BranchId::new("branch-A"))
            .unwrap();

        let before = cart.snapshot();
        let result = cart.add_item(
            ItemId::new("burger-9"),
            Quantity::ONE,
            &BranchId::new("branch-B"),
        );

        match result {
            Err(CartError::BranchConflict { active, requested }) => {
                assert_eq!(active, BranchId::new("branch-A"));
                assert_eq!(requested, BranchId::new("branch-B"));
            }
            other => panic!("expected BranchConflict, got {other:?}"),
        }

        let after = cart.snapshot();
        assert_eq!(after.lines, before.lines);
        assert_eq!(after.active_branch, before.active_branch);
    }

    #[test]
    fn test_update_quantity_to_zero_removes_line() {
        let cart = test_store();
        cart.add_item(ItemId::new("x"), Quantity::ONE, &BranchId::new("branch-A"))
            .unwrap();

        cart.update_quantity(&ItemId::new("x"), 0);

        assert!(cart.is_empty());
        assert_eq!(cart.active_branch(), None);
    }

    #[test]
    fn test_update_quantity_zero_matches_remove_item() {
        let branch = BranchId::new("branch-A");

        let updated = test_store();
        updated.add_item(ItemId::new("x"), quantity(3), &branch).unwrap();
        updated.update_quantity(&ItemId::new("x"), 0);

        let removed = test_store();
        removed.add_item(ItemId::new("x"), quantity(3), &branch).unwrap();
        removed.remove_item(&ItemId::new("x"));

        let a = updated.snapshot();
        let b = removed.snapshot();
        assert_eq!(a.lines, b.lines);
        assert_eq!(a.active_branch, b.active_branch);
        assert_eq!(a.details, b.details);
    }

    #[test]
    fn test_update_quantity_sets_positive_value() {
        let cart = test_store();
        cart.add_item(ItemId::new("x"), Quantity::ONE, &BranchId::new("branch-A"))
            .unwrap();

        cart.update_quantity(&ItemId::new("x"), 5);
        assert_eq!(cart.line(&ItemId::new("x")).unwrap().quantity.get(), 5);
    }

    #[test]
    fn test_remove_non_last_line_keeps_branch() {
        let cart = test_store();
        let branch = BranchId::new("branch-A");
        cart.add_item(ItemId::new("x"), Quantity::ONE, &branch).unwrap();
        cart.add_item(ItemId::new("y"), Quantity::ONE, &branch).unwrap();

        cart.remove_item(&ItemId::new("x"));

        assert_eq!(cart.active_branch(), Some(branch));
        assert!(cart.line(&ItemId::new("y")).is_some());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let cart = test_store();
        cart.add_item(ItemId::new("x"), Quantity::ONE, &BranchId::new("branch-A"))
            .unwrap();

        cart.clear();
        let once = cart.snapshot();

        cart.clear();
        let twice = cart.snapshot();

        assert!(once.is_empty() && twice.is_empty());
        assert_eq!(once.lines, twice.lines);
        assert_eq!(once.active_branch, twice.active_branch);
        assert_eq!(once.details, twice.details);
    }

    #[test]
    fn test_replace_cart_switches_branch_atomically() {
        let cart = test_store();
        cart.add_item(ItemId::new("x"), Quantity::ONE, &BranchId::new("branch-A"))
            .unwrap();

        cart.replace_cart(
            vec![
                CartLine { item_id: ItemId::new("y"), quantity: quantity(2) },
                CartLine { item_id: ItemId::new("y"), quantity: Quantity::ONE },
                CartLine { item_id: ItemId::new("z"), quantity: Quantity::ONE },
            ],
            BranchId::new("branch-B"),
        );

        assert_eq!(cart.active_branch(), Some(BranchId::new("branch-B")));
        assert!(cart.line(&ItemId::new("x")).is_none());
        // Duplicate ids are merged by summing quantities
        assert_eq!(cart.line(&ItemId::new("y")).unwrap().quantity.get(), 3);
        assert_eq!(cart.line(&ItemId::new("z")).unwrap().quantity.get(), 1);
    }

    #[test]
    fn test_replace_cart_with_empty_lines_resets_branch() {
        let cart = test_store();
        cart.add_item(ItemId::new("x"), Quantity::ONE, &BranchId::new("branch-A"))
            .unwrap();

        cart.replace_cart(Vec::new(), BranchId::new("branch-B"));

        assert!(cart.is_empty());
        assert_eq!(cart.active_branch(), None);
    }

    #[test]
    fn test_subtotal_skips_unresolved_details() {
        let cart = test_store();
        let branch = BranchId::new("branch-A");
        cart.add_item(ItemId::new("x"), quantity(2), &branch).unwrap();
        cart.add_item(ItemId::new("y"), Quantity::ONE, &branch).unwrap();

        // Only "x" has a resolved detail
        {
            let mut state = cart.lock();
            let fetched =
                HashMap::from([(ItemId::new("x"), detail("x", Decimal::new(1050, 2)))]);
            assert_eq!(CartStore::merge_details(&mut state, fetched), 1);
            cart.commit(&state);
        }

        // 2 * 10.50; "y" contributes 0 until its detail resolves
        assert_eq!(cart.subtotal(), Decimal::new(2100, 2));
        assert_eq!(cart.detail(&ItemId::new("y")), None);
    }

    #[test]
    fn test_merge_discards_details_for_removed_lines() {
        let cart = test_store();
        cart.add_item(ItemId::new("x"), Quantity::ONE, &BranchId::new("branch-A"))
            .unwrap();
        cart.remove_item(&ItemId::new("x"));

        // A fetch that completed after the removal must not resurrect it
        let mut state = cart.lock();
        let fetched = HashMap::from([(ItemId::new("x"), detail("x", Decimal::ONE))]);
        assert_eq!(CartStore::merge_details(&mut state, fetched), 0);
        assert!(state.details.is_empty());
        assert!(state.lines.is_empty());
    }

    #[test]
    fn test_restore_round_trips_persisted_state() {
        let store = Arc::new(MemoryStore::new());

        let cart = CartStore::new(test_details(), Arc::clone(&store));
        let branch = BranchId::new("branch-A");
        cart.add_item(ItemId::new("x"), quantity(2), &branch).unwrap();
        {
            let mut state = cart.lock();
            let fetched =
                HashMap::from([(ItemId::new("x"), detail("x", Decimal::new(899, 2)))]);
            CartStore::merge_details(&mut state, fetched);
            cart.commit(&state);
        }
        let persisted = cart.snapshot();

        // A new process restores the same cart from the same record
        let restored = CartStore::restore(test_details(), store);
        let snapshot = restored.snapshot();
        assert_eq!(snapshot.lines, persisted.lines);
        assert_eq!(snapshot.active_branch, persisted.active_branch);
        assert_eq!(snapshot.details, persisted.details);
    }

    #[test]
    fn test_restore_discards_other_version() {
        let store = Arc::new(MemoryStore::new());

        let cart = CartStore::new(test_details(), Arc::clone(&store));
        cart.add_item(ItemId::new("x"), Quantity::ONE, &BranchId::new("branch-A"))
            .unwrap();

        let mut snapshot = cart.snapshot();
        snapshot.version = SNAPSHOT_VERSION + 1;
        store.save(&snapshot).unwrap();

        let restored = CartStore::restore(test_details(), store);
        assert!(restored.is_empty());
    }

    #[test]
    fn test_clear_erases_persisted_record() {
        let store = Arc::new(MemoryStore::new());

        let cart = CartStore::new(test_details(), Arc::clone(&store));
        cart.add_item(ItemId::new("x"), Quantity::ONE, &BranchId::new("branch-A"))
            .unwrap();
        assert!(store.load().unwrap().is_some());

        cart.clear();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_observers_see_mutations() {
        let cart = test_store();
        let observer = cart.subscribe();
        assert!(observer.borrow().is_empty());

        cart.add_item(ItemId::new("x"), Quantity::ONE, &BranchId::new("branch-A"))
            .unwrap();
        assert_eq!(observer.borrow().lines.len(), 1);
    }
}
