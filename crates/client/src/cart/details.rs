//! Authoritative item detail cache.
//!
//! Maps item IDs to their last-fetched backend detail. Misses are
//! resolved with one batched request, never one request per item, and
//! cached with a TTL so repeated cart renders do not hammer the backend.

use std::collections::HashMap;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use tamarind_core::ItemId;

use crate::api::{ApiClient, ApiError, ItemDetail};

/// How long a fetched detail stays fresh.
const DETAIL_TTL: Duration = Duration::from_secs(300); // 5 minutes

/// Upper bound on cached details.
const DETAIL_CAPACITY: u64 = 1000;

/// Cache of authoritative item details.
///
/// Cheaply cloneable; clones share the underlying cache.
#[derive(Clone)]
pub struct ItemDetailCache {
    api: ApiClient,
    cache: Cache<ItemId, ItemDetail>,
}

impl ItemDetailCache {
    /// Create a new detail cache over the given API client.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(DETAIL_CAPACITY)
            .time_to_live(DETAIL_TTL)
            .build();

        Self { api, cache }
    }

    /// Get details for the given items, fetching misses in one batch.
    ///
    /// Input ids are de-duplicated. Ids the backend does not know are
    /// simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the batched fetch fails; cached entries are
    /// unaffected.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn get_many(
        &self,
        ids: &[ItemId],
    ) -> Result<HashMap<ItemId, ItemDetail>, ApiError> {
        let mut found = HashMap::new();
        let mut missing: Vec<ItemId> = Vec::new();

        for id in ids {
            if found.contains_key(id) || missing.contains(id) {
                continue;
            }
            match self.cache.get(id).await {
                Some(detail) => {
                    found.insert(id.clone(), detail);
                }
                None => missing.push(id.clone()),
            }
        }

        if missing.is_empty() {
            debug!("all item details served from cache");
            return Ok(found);
        }

        let fetched = self.api.fetch_items(&missing).await?;
        for detail in fetched {
            self.cache.insert(detail.id.clone(), detail.clone()).await;
            found.insert(detail.id.clone(), detail);
        }

        Ok(found)
    }

    /// Drop all cached details, forcing fresh fetches.
    ///
    /// Used when the client learns that a merchant updated their menu.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use url::Url;

    use crate::session::TokenManager;

    use super::*;

    fn test_cache() -> ItemDetailCache {
        let base_url: Url = "https://api.tamarind.test/".parse().unwrap();
        let tokens = TokenManager::new(reqwest::Client::new(), &base_url).unwrap();
        ItemDetailCache::new(ApiClient::new(reqwest::Client::new(), base_url, tokens))
    }

    fn detail(id: &str) -> ItemDetail {
        ItemDetail {
            id: ItemId::new(id),
            name: id.to_uppercase(),
            price: Decimal::ONE,
            image: None,
            description: None,
            available: true,
        }
    }

    #[tokio::test]
    async fn test_cached_entries_skip_the_backend() {
        let cache = test_cache();
        cache.cache.insert(ItemId::new("x"), detail("x")).await;

        // "x" is cached, so no request is issued at all
        let found = cache.get_many(&[ItemId::new("x")]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&ItemId::new("x")));
    }

    #[tokio::test]
    async fn test_empty_input_is_a_no_op() {
        let cache = test_cache();
        let found = cache.get_many(&[]).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_all_drops_entries() {
        let cache = test_cache();
        cache.cache.insert(ItemId::new("x"), detail("x")).await;
        assert!(cache.cache.get(&ItemId::new("x")).await.is_some());

        cache.invalidate_all().await;
        assert!(cache.cache.get(&ItemId::new("x")).await.is_none());
    }
}
