//! Item detail endpoint.

use tracing::instrument;

use tamarind_core::ItemId;

use super::{ApiClient, ApiError, ItemDetail, RequestSpec};

impl ApiClient {
    /// Fetch authoritative details for a set of items in one request.
    ///
    /// The backend may omit ids it does not know; callers treat absent
    /// entries as unavailable rather than failing the whole batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload is malformed.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn fetch_items(&self, ids: &[ItemId]) -> Result<Vec<ItemDetail>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids
            .iter()
            .map(ItemId::as_str)
            .collect::<Vec<_>>()
            .join(",");

        self.fetch_json(&RequestSpec::get("items").query("ids", joined))
            .await
    }
}
