// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Foreign item identifier → catalog item identifier translation.
//!
//! A miss costs two remote calls: the foreign system is asked for the
//! item's name, then the catalog is asked for the item with that name in
//! the target namespace. Only successful resolutions are cached, so a failed
//! lookup is retried next time.
//!
//! Entries live for the life of the process. If an item is renamed on
//! either side the cached mapping goes stale; nothing invalidates it.
//!
//! The cache is keyed by foreign identifier alone, matching how imports
//! always target a single namespace. Two concurrent misses on the same key
//! both resolve remotely and the later insert wins with the same value.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::catalog::{CatalogClient, CatalogError};
use crate::foreign::{ForeignError, ForeignSource};

/// Resolution errors.
#[derive(Debug, Error)]
pub enum IdentifierError {
    /// The foreign system could not name the item.
    #[error("Foreign item lookup failed: {0}")]
    Foreign(#[from] ForeignError),

    /// The catalog could not match the name.
    #[error("Catalog item lookup failed: {0}")]
    Catalog(#[from] CatalogError),
}

/// Memoizing foreign → local item identifier resolver.
pub struct IdentifierCache {
    foreign: Arc<dyn ForeignSource>,
    catalog: Arc<dyn CatalogClient>,
    entries: RwLock<HashMap<String, String>>,
}

impl IdentifierCache {
    /// Create an empty cache over the two remote collaborators.
    pub fn new(foreign: Arc<dyn ForeignSource>, catalog: Arc<dyn CatalogClient>) -> Self {
        Self {
            foreign,
            catalog,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Local identifier for `foreign_id`, resolving remotely on a miss.
    pub async fn resolve(
        &self,
        foreign_id: &str,
        namespace_id: &str,
    ) -> Result<String, IdentifierError> {
        if let Some(local) = self.entries.read().await.get(foreign_id) {
            return Ok(local.clone());
        }

        let name = self.foreign.fetch_item_name(foreign_id).await?;
        let local = self.catalog.find_item(&name, namespace_id).await?;

        debug!(foreign_id, name = %name, local_id = %local, "Resolved foreign item");
        self.entries
            .write()
            .await
            .insert(foreign_id.to_string(), local.clone());
        Ok(local)
    }

    /// Cached identifier, without remote I/O.
    pub async fn get(&self, foreign_id: &str) -> Option<String> {
        self.entries.read().await.get(foreign_id).cloned()
    }

    /// Number of cached mappings.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing has been cached yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCatalog, MockForeignSource};

    fn fixtures() -> (Arc<MockForeignSource>, Arc<MockCatalog>) {
        let foreign = Arc::new(
            MockForeignSource::new()
                .with_item("rc-1", "Iron Ore")
                .with_item("rc-2", "Copper Ore")
                .failing_item("rc-bad"),
        );
        let catalog = Arc::new(
            MockCatalog::new()
                .with_item("ns", "Iron Ore", "item-iron")
                .with_item("ns", "Copper Ore", "item-copper"),
        );
        (foreign, catalog)
    }

    #[tokio::test]
    async fn test_second_resolve_is_served_from_cache() {
        let (foreign, catalog) = fixtures();
        let cache = IdentifierCache::new(foreign.clone(), catalog.clone());

        let first = cache.resolve("rc-1", "ns").await.unwrap();
        let second = cache.resolve("rc-1", "ns").await.unwrap();

        assert_eq!(first, "item-iron");
        assert_eq!(second, first);
        assert_eq!(foreign.item_calls(), 1);
        assert_eq!(catalog.item_calls(), 1);
    }

    #[tokio::test]
    async fn test_distinct_ids_resolve_independently() {
        let (foreign, catalog) = fixtures();
        let cache = IdentifierCache::new(foreign.clone(), catalog);

        assert_eq!(cache.resolve("rc-1", "ns").await.unwrap(), "item-iron");
        assert_eq!(cache.resolve("rc-2", "ns").await.unwrap(), "item-copper");
        assert_eq!(cache.len().await, 2);
        assert_eq!(foreign.item_calls(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let (foreign, catalog) = fixtures();
        let cache = IdentifierCache::new(foreign.clone(), catalog.clone());

        let err = cache.resolve("rc-bad", "ns").await.unwrap_err();
        assert!(matches!(err, IdentifierError::Foreign(_)));
        assert!(cache.resolve("rc-bad", "ns").await.is_err());
        assert_eq!(foreign.item_calls(), 2);
        assert_eq!(catalog.item_calls(), 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_catalog_name_is_an_error() {
        let (foreign, catalog) = fixtures();
        let cache = IdentifierCache::new(foreign, catalog);

        let err = cache.resolve("rc-1", "other-ns").await.unwrap_err();

        assert!(matches!(err, IdentifierError::Catalog(_)));
        assert!(cache.get("rc-1").await.is_none());
    }
}
