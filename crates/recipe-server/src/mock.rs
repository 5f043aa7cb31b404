// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock collaborators for testing.
//!
//! Stand-ins for the catalog gateway and the foreign system that answer
//! from fixed tables and count every call, so tests can assert how much
//! remote I/O an operation performed.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::{CatalogClient, CatalogError};
use crate::foreign::{ForeignError, ForeignSource};
use crate::permission::{Authorizer, Principal};

/// Mock catalog.
#[derive(Debug, Default)]
pub struct MockCatalog {
    namespaces: HashMap<String, String>,
    items: HashMap<(String, String), String>,
    namespace_calls: AtomicUsize,
    item_calls: AtomicUsize,
}

impl MockCatalog {
    /// Create an empty catalog; every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace.
    pub fn with_namespace(mut self, name: &str, id: &str) -> Self {
        self.namespaces.insert(name.to_string(), id.to_string());
        self
    }

    /// Register an item inside a namespace.
    pub fn with_item(mut self, namespace_id: &str, name: &str, id: &str) -> Self {
        self.items
            .insert((namespace_id.to_string(), name.to_string()), id.to_string());
        self
    }

    /// Number of namespace lookups served.
    pub fn namespace_calls(&self) -> usize {
        self.namespace_calls.load(Ordering::SeqCst)
    }

    /// Number of item lookups served.
    pub fn item_calls(&self) -> usize {
        self.item_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    async fn namespace_by_name(&self, name: &str) -> Result<String, CatalogError> {
        self.namespace_calls.fetch_add(1, Ordering::SeqCst);
        self.namespaces
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound {
                kind: "Namespace",
                name: name.to_string(),
            })
    }

    async fn find_item(&self, name: &str, namespace_id: &str) -> Result<String, CatalogError> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        self.items
            .get(&(namespace_id.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| CatalogError::NotFound {
                kind: "Item",
                name: name.to_string(),
            })
    }
}

/// Mock foreign system.
#[derive(Debug, Default)]
pub struct MockForeignSource {
    recipes: Vec<Value>,
    item_names: HashMap<String, String>,
    failing_items: HashSet<String>,
    fail_fetch: AtomicBool,
    item_delay: Duration,
    fetch_calls: AtomicUsize,
    item_calls: AtomicUsize,
}

impl MockForeignSource {
    /// Create a source with no recipes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records returned by `fetch_recipes`.
    pub fn with_recipes(mut self, recipes: Vec<Value>) -> Self {
        self.recipes = recipes;
        self
    }

    /// Register a foreign item and its name.
    pub fn with_item(mut self, foreign_id: &str, name: &str) -> Self {
        self.item_names
            .insert(foreign_id.to_string(), name.to_string());
        self
    }

    /// Make lookups of one foreign item fail with HTTP 500.
    pub fn failing_item(mut self, foreign_id: &str) -> Self {
        self.failing_items.insert(foreign_id.to_string());
        self
    }

    /// Delay every item lookup.
    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    /// Make `fetch_recipes` fail until reset.
    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Number of bulk fetches served.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of item lookups served.
    pub fn item_calls(&self) -> usize {
        self.item_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ForeignSource for MockForeignSource {
    async fn fetch_recipes(&self) -> Result<Vec<Value>, ForeignError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ForeignError::Status {
                url: "mock://recipe".to_string(),
                status: 502,
            });
        }
        Ok(self.recipes.clone())
    }

    async fn fetch_item_name(&self, foreign_id: &str) -> Result<String, ForeignError> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        if !self.item_delay.is_zero() {
            tokio::time::sleep(self.item_delay).await;
        }
        if self.failing_items.contains(foreign_id) {
            return Err(ForeignError::Status {
                url: format!("mock://item/{foreign_id}"),
                status: 500,
            });
        }
        self.item_names
            .get(foreign_id)
            .cloned()
            .ok_or_else(|| ForeignError::Status {
                url: format!("mock://item/{foreign_id}"),
                status: 404,
            })
    }
}

/// Authorizer with a fixed answer.
#[derive(Debug)]
pub struct StaticAuthorizer {
    allow: bool,
    checks: AtomicUsize,
}

impl StaticAuthorizer {
    /// Allow everything.
    pub fn allow_all() -> Self {
        Self {
            allow: true,
            checks: AtomicUsize::new(0),
        }
    }

    /// Deny everything.
    pub fn deny_all() -> Self {
        Self {
            allow: false,
            checks: AtomicUsize::new(0),
        }
    }

    /// Number of checks performed.
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl Authorizer for StaticAuthorizer {
    fn is_allowed(&self, _principal: &Principal, _capability: &str) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.allow
    }
}
