// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory recipe store for testing and local development.
//!
//! Records live in a `BTreeMap` keyed by identifier, so scans come out in
//! identifier order like the indexed PostgreSQL scan. Individual operations
//! can be told to fail or to stall, which is how the pagination tests drive
//! the degraded paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{RecipeStore, Window};
use crate::error::{Result, StoreError};
use crate::filter::Filter;
use crate::model::{Recipe, RecipeId, RecipeInput};

#[derive(Debug, Default)]
struct State {
    next_id: RecipeId,
    records: BTreeMap<RecipeId, Recipe>,
}

/// In-memory recipe store.
#[derive(Debug, Default)]
pub struct MemoryRecipeStore {
    state: RwLock<State>,
    fail_count: AtomicBool,
    fail_list: AtomicBool,
    fail_exists: AtomicBool,
    latency_ms: AtomicUsize,
    count_calls: AtomicUsize,
    list_calls: AtomicUsize,
    exists_calls: AtomicUsize,
}

impl MemoryRecipeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given records, in order.
    pub async fn seeded(inputs: impl IntoIterator<Item = RecipeInput>) -> Self {
        let store = Self::new();
        for input in inputs {
            // Infallible: no faults are armed yet.
            let _ = store.insert(&input).await;
        }
        store
    }

    /// Make `count` fail until reset.
    pub fn fail_count(&self, fail: bool) {
        self.fail_count.store(fail, Ordering::SeqCst);
    }

    /// Make `list` fail until reset.
    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Make `exists` fail until reset.
    pub fn fail_exists(&self, fail: bool) {
        self.fail_exists.store(fail, Ordering::SeqCst);
    }

    /// Delay every read by the given duration.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as usize, Ordering::SeqCst);
    }

    /// Number of `count` calls served so far.
    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    /// Number of `list` calls served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `exists` calls served so far.
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    async fn read_gate(&self, operation: &'static str, fail: &AtomicBool) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency as u64)).await;
        }
        if fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "injected {operation} failure"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn count(&self, filter: &Filter) -> Result<u64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.read_gate("count", &self.fail_count).await?;

        let state = self.state.read().await;
        Ok(state.records.values().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn list(&self, filter: &Filter, window: Window) -> Result<Vec<Recipe>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.read_gate("list", &self.fail_list).await?;

        let state = self.state.read().await;
        let matching = state
            .records
            .values()
            .filter(|r| filter.matches(r))
            .skip(usize::try_from(window.skip).unwrap_or(usize::MAX));
        let records = match window.limit {
            Some(limit) => matching
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .cloned()
                .collect(),
            None => matching.cloned().collect(),
        };
        Ok(records)
    }

    async fn exists(&self, filter: &Filter) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.read_gate("exists", &self.fail_exists).await?;

        let state = self.state.read().await;
        Ok(state.records.values().any(|r| filter.matches(r)))
    }

    async fn get(&self, id: RecipeId) -> Result<Option<Recipe>> {
        let state = self.state.read().await;
        Ok(state.records.get(&id).cloned())
    }

    async fn insert(&self, input: &RecipeInput) -> Result<Recipe> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let recipe = input.clone().into_recipe(state.next_id, Utc::now());
        state.records.insert(recipe.id, recipe.clone());
        Ok(recipe)
    }

    async fn update(&self, id: RecipeId, input: &RecipeInput) -> Result<Option<Recipe>> {
        let mut state = self.state.write().await;
        let Some(existing) = state.records.get_mut(&id) else {
            return Ok(None);
        };
        *existing = input.clone().into_recipe(id, existing.created_at);
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, id: RecipeId) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.records.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Predicate;
    use crate::model::LineItem;

    fn input(item: &str) -> RecipeInput {
        RecipeInput {
            inputs: vec![LineItem::new(item, 1)],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemoryRecipeStore::new();
        let a = store.insert(&input("a")).await.unwrap();
        let b = store.insert(&input("b")).await.unwrap();

        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = MemoryRecipeStore::new();
        let a = store.insert(&input("a")).await.unwrap();
        assert!(store.delete(a.id).await.unwrap());
        let b = store.insert(&input("b")).await.unwrap();

        assert!(b.id > a.id);
        assert!(!store.delete(a.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_applies_filter_then_window() {
        let store =
            MemoryRecipeStore::seeded(["a", "b", "a", "a", "b"].into_iter().map(input)).await;
        let filter = Filter::new().and(Predicate::InputItem("a".to_string()));

        let page = store
            .list(
                &filter,
                Window {
                    skip: 1,
                    limit: Some(1),
                },
            )
            .await
            .unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, 3);
        assert_eq!(store.count(&filter).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_created_at() {
        let store = MemoryRecipeStore::new();
        let original = store.insert(&input("a")).await.unwrap();

        let updated = store
            .update(original.id, &input("z"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.inputs[0].item_id, "z");
        assert!(store.update(999, &input("z")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryRecipeStore::seeded([input("a")]).await;
        store.fail_exists(true);

        assert!(store.exists(&Filter::new()).await.is_err());
        assert!(store.count(&Filter::new()).await.is_ok());

        store.fail_exists(false);
        assert!(store.exists(&Filter::new()).await.unwrap());
        assert_eq!(store.exists_calls(), 2);
    }
}
