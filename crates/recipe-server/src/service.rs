// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Recipe reads and writes.
//!
//! Writes publish `recipe.created` / `recipe.updated` / `recipe.deleted`
//! after the store accepted them. A failed publish is logged and the write
//! still counts as done.

use std::sync::Arc;

use recipe_core::{
    Connection, Filter, PageArgs, PaginationEngine, Recipe, RecipeId, RecipeInput, RecipeStore,
};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::bus::{EventBus, emit_json, topics};
use crate::error::{Error, Result};

/// Recipe operations used by the HTTP API.
pub struct RecipeService {
    store: Arc<dyn RecipeStore>,
    engine: PaginationEngine,
    bus: Arc<dyn EventBus>,
}

impl RecipeService {
    /// Create the service.
    pub fn new(
        store: Arc<dyn RecipeStore>,
        engine: PaginationEngine,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self { store, engine, bus }
    }

    /// One page of recipes.
    pub async fn list(&self, filter: &Filter, args: &PageArgs) -> Result<Connection<Recipe>> {
        Ok(self.engine.resolve(filter, args).await?)
    }

    /// One recipe by identifier.
    pub async fn get(&self, id: RecipeId) -> Result<Recipe> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("recipe {id}")))
    }

    /// Store a new recipe.
    pub async fn create(&self, input: RecipeInput) -> Result<Recipe> {
        input.validate()?;
        let recipe = self.store.insert(&input).await?;
        self.publish(topics::RECIPE_CREATED, &recipe).await;
        Ok(recipe)
    }

    /// Replace a recipe.
    pub async fn update(&self, id: RecipeId, input: RecipeInput) -> Result<Recipe> {
        input.validate()?;
        let recipe = self
            .store
            .update(id, &input)
            .await?
            .ok_or_else(|| Error::NotFound(format!("recipe {id}")))?;
        self.publish(topics::RECIPE_UPDATED, &recipe).await;
        Ok(recipe)
    }

    /// Delete a recipe.
    pub async fn delete(&self, id: RecipeId) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(Error::NotFound(format!("recipe {id}")));
        }
        self.publish(topics::RECIPE_DELETED, &json!({ "id": id })).await;
        Ok(())
    }

    async fn publish<T: Serialize + Sync>(&self, topic: &str, payload: &T) {
        if let Err(e) = emit_json(self.bus.as_ref(), topic, payload).await {
            warn!(topic, error = %e, "Publishing recipe event failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;
    use recipe_core::LineItem;
    use recipe_core::store::MemoryRecipeStore;

    fn service() -> (RecipeService, Arc<MemoryBus>) {
        let store = Arc::new(MemoryRecipeStore::new());
        let bus = Arc::new(MemoryBus::new());
        let engine = PaginationEngine::new(store.clone());
        (RecipeService::new(store, engine, bus.clone()), bus)
    }

    fn input(item: &str) -> RecipeInput {
        RecipeInput {
            inputs: vec![LineItem::new(item, 1)],
            outputs: vec![LineItem::new("product", 1)],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_writes_publish_events() {
        let (service, bus) = service();

        let created = service.create(input("ore")).await.unwrap();
        service.update(created.id, input("wood")).await.unwrap();
        service.delete(created.id).await.unwrap();

        let seen: Vec<_> = bus.events().await.into_iter().map(|e| e.topic).collect();
        assert_eq!(
            seen,
            vec![topics::RECIPE_CREATED, topics::RECIPE_UPDATED, topics::RECIPE_DELETED]
        );
        let deleted = &bus.events_on(topics::RECIPE_DELETED).await[0];
        assert_eq!(deleted.json().unwrap()["id"], created.id);
    }

    #[tokio::test]
    async fn test_bus_failure_does_not_fail_write() {
        let (service, bus) = service();
        bus.fail_emit(true);

        let created = service.create(input("ore")).await.unwrap();

        assert_eq!(service.get(created.id).await.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let (service, bus) = service();

        assert!(matches!(service.get(9).await, Err(Error::NotFound(_))));
        assert!(matches!(service.update(9, input("x")).await, Err(Error::NotFound(_))));
        assert!(matches!(service.delete(9).await, Err(Error::NotFound(_))));
        assert!(bus.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected_before_store() {
        let (service, _bus) = service();

        let err = service.create(input(" ")).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(
            service
                .list(&Filter::new(), &PageArgs::default())
                .await
                .unwrap()
                .total,
            0
        );
    }
}
