// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL store and pagination tests.
//!
//! Run with `TEST_RECIPE_DATABASE_URL=postgres://... cargo test -p recipe-core`.
//! Every test works inside its own random namespace so tests can share one
//! database.

use std::sync::Arc;

use recipe_core::store::PostgresRecipeStore;
use recipe_core::{
    Cursor, Filter, LineItem, PageArgs, PaginationEngine, Predicate, RecipeInput, RecipeStore,
    Window,
};
use sqlx::PgPool;
use uuid::Uuid;

macro_rules! skip_if_no_db {
    () => {
        if std::env::var("TEST_RECIPE_DATABASE_URL").is_err() {
            eprintln!("Skipping test: TEST_RECIPE_DATABASE_URL not set");
            return;
        }
    };
}

async fn get_test_pool() -> Option<PgPool> {
    let database_url = std::env::var("TEST_RECIPE_DATABASE_URL").ok()?;
    let pool = PgPool::connect(&database_url).await.ok()?;
    recipe_core::migrations::run_postgres(&pool).await.ok()?;
    Some(pool)
}

fn recipe(namespace: &str, input: &str, level: i32) -> RecipeInput {
    RecipeInput {
        namespace_id: Some(namespace.to_string()),
        inputs: vec![LineItem::new(input, 2)],
        outputs: vec![LineItem::new("product", 1)],
        crafting_level: Some(level),
        ..Default::default()
    }
}

async fn seed(store: &PostgresRecipeStore, namespace: &str, inputs: &[&str]) -> Vec<i64> {
    let mut ids = Vec::new();
    for (i, input) in inputs.iter().enumerate() {
        let created = store
            .insert(&recipe(namespace, input, i as i32))
            .await
            .expect("insert");
        ids.push(created.id);
    }
    ids
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_crud_round_trip() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: failed to connect");
        return;
    };
    let store = PostgresRecipeStore::new(pool);
    let namespace = Uuid::new_v4().to_string();

    let created = store.insert(&recipe(&namespace, "ore", 5)).await.unwrap();
    let fetched = store.get(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.inputs, vec![LineItem::new("ore", 2)]);
    assert_eq!(fetched.crafting_level, Some(5));

    let updated = store
        .update(created.id, &recipe(&namespace, "wood", 7))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.inputs[0].item_id, "wood");

    assert!(store.delete(created.id).await.unwrap());
    assert!(store.get(created.id).await.unwrap().is_none());
    assert!(!store.delete(created.id).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_filters_and_window() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: failed to connect");
        return;
    };
    let store = PostgresRecipeStore::new(pool);
    let namespace = Uuid::new_v4().to_string();
    let ids = seed(&store, &namespace, &["ore", "wood", "ore", "ore", "wood"]).await;

    let ore = Filter::new()
        .and(Predicate::Namespace(namespace.clone()))
        .and(Predicate::InputItem("ore".to_string()));

    assert_eq!(store.count(&ore).await.unwrap(), 3);

    let page = store
        .list(
            &ore,
            Window {
                skip: 1,
                limit: Some(5),
            },
        )
        .await
        .unwrap();
    let page_ids: Vec<_> = page.iter().map(|r| r.id).collect();
    assert_eq!(page_ids, vec![ids[2], ids[3]]);

    assert!(store.exists(&ore.with(Predicate::IdAfter(ids[2]))).await.unwrap());
    assert!(!store.exists(&ore.with(Predicate::IdAfter(ids[3]))).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_pagination_over_postgres() {
    skip_if_no_db!();
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: failed to connect");
        return;
    };
    let store = Arc::new(PostgresRecipeStore::new(pool));
    let namespace = Uuid::new_v4().to_string();
    let ids = seed(&store, &namespace, &["a", "b", "c", "d", "e", "f", "g"]).await;
    let engine = PaginationEngine::new(store);
    let filter = Filter::new().and(Predicate::Namespace(namespace));

    let first = engine.resolve(&filter, &PageArgs::first(3)).await.unwrap();
    assert_eq!(first.total, 7);
    assert_eq!(first.from, Some(Cursor::new(ids[0])));
    assert!(first.has_next_page);
    assert!(!first.has_previous_page);

    let next = engine
        .resolve(&filter, &PageArgs::first(3).after(first.to.unwrap()))
        .await
        .unwrap();
    assert_eq!(next.from, Some(Cursor::new(ids[3])));
    assert!(next.has_previous_page);

    let last = engine.resolve(&filter, &PageArgs::last(2)).await.unwrap();
    let last_ids: Vec<_> = last.items.iter().map(|r| r.id).collect();
    assert_eq!(last_ids, vec![ids[5], ids[6]]);
    assert!(!last.has_next_page);
    assert!(!last.is_degraded());
}
