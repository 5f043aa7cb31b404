// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage interface and backends for recipe records.
//!
//! The pagination engine and the CRUD service only ever talk to
//! [`RecipeStore`]; the PostgreSQL backend is used in production and the
//! in-memory backend in tests and local development.

pub mod memory;
pub mod postgres;

pub use self::memory::MemoryRecipeStore;
pub use self::postgres::PostgresRecipeStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::Filter;
use crate::model::{Recipe, RecipeId, RecipeInput};

/// Offset/limit window applied to an identifier-ordered scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    /// Matching records to skip.
    pub skip: u64,
    /// Maximum records to return; `None` is unbounded.
    pub limit: Option<u64>,
}

/// Persistence interface for recipe records.
///
/// Every read takes a [`Filter`] by reference; implementations must not rely
/// on filters being distinct objects between calls.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Count records matching the filter.
    async fn count(&self, filter: &Filter) -> Result<u64>;

    /// Fetch matching records in ascending identifier order.
    async fn list(&self, filter: &Filter, window: Window) -> Result<Vec<Recipe>>;

    /// Whether at least one record matches the filter.
    ///
    /// Implementations must answer without materializing the matching set.
    async fn exists(&self, filter: &Filter) -> Result<bool>;

    /// Fetch one record by identifier.
    async fn get(&self, id: RecipeId) -> Result<Option<Recipe>>;

    /// Insert a record and return it with its assigned identifier.
    async fn insert(&self, input: &RecipeInput) -> Result<Recipe>;

    /// Replace the writable fields of a record. Returns `None` if it does not exist.
    async fn update(&self, id: RecipeId, input: &RecipeInput) -> Result<Option<Recipe>>;

    /// Delete a record. Returns whether a record was removed.
    async fn delete(&self, id: RecipeId) -> Result<bool>;
}
