// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Existence checks on either side of a cursor.
//!
//! These run on every page resolution, so they go through
//! [`RecipeStore::exists`] (an indexed `EXISTS` on the primary key) rather
//! than counting or fetching rows.

use std::sync::Arc;

use crate::error::Result;
use crate::filter::{Filter, Predicate};
use crate::model::RecipeId;
use crate::store::RecipeStore;

/// Answers "is there a matching record before/after this identifier?".
#[derive(Clone)]
pub struct BoundaryProbe {
    store: Arc<dyn RecipeStore>,
}

impl BoundaryProbe {
    /// Create a probe over a store.
    pub fn new(store: Arc<dyn RecipeStore>) -> Self {
        Self { store }
    }

    /// Whether a record matching `filter` has an identifier strictly below `id`.
    pub async fn exists_before(&self, filter: &Filter, id: RecipeId) -> Result<bool> {
        self.store
            .exists(&filter.with(Predicate::IdBefore(id)))
            .await
    }

    /// Whether a record matching `filter` has an identifier strictly above `id`.
    pub async fn exists_after(&self, filter: &Filter, id: RecipeId) -> Result<bool> {
        self.store
            .exists(&filter.with(Predicate::IdAfter(id)))
            .await
    }
}
