// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Record filters.
//!
//! A [`Filter`] is a conjunction of [`Predicate`]s. Filters are plain values:
//! deriving a narrower filter with [`Filter::with`] leaves the original
//! untouched, so one caller-supplied filter can be handed to the count, the
//! window fetch and both boundary probes without any of them seeing the
//! others' additions.

use serde_json::json;
use sqlx::{Postgres, QueryBuilder};

use crate::model::{Recipe, RecipeId};

/// A single condition on a recipe record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Identifier strictly less than the value.
    IdBefore(RecipeId),
    /// Identifier strictly greater than the value.
    IdAfter(RecipeId),
    /// Record belongs to the namespace.
    Namespace(String),
    /// Some input line references the item.
    InputItem(String),
    /// Some output line references the item.
    OutputItem(String),
    /// Crafted by the job.
    CraftingJob(String),
    /// Crafting level at least the value.
    MinCraftingLevel(i32),
    /// Crafting level at most the value.
    MaxCraftingLevel(i32),
}

impl Predicate {
    fn matches(&self, recipe: &Recipe) -> bool {
        match self {
            Self::IdBefore(id) => recipe.id < *id,
            Self::IdAfter(id) => recipe.id > *id,
            Self::Namespace(ns) => recipe.namespace_id.as_deref() == Some(ns.as_str()),
            Self::InputItem(item) => recipe.inputs.iter().any(|line| &line.item_id == item),
            Self::OutputItem(item) => recipe.outputs.iter().any(|line| &line.item_id == item),
            Self::CraftingJob(job) => recipe.crafting_job_id.as_deref() == Some(job.as_str()),
            Self::MinCraftingLevel(level) => recipe.crafting_level.is_some_and(|l| l >= *level),
            Self::MaxCraftingLevel(level) => recipe.crafting_level.is_some_and(|l| l <= *level),
        }
    }

    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Self::IdBefore(id) => {
                qb.push("id < ").push_bind(*id);
            }
            Self::IdAfter(id) => {
                qb.push("id > ").push_bind(*id);
            }
            Self::Namespace(ns) => {
                qb.push("namespace_id = ").push_bind(ns.clone());
            }
            Self::InputItem(item) => {
                qb.push("inputs @> ")
                    .push_bind(json!([{ "itemId": item }]));
            }
            Self::OutputItem(item) => {
                qb.push("outputs @> ")
                    .push_bind(json!([{ "itemId": item }]));
            }
            Self::CraftingJob(job) => {
                qb.push("crafting_job_id = ").push_bind(job.clone());
            }
            Self::MinCraftingLevel(level) => {
                qb.push("crafting_level >= ").push_bind(*level);
            }
            Self::MaxCraftingLevel(level) => {
                qb.push("crafting_level <= ").push_bind(*level);
            }
        }
    }
}

/// Conjunction of predicates. The empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    /// Create a filter that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate (builder style).
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Derive a new filter with one more predicate, leaving `self` unchanged.
    pub fn with(&self, predicate: Predicate) -> Self {
        self.clone().and(predicate)
    }

    /// The predicates in insertion order.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether the filter has no predicates.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Evaluate the filter against a record in memory.
    pub fn matches(&self, recipe: &Recipe) -> bool {
        self.predicates.iter().all(|p| p.matches(recipe))
    }

    /// Append a `WHERE` clause for this filter to a query under construction.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if self.predicates.is_empty() {
            return;
        }
        qb.push(" WHERE ");
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            predicate.push_sql(qb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LineItem, RecipeInput};
    use chrono::Utc;

    fn recipe(id: RecipeId, input: &str, level: i32) -> Recipe {
        RecipeInput {
            namespace_id: Some("ns".to_string()),
            inputs: vec![LineItem::new(input, 1)],
            outputs: vec![LineItem::new("product", 1)],
            crafting_level: Some(level),
            ..Default::default()
        }
        .into_recipe(id, Utc::now())
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::new().matches(&recipe(1, "ore", 1)));
    }

    #[test]
    fn test_with_does_not_alias_the_original() {
        let base = Filter::new().and(Predicate::Namespace("ns".to_string()));
        let narrowed = base.with(Predicate::IdAfter(5));

        assert_eq!(base.predicates().len(), 1);
        assert_eq!(narrowed.predicates().len(), 2);
        assert!(base.matches(&recipe(3, "ore", 1)));
        assert!(!narrowed.matches(&recipe(3, "ore", 1)));
    }

    #[test]
    fn test_predicates_are_conjunctive() {
        let filter = Filter::new()
            .and(Predicate::InputItem("ore".to_string()))
            .and(Predicate::MinCraftingLevel(10))
            .and(Predicate::MaxCraftingLevel(20));

        assert!(filter.matches(&recipe(1, "ore", 15)));
        assert!(!filter.matches(&recipe(2, "ore", 25)));
        assert!(!filter.matches(&recipe(3, "wood", 15)));
    }

    #[test]
    fn test_id_bounds_are_strict() {
        let r = recipe(10, "ore", 1);
        assert!(!Filter::new().and(Predicate::IdBefore(10)).matches(&r));
        assert!(!Filter::new().and(Predicate::IdAfter(10)).matches(&r));
        assert!(Filter::new().and(Predicate::IdAfter(9)).matches(&r));
    }

    #[test]
    fn test_push_where_renders_conjunction() {
        let filter = Filter::new()
            .and(Predicate::Namespace("ns".to_string()))
            .and(Predicate::IdBefore(4));
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes");
        filter.push_where(&mut qb);

        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM recipes WHERE namespace_id = $1 AND id < $2"
        );
    }

    #[test]
    fn test_push_where_omits_clause_for_empty_filter() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM recipes");
        Filter::new().push_where(&mut qb);

        assert_eq!(qb.sql(), "SELECT 1 FROM recipes");
    }
}
