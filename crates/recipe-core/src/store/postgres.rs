// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL backend for recipe records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{RecipeStore, Window};
use crate::error::Result;
use crate::filter::Filter;
use crate::model::{LineItem, Recipe, RecipeId, RecipeInput};

const COLUMNS: &str = "id, namespace_id, inputs, outputs, crafting_level, crafting_job_id, \
                       masterbook, required_control, required_craftsmanship, stars, created_at";

/// Row shape of the `recipes` table.
#[derive(Debug, sqlx::FromRow)]
struct RecipeRow {
    id: i64,
    namespace_id: Option<String>,
    inputs: Json<Vec<LineItem>>,
    outputs: Json<Vec<LineItem>>,
    crafting_level: Option<i32>,
    crafting_job_id: Option<String>,
    masterbook: Option<i32>,
    required_control: Option<i32>,
    required_craftsmanship: Option<i32>,
    stars: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Recipe {
            id: row.id,
            namespace_id: row.namespace_id,
            inputs: row.inputs.0,
            outputs: row.outputs.0,
            crafting_level: row.crafting_level,
            crafting_job_id: row.crafting_job_id,
            masterbook: row.masterbook,
            required_control: row.required_control,
            required_craftsmanship: row.required_craftsmanship,
            stars: row.stars,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL-backed recipe store.
#[derive(Clone)]
pub struct PostgresRecipeStore {
    pool: PgPool,
}

impl PostgresRecipeStore {
    /// Create a store on top of an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl RecipeStore for PostgresRecipeStore {
    async fn count(&self, filter: &Filter) -> Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes");
        filter.push_where(&mut qb);

        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn list(&self, filter: &Filter, window: Window) -> Result<Vec<Recipe>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM recipes"));
        filter.push_where(&mut qb);
        qb.push(" ORDER BY id ASC");
        if let Some(limit) = window.limit {
            qb.push(" LIMIT ").push_bind(to_i64(limit));
        }
        if window.skip > 0 {
            qb.push(" OFFSET ").push_bind(to_i64(window.skip));
        }

        let rows = qb.build_query_as::<RecipeRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    async fn exists(&self, filter: &Filter) -> Result<bool> {
        // EXISTS stops at the first index hit on `id`
        let mut qb = QueryBuilder::<Postgres>::new("SELECT EXISTS (SELECT 1 FROM recipes");
        filter.push_where(&mut qb);
        qb.push(")");

        let exists = qb.build_query_scalar::<bool>().fetch_one(&self.pool).await?;
        Ok(exists)
    }

    async fn get(&self, id: RecipeId) -> Result<Option<Recipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {COLUMNS} FROM recipes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Recipe::from))
    }

    async fn insert(&self, input: &RecipeInput) -> Result<Recipe> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            INSERT INTO recipes (namespace_id, inputs, outputs, crafting_level, crafting_job_id,
                                 masterbook, required_control, required_craftsmanship, stars)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(input.namespace_id.as_deref())
        .bind(Json(&input.inputs))
        .bind(Json(&input.outputs))
        .bind(input.crafting_level)
        .bind(input.crafting_job_id.as_deref())
        .bind(input.masterbook)
        .bind(input.required_control)
        .bind(input.required_craftsmanship)
        .bind(input.stars)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(&self, id: RecipeId, input: &RecipeInput) -> Result<Option<Recipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            UPDATE recipes
            SET namespace_id = $2,
                inputs = $3,
                outputs = $4,
                crafting_level = $5,
                crafting_job_id = $6,
                masterbook = $7,
                required_control = $8,
                required_craftsmanship = $9,
                stars = $10
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.namespace_id.as_deref())
        .bind(Json(&input.inputs))
        .bind(Json(&input.outputs))
        .bind(input.crafting_level)
        .bind(input.crafting_job_id.as_deref())
        .bind(input.masterbook)
        .bind(input.required_control)
        .bind(input.required_craftsmanship)
        .bind(input.stars)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Recipe::from))
    }

    async fn delete(&self, id: RecipeId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
