// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP API.
//!
//! | Method | Path                | Response                         |
//! |--------|---------------------|----------------------------------|
//! | GET    | `/health`           | `{ "status": "ok" }`             |
//! | GET    | `/recipes`          | connection (page + metadata)     |
//! | GET    | `/recipes/{id}`     | recipe                           |
//! | POST   | `/recipes`          | 201 + created recipe             |
//! | PUT    | `/recipes/{id}`     | replaced recipe                  |
//! | DELETE | `/recipes/{id}`     | 204                              |
//! | POST   | `/imports/rc`       | 202 + `{ "runId": ... }`         |
//! | GET    | `/imports/{run_id}` | run status                       |
//!
//! The caller of an import is taken from the `x-principal` header; requests
//! without it run as the anonymous principal.
//!
//! The header is trusted as-is. This server must sit behind an
//! authenticating proxy (the schema gateway) that sets `x-principal` from
//! the verified caller and drops any value the client sent. Exposed
//! directly, any client can claim any principal.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use recipe_core::{Connection, Filter, PageArgs, Predicate, Recipe, RecipeId, RecipeInput};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::import::{ImportPipeline, RunStatus};
use crate::permission::Principal;
use crate::service::RecipeService;

/// Header carrying the calling principal.
pub const PRINCIPAL_HEADER: &str = "x-principal";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Recipe operations.
    pub recipes: Arc<RecipeService>,
    /// Import runs.
    pub imports: Arc<ImportPipeline>,
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/imports/rc", post(start_rc_import))
        .route("/imports/{run_id}", get(import_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// List query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    first: Option<i64>,
    last: Option<i64>,
    before: Option<String>,
    after: Option<String>,
    namespace_id: Option<String>,
    input_item: Option<String>,
    output_item: Option<String>,
    crafting_job_id: Option<String>,
    min_crafting_level: Option<i32>,
    max_crafting_level: Option<i32>,
}

impl ListParams {
    fn page_args(&self) -> std::result::Result<PageArgs, recipe_core::ValidationError> {
        PageArgs::parse(
            self.first,
            self.last,
            self.before.as_deref(),
            self.after.as_deref(),
        )
    }

    fn filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(ns) = &self.namespace_id {
            filter = filter.and(Predicate::Namespace(ns.clone()));
        }
        if let Some(item) = &self.input_item {
            filter = filter.and(Predicate::InputItem(item.clone()));
        }
        if let Some(item) = &self.output_item {
            filter = filter.and(Predicate::OutputItem(item.clone()));
        }
        if let Some(job) = &self.crafting_job_id {
            filter = filter.and(Predicate::CraftingJob(job.clone()));
        }
        if let Some(level) = self.min_crafting_level {
            filter = filter.and(Predicate::MinCraftingLevel(level));
        }
        if let Some(level) = self.max_crafting_level {
            filter = filter.and(Predicate::MaxCraftingLevel(level));
        }
        filter
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_recipes(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Connection<Recipe>>> {
    let args = params.page_args()?;
    let connection = state.recipes.list(&params.filter(), &args).await?;
    Ok(Json(connection))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
) -> Result<Json<Recipe>> {
    Ok(Json(state.recipes.get(id).await?))
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(input): Json<RecipeInput>,
) -> Result<impl IntoResponse> {
    let recipe = state.recipes.create(input).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
    Json(input): Json<RecipeInput>,
) -> Result<Json<Recipe>> {
    Ok(Json(state.recipes.update(id, input).await?))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
) -> Result<StatusCode> {
    state.recipes.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start_rc_import(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let principal = headers
        .get(PRINCIPAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(Principal::anonymous, Principal::new);

    let handle = state.imports.start(&principal).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "runId": handle.run_id() })),
    ))
}

async fn import_status(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<RunStatus>> {
    state
        .imports
        .registry()
        .get(run_id)
        .await
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("import run {run_id}")))
}
