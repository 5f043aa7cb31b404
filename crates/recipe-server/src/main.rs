// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Recipe Server
//!
//! Serves recipe records over HTTP, announces itself to the schema gateway
//! and imports recipes from the foreign recipe system on request.

use std::sync::Arc;
use tracing::{info, warn};

use recipe_core::store::PostgresRecipeStore;
use recipe_server::bus::RedisBus;
use recipe_server::catalog::GatewayCatalogClient;
use recipe_server::config::Config;
use recipe_server::foreign::RcHttpSource;
use recipe_server::runtime::RecipeRuntime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_server=info,recipe_core=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        http_addr = %config.http_addr,
        service = %config.service_name,
        gateway = %config.gateway_url,
        "Starting Recipe Server"
    );

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    info!("Connected to database");

    recipe_core::migrations::run_postgres(&pool).await?;

    info!("Database migrations applied");

    let bus = Arc::new(RedisBus::connect(&config.redis_url).await?);
    info!("Connected to event bus");

    let catalog = Arc::new(GatewayCatalogClient::new(
        config.gateway_url.clone(),
        config.gateway_token.clone(),
        config.query_timeout,
    )?);
    let foreign = Arc::new(RcHttpSource::new(
        config.rc_base_url.clone(),
        config.query_timeout,
    )?);

    let runtime = RecipeRuntime::builder()
        .config(&config)
        .store(Arc::new(PostgresRecipeStore::new(pool)))
        .bus(bus)
        .catalog(catalog)
        .foreign(foreign)
        .authorizer(Arc::new(config.grants.clone()))
        .build()?
        .start()
        .await?;

    info!(addr = %runtime.bind_addr(), "Recipe server ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    runtime.shutdown().await?;

    info!("Recipe Server shut down");

    Ok(())
}
