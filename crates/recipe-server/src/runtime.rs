// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for recipe-server.
//!
//! [`RecipeRuntime`] wires the store, bus, catalog and foreign source into
//! the HTTP API, the service announcer and the import event consumer.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use recipe_core::store::PostgresRecipeStore;
//! use recipe_server::bus::RedisBus;
//! use recipe_server::runtime::RecipeRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = sqlx::PgPool::connect("postgres://...").await?;
//!
//!     let runtime = RecipeRuntime::builder()
//!         .store(Arc::new(PostgresRecipeStore::new(pool)))
//!         .bus(Arc::new(RedisBus::connect("redis://127.0.0.1").await?))
//!         .catalog(catalog)
//!         .foreign(foreign)
//!         .authorizer(authorizer)
//!         .bind_addr("0.0.0.0:8080".parse()?)
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use recipe_core::{ErrorPolicy, PaginationConfig, PaginationEngine, RecipeStore};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::announcer::ServiceAnnouncer;
use crate::api::{self, AppState};
use crate::bus::{EventBus, Subscription, topics};
use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::descriptor::{ApiSurface, ServiceDescriptor};
use crate::foreign::ForeignSource;
use crate::identifier_cache::IdentifierCache;
use crate::import::{ImportConfig, ImportPipeline, ImportRegistry};
use crate::import_events::ImportEventConsumer;
use crate::permission::Authorizer;
use crate::service::RecipeService;

/// Builder for creating a [`RecipeRuntime`].
pub struct RecipeRuntimeBuilder {
    store: Option<Arc<dyn RecipeStore>>,
    bus: Option<Arc<dyn EventBus>>,
    catalog: Option<Arc<dyn CatalogClient>>,
    foreign: Option<Arc<dyn ForeignSource>>,
    authorizer: Option<Arc<dyn Authorizer>>,
    bind_addr: SocketAddr,
    service_name: String,
    gateway_service_name: String,
    published_hostname: String,
    published_port: u16,
    import: ImportConfig,
    pagination: PaginationConfig,
}

impl Default for RecipeRuntimeBuilder {
    fn default() -> Self {
        Self {
            store: None,
            bus: None,
            catalog: None,
            foreign: None,
            authorizer: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            service_name: "recipe".to_string(),
            gateway_service_name: "apigateway".to_string(),
            published_hostname: "localhost".to_string(),
            published_port: 8080,
            import: ImportConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }
}

impl RecipeRuntimeBuilder {
    /// Create a builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every scalar setting from a loaded [`Config`].
    pub fn config(self, config: &Config) -> Self {
        let policy = if config.pagination_strict {
            ErrorPolicy::Strict
        } else {
            ErrorPolicy::Lenient
        };
        self.bind_addr(config.http_addr)
            .service_name(config.service_name.clone())
            .gateway_service_name(config.gateway_service_name.clone())
            .published_at(config.published_hostname.clone(), config.published_port)
            .import_config(ImportConfig {
                namespace: config.import_namespace.clone(),
                failure_mode: config.import_failure_mode,
                run_history: config.import_run_history,
            })
            .pagination(PaginationConfig {
                policy,
                query_timeout: Some(config.query_timeout),
            })
    }

    /// Recipe store.
    pub fn store(mut self, store: Arc<dyn RecipeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Event bus.
    pub fn bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Item catalog.
    pub fn catalog(mut self, catalog: Arc<dyn CatalogClient>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Foreign recipe system.
    pub fn foreign(mut self, foreign: Arc<dyn ForeignSource>) -> Self {
        self.foreign = Some(foreign);
        self
    }

    /// Capability checks for imports.
    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// HTTP listen address. Port 0 picks a free port.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Service name; also the bus consumer group.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Name the schema gateway announces itself with.
    pub fn gateway_service_name(mut self, name: impl Into<String>) -> Self {
        self.gateway_service_name = name.into();
        self
    }

    /// Hostname and port published in the service descriptor.
    pub fn published_at(mut self, hostname: impl Into<String>, port: u16) -> Self {
        self.published_hostname = hostname.into();
        self.published_port = port;
        self
    }

    /// Import namespace and failure handling.
    pub fn import_config(mut self, config: ImportConfig) -> Self {
        self.import = config;
        self
    }

    /// Pagination error policy and sub-query timeout.
    pub fn pagination(mut self, config: PaginationConfig) -> Self {
        self.pagination = config;
        self
    }

    /// Check that every collaborator is present.
    pub fn build(self) -> Result<RecipeRuntimeConfig> {
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("store is required"))?;
        let bus = self.bus.ok_or_else(|| anyhow::anyhow!("bus is required"))?;
        let catalog = self
            .catalog
            .ok_or_else(|| anyhow::anyhow!("catalog is required"))?;
        let foreign = self
            .foreign
            .ok_or_else(|| anyhow::anyhow!("foreign source is required"))?;
        let authorizer = self
            .authorizer
            .ok_or_else(|| anyhow::anyhow!("authorizer is required"))?;

        Ok(RecipeRuntimeConfig {
            store,
            bus,
            catalog,
            foreign,
            authorizer,
            bind_addr: self.bind_addr,
            service_name: self.service_name,
            gateway_service_name: self.gateway_service_name,
            published_hostname: self.published_hostname,
            published_port: self.published_port,
            import: self.import,
            pagination: self.pagination,
        })
    }
}

/// Validated configuration for a [`RecipeRuntime`].
pub struct RecipeRuntimeConfig {
    store: Arc<dyn RecipeStore>,
    bus: Arc<dyn EventBus>,
    catalog: Arc<dyn CatalogClient>,
    foreign: Arc<dyn ForeignSource>,
    authorizer: Arc<dyn Authorizer>,
    bind_addr: SocketAddr,
    service_name: String,
    gateway_service_name: String,
    published_hostname: String,
    published_port: u16,
    import: ImportConfig,
    pagination: PaginationConfig,
}

impl RecipeRuntimeConfig {
    /// Subscribe to the bus, announce the service and start serving HTTP.
    pub async fn start(self) -> Result<RecipeRuntime> {
        let engine = PaginationEngine::with_config(self.store.clone(), self.pagination);
        let recipes = Arc::new(RecipeService::new(
            self.store.clone(),
            engine,
            self.bus.clone(),
        ));

        let cache = Arc::new(IdentifierCache::new(
            self.foreign.clone(),
            self.catalog.clone(),
        ));
        let imports = Arc::new(ImportPipeline::new(
            self.authorizer,
            self.foreign,
            self.catalog,
            cache,
            self.bus.clone(),
            Arc::new(ImportRegistry::with_history(self.import.run_history)),
            self.import,
        ));

        let import_subscription = self
            .bus
            .subscribe(
                topics::IMPORT_RECIPE,
                &self.service_name,
                Arc::new(ImportEventConsumer::new()),
            )
            .await?;

        let descriptor = ServiceDescriptor::recipe(
            self.service_name.clone(),
            self.published_hostname,
            self.published_port,
        );
        let announcer = Arc::new(ServiceAnnouncer::new(
            self.bus.clone(),
            descriptor,
            &ApiSurface::recipe(),
            self.gateway_service_name,
        )?);
        let announce_subscription = announcer.start(&self.service_name).await?;

        let listener = TcpListener::bind(self.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        let app = api::router(AppState { recipes, imports });

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.wait_for(|stop| *stop).await;
                })
                .await?;
            Ok::<_, anyhow::Error>(())
        });

        info!(
            bind_addr = %local_addr,
            service = %self.service_name,
            "RecipeRuntime started"
        );

        Ok(RecipeRuntime {
            server_handle,
            shutdown_tx,
            subscriptions: vec![announce_subscription, import_subscription],
            bind_addr: local_addr,
        })
    }
}

/// A running recipe service.
///
/// Call [`shutdown`](Self::shutdown) for graceful termination.
pub struct RecipeRuntime {
    server_handle: JoinHandle<Result<()>>,
    shutdown_tx: watch::Sender<bool>,
    subscriptions: Vec<Subscription>,
    bind_addr: SocketAddr,
}

impl RecipeRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> RecipeRuntimeBuilder {
        RecipeRuntimeBuilder::new()
    }

    /// Address the HTTP server is bound to.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Check if the HTTP server is still running.
    pub fn is_running(&self) -> bool {
        !self.server_handle.is_finished()
    }

    /// Stop consuming events, then drain the HTTP server.
    pub async fn shutdown(self) -> Result<()> {
        info!("RecipeRuntime shutting down...");

        for subscription in self.subscriptions {
            subscription.stop().await;
        }

        let _ = self.shutdown_tx.send(true);

        match self.server_handle.await {
            Ok(Ok(())) => {
                info!("RecipeRuntime shutdown complete");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("RecipeRuntime server error during shutdown: {}", e);
                Err(e)
            }
            Err(e) => {
                error!("RecipeRuntime server task panicked: {}", e);
                Err(anyhow::anyhow!("server task panicked: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;
    use crate::mock::{MockCatalog, MockForeignSource, StaticAuthorizer};
    use recipe_core::store::MemoryRecipeStore;

    fn builder(bus: Arc<MemoryBus>) -> RecipeRuntimeBuilder {
        RecipeRuntime::builder()
            .store(Arc::new(MemoryRecipeStore::new()))
            .bus(bus)
            .catalog(Arc::new(MockCatalog::new()))
            .foreign(Arc::new(MockForeignSource::new()))
            .authorizer(Arc::new(StaticAuthorizer::deny_all()))
            .bind_addr(SocketAddr::from(([127, 0, 0, 1], 0)))
            .service_name("recipe")
            .gateway_service_name("apigateway")
    }

    #[test]
    fn test_build_requires_collaborators() {
        let err = RecipeRuntime::builder().build().err().unwrap();
        assert!(err.to_string().contains("store is required"));
    }

    #[tokio::test]
    async fn test_start_announces_and_serves() {
        let bus = Arc::new(MemoryBus::new());
        let runtime = builder(bus.clone()).build().unwrap().start().await.unwrap();

        let announced = bus.events_on(topics::SERVICE_UP).await;
        assert_eq!(announced.len(), 1);
        assert_eq!(announced[0].json().unwrap()["name"], "recipe");
        assert_eq!(bus.events_on(topics::REGISTER_QUERY).await.len(), 2);

        let url = format!("http://{}/health", runtime.bind_addr());
        let body: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert_eq!(body["status"], "ok");

        bus.inject(topics::SERVICE_UP, br#"{"name":"apigateway"}"#)
            .await;
        assert_eq!(bus.events_on(topics::SERVICE_UP).await.len(), 2);
        assert_eq!(bus.events_on(topics::REGISTER_QUERY).await.len(), 4);

        assert!(runtime.is_running());
        runtime.shutdown().await.unwrap();
    }
}
