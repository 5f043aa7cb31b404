// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for recipe-server.

use std::net::SocketAddr;
use std::time::Duration;

use crate::import::{DEFAULT_RUN_HISTORY, FailureMode, UnknownFailureMode};
use crate::permission::{GrantParseError, GrantTable};

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL URL for the recipe store
    pub database_url: String,
    /// Redis URL for the event bus
    pub redis_url: String,
    /// HTTP listen address
    pub http_addr: SocketAddr,
    /// Service name; also the bus consumer group
    pub service_name: String,
    /// Name announced by the schema gateway
    pub gateway_service_name: String,
    /// Hostname published in the service descriptor
    pub published_hostname: String,
    /// Port published in the service descriptor
    pub published_port: u16,
    /// GraphQL endpoint of the API gateway (catalog queries)
    pub gateway_url: String,
    /// Optional bearer token for the API gateway
    pub gateway_token: Option<String>,
    /// Base URL of the foreign recipe system
    pub rc_base_url: String,
    /// Namespace imported records are attached to
    pub import_namespace: String,
    /// Per-record failure handling during import
    pub import_failure_mode: FailureMode,
    /// Finished import runs kept for status queries
    pub import_run_history: usize,
    /// Fail list requests when a count or boundary probe fails
    pub pagination_strict: bool,
    /// Upper bound for each store sub-query and outbound HTTP call
    pub query_timeout: Duration,
    /// Capability grants
    pub grants: GrantTable,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("RECIPE_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .ok_or(ConfigError::MissingEnvVar(
                "RECIPE_DATABASE_URL or DATABASE_URL",
            ))?;

        let port: u16 = var("PORT", "8080")
            .parse()
            .map_err(|_| ConfigError::InvalidPort("PORT"))?;
        let http_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let published_port: u16 = var("PUBLISHED_PORT", "8080")
            .parse()
            .map_err(|_| ConfigError::InvalidPort("PUBLISHED_PORT"))?;

        let gateway_port: u16 = var("API_GATEWAY_PORT", "8090")
            .parse()
            .map_err(|_| ConfigError::InvalidPort("API_GATEWAY_PORT"))?;
        let gateway_url = format!(
            "http://{}:{}{}",
            var("API_GATEWAY_HOST", "localhost"),
            gateway_port,
            var("API_GATEWAY_PATH", "/graphql"),
        );

        let import_failure_mode: FailureMode = var("IMPORT_FAILURE_MODE", "halt").parse()?;

        let run_history = var("IMPORT_RUN_HISTORY", &DEFAULT_RUN_HISTORY.to_string());
        let import_run_history = run_history
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidValue {
                var: "IMPORT_RUN_HISTORY",
                value: run_history.clone(),
            })?;

        let pagination_strict = var("PAGINATION_STRICT", "false");
        let pagination_strict = pagination_strict == "true" || pagination_strict == "1";

        let timeout_ms = var("QUERY_TIMEOUT_MS", "10000");
        let query_timeout = timeout_ms
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidValue {
                var: "QUERY_TIMEOUT_MS",
                value: timeout_ms.clone(),
            })?;

        let grants = GrantTable::parse(&var("RECIPE_GRANTS", ""))?;

        Ok(Self {
            database_url,
            redis_url: var("REDIS_URL", "redis://127.0.0.1:6379"),
            http_addr,
            service_name: var("SERVICE_NAME", "recipe"),
            gateway_service_name: var("GATEWAY_SERVICE_NAME", "apigateway"),
            published_hostname: var("PUBLISHED_HOSTNAME", "servicebackend"),
            published_port,
            gateway_url,
            gateway_token: lookup("API_GATEWAY_TOKEN").filter(|t| !t.is_empty()),
            rc_base_url: var("RC_BASE_URL", "https://rc.dukfaar.com/api"),
            import_namespace: var("IMPORT_NAMESPACE", "FFXIV"),
            import_failure_mode,
            import_run_history,
            pagination_strict,
            query_timeout,
            grants,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// A port variable is not a valid port number.
    #[error("Invalid port number in {0}")]
    InvalidPort(&'static str),
    /// A variable has a value that cannot be used.
    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
    /// `IMPORT_FAILURE_MODE` names no known mode.
    #[error("Invalid IMPORT_FAILURE_MODE: {0}")]
    FailureMode(#[from] UnknownFailureMode),
    /// `RECIPE_GRANTS` is malformed.
    #[error("Invalid RECIPE_GRANTS: {0}")]
    Grants(#[from] GrantParseError),
}
