// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Recipe Server - HTTP API, event bus and foreign recipe import
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         recipe-server                                 │
//! │                                                                       │
//! │   HTTP API ──► RecipeService ──► PaginationEngine ──► RecipeStore     │
//! │      │               │                                                │
//! │      │               └── recipe.created / updated / deleted ──┐       │
//! │      ▼                                                        ▼       │
//! │   ImportPipeline ──► IdentifierCache ──► CatalogClient    EventBus    │
//! │      │                     │                              (Redis)     │
//! │      ├── ForeignSource ◄───┘                                 ▲        │
//! │      └── import.recipe / import.completed ───────────────────┤        │
//! │                                                              │        │
//! │   ServiceAnnouncer ◄── service.up (gateway) ─────────────────┘        │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`api`]: axum router and handlers
//! - [`bus`]: Topic-based event bus (Redis Streams and in-memory)
//! - [`announcer`]: Service descriptor publication
//! - [`import`]: Background import of foreign recipe records
//! - [`identifier_cache`]: Foreign item id to catalog id resolution
//! - [`runtime`]: Embeddable runtime wiring everything together

#![deny(missing_docs)]

/// Service announcement on the bus.
pub mod announcer;

/// HTTP API.
pub mod api;

/// Event bus abstraction and backends.
pub mod bus;

/// Item catalog client.
pub mod catalog;

/// Configuration loaded from the environment.
pub mod config;

/// Service descriptor published to the schema gateway.
pub mod descriptor;

/// Error types.
pub mod error;

/// Foreign recipe system client.
pub mod foreign;

/// Foreign item identifier cache.
pub mod identifier_cache;

/// Foreign recipe import.
pub mod import;

/// Consumer for imported records.
pub mod import_events;

/// Test doubles for external collaborators.
pub mod mock;

/// Principals and capability checks.
pub mod permission;

/// Embeddable runtime.
pub mod runtime;

/// Recipe reads and writes.
pub mod service;

pub use config::Config;
pub use error::{Error, Result};
pub use runtime::RecipeRuntime;
