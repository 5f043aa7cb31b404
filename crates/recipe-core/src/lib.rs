// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Recipe Core - records, storage and cursor pagination
//!
//! This crate owns everything the recipe service needs to answer windowed
//! list queries against its record collection:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     PaginationEngine                          │
//! │   total count ─┐                                              │
//! │                ├─ join ─► Connection { items, from, to, ... } │
//! │   window fetch ┴─► BoundaryProbe (before ‖ after)             │
//! └──────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//!                    RecipeStore (PostgreSQL / in-memory)
//! ```
//!
//! Records are ordered by their surrogate `BIGSERIAL` identifier, which is
//! also the pagination cursor. Business fields never take part in ordering.
//!
//! # Modules
//!
//! - [`model`]: Recipe records and mutation input
//! - [`filter`]: Reusable conjunctions of record predicates
//! - [`store`]: Storage trait with PostgreSQL and in-memory backends
//! - [`boundary`]: Existence checks on either side of a cursor
//! - [`pagination`]: Cursor pagination engine
//! - [`migrations`]: Embedded PostgreSQL migrations

#![deny(missing_docs)]

/// Boundary probes used to compute previous/next page flags.
pub mod boundary;

/// Error types for storage and validation.
pub mod error;

/// Record filters.
pub mod filter;

/// Embedded database migrations.
pub mod migrations;

/// Recipe record model.
pub mod model;

/// Cursor pagination engine.
pub mod pagination;

/// Storage abstraction and backends.
pub mod store;

pub use boundary::BoundaryProbe;
pub use error::{StoreError, ValidationError};
pub use filter::{Filter, Predicate};
pub use model::{LineItem, Recipe, RecipeId, RecipeInput};
pub use pagination::{
    Connection, Cursor, Degraded, ErrorPolicy, PageArgs, PaginationConfig, PaginationEngine,
    PaginationError, SubQuery,
};
pub use store::{RecipeStore, Window};
