// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for recipe-core.

use thiserror::Error;

/// Errors raised by a [`RecipeStore`](crate::store::RecipeStore) backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization of an embedded column failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The operation did not finish within its time budget.
    #[error("Store operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Name of the operation that timed out.
        operation: &'static str,
        /// Time budget in milliseconds.
        timeout_ms: u64,
    },

    /// The backend refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors caused by malformed caller input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A cursor did not decode to a record identifier.
    #[error("Invalid cursor '{0}': expected a record identifier")]
    InvalidCursor(String),

    /// A field failed validation.
    #[error("Invalid value for '{field}': {message}")]
    InvalidField {
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
