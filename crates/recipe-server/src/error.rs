// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for recipe-server.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use recipe_core::{PaginationError, StoreError, ValidationError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::bus::BusError;
use crate::import::ImportError;

/// Server errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Page resolution failed.
    #[error(transparent)]
    Pagination(#[from] PaginationError),

    /// Caller input was malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Event bus operation failed.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// An import could not be started.
    #[error(transparent)]
    Import(#[from] ImportError),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request could not be understood.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Result type using the server [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Pagination(PaginationError::Validation(_)) => StatusCode::BAD_REQUEST,
            Error::Pagination(PaginationError::Store {
                source: StoreError::Timeout { .. },
                ..
            })
            | Error::Store(StoreError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Error::Import(ImportError::Forbidden { .. }) => StatusCode::FORBIDDEN,
            Error::Import(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "Request failed");
        }

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "status": status.as_u16(),
            }
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Error::from(ValidationError::InvalidCursor("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::NotFound("recipe 1".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::from(ImportError::Forbidden {
                principal: "anonymous".into(),
                capability: "mutation.rcRecipeImport",
            })
            .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::from(StoreError::Timeout {
                operation: "window",
                timeout_ms: 10,
            })
            .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            Error::from(StoreError::Unavailable("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
