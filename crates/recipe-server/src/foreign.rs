// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The foreign recipe system imports are read from.
//!
//! Two plain GET endpoints below a base URL:
//!
//! | Path          | Body                         |
//! |---------------|------------------------------|
//! | `/recipe`     | JSON array of recipe records |
//! | `/item/{id}`  | `{ "_id": ..., "name": ... }`|
//!
//! Item ids are percent-encoded as a single path segment.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Foreign system errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ForeignError {
    /// Transport or body decoding failure.
    #[error("Foreign request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("Foreign system returned HTTP {status} for {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Response status.
        status: u16,
    },

    /// The body did not have the expected shape.
    #[error("Malformed foreign response: {0}")]
    Malformed(String),

    /// The base URL cannot have paths appended to it.
    #[error("Invalid foreign base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// Configured URL.
        url: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Read access to the foreign system.
#[async_trait]
pub trait ForeignSource: Send + Sync {
    /// All recipe records, in source order.
    async fn fetch_recipes(&self) -> Result<Vec<Value>, ForeignError>;

    /// Display name of a foreign item.
    async fn fetch_item_name(&self, foreign_id: &str) -> Result<String, ForeignError>;
}

#[derive(Deserialize)]
struct ForeignItem {
    name: String,
}

/// HTTP client for the foreign system.
#[derive(Debug, Clone)]
pub struct RcHttpSource {
    http: reqwest::Client,
    base_url: Url,
}

impl RcHttpSource {
    /// Create a client rooted at `base_url` (e.g. `https://host/api`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ForeignError> {
        let raw = base_url.into();
        let base_url = Url::parse(&raw).map_err(|e| ForeignError::InvalidBaseUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ForeignError::InvalidBaseUrl {
                url: raw,
                reason: "not a hierarchical URL".to_string(),
            });
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    /// Base URL with `segments` appended, each one percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ForeignError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ForeignError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "not a hierarchical URL".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, ForeignError> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ForeignError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ForeignSource for RcHttpSource {
    async fn fetch_recipes(&self) -> Result<Vec<Value>, ForeignError> {
        let body: Value = self
            .get(self.endpoint(&["recipe"])?)
            .await?
            .json()
            .await?;
        match body {
            Value::Array(records) => {
                debug!(records = records.len(), "Fetched foreign recipes");
                Ok(records)
            }
            other => Err(ForeignError::Malformed(format!(
                "expected an array of recipes, got {}",
                json_kind(&other)
            ))),
        }
    }

    async fn fetch_item_name(&self, foreign_id: &str) -> Result<String, ForeignError> {
        let item: ForeignItem = self
            .get(self.endpoint(&["item", foreign_id])?)
            .await?
            .json()
            .await?;
        Ok(item.name)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
