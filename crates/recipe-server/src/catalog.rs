// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Upstream catalog lookups through the API gateway.
//!
//! Namespaces and items are owned by other services. They are looked up by
//! name with GraphQL queries sent to the gateway.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

const NAMESPACE_BY_NAME: &str =
    "query NamespaceByName($name: String!) { namespaceByName(name: $name) { _id name } }";

const FIND_ITEM: &str = "query FindItem($name: String!, $namespaceId: ID!) { findItem(name: $name, namespaceId: $namespaceId) { _id } }";

/// Catalog lookup errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    /// Transport failure.
    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("Catalog returned HTTP {0}")]
    Status(u16),

    /// The query was answered with GraphQL errors.
    #[error("Catalog query failed: {0}")]
    Query(String),

    /// The query returned no match.
    #[error("{kind} '{name}' not found in catalog")]
    NotFound {
        /// What was looked up.
        kind: &'static str,
        /// Name looked up.
        name: String,
    },
}

/// Name → identifier lookups against the catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Identifier of the namespace called `name`.
    async fn namespace_by_name(&self, name: &str) -> Result<String, CatalogError>;

    /// Identifier of the item called `name` inside a namespace.
    async fn find_item(&self, name: &str, namespace_id: &str) -> Result<String, CatalogError>;
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

/// Catalog client speaking GraphQL over HTTP to the API gateway.
#[derive(Debug, Clone)]
pub struct GatewayCatalogClient {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl GatewayCatalogClient {
    /// Create a client for a gateway endpoint.
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token,
        })
    }

    async fn query(&self, query: &str, variables: Value) -> Result<Value, CatalogError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let body: GraphQlResponse = response.json().await?;
        if !body.errors.is_empty() {
            let messages: Vec<_> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(CatalogError::Query(messages.join("; ")));
        }
        Ok(body.data.unwrap_or(Value::Null))
    }

    fn extract_id(
        data: &Value,
        field: &str,
        kind: &'static str,
        name: &str,
    ) -> Result<String, CatalogError> {
        data.get(field)
            .and_then(|node| node.get("_id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CatalogError::NotFound {
                kind,
                name: name.to_string(),
            })
    }
}

#[async_trait]
impl CatalogClient for GatewayCatalogClient {
    async fn namespace_by_name(&self, name: &str) -> Result<String, CatalogError> {
        let data = self
            .query(NAMESPACE_BY_NAME, json!({ "name": name }))
            .await?;
        let id = Self::extract_id(&data, "namespaceByName", "Namespace", name)?;
        debug!(namespace = name, namespace_id = %id, "Resolved namespace");
        Ok(id)
    }

    async fn find_item(&self, name: &str, namespace_id: &str) -> Result<String, CatalogError> {
        let data = self
            .query(
                FIND_ITEM,
                json!({ "name": name, "namespaceId": namespace_id }),
            )
            .await?;
        Self::extract_id(&data, "findItem", "Item", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, token: Option<&str>) -> GatewayCatalogClient {
        GatewayCatalogClient::new(
            format!("{}/graphql", server.uri()),
            token.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_namespace_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({ "variables": { "name": "FFXIV" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "namespaceByName": { "_id": "ns-1", "name": "FFXIV" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server, Some("secret"))
            .namespace_by_name("FFXIV")
            .await
            .unwrap();

        assert_eq!(id, "ns-1");
    }

    #[tokio::test]
    async fn test_find_item_sends_namespace_variable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "variables": { "name": "Iron Ore", "namespaceId": "ns-1" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "findItem": { "_id": "item-9" } }
            })))
            .mount(&server)
            .await;

        let id = client(&server, None)
            .find_item("Iron Ore", "ns-1")
            .await
            .unwrap();

        assert_eq!(id, "item-9");
    }

    #[tokio::test]
    async fn test_null_result_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": { "findItem": null } })),
            )
            .mount(&server)
            .await;

        let err = client(&server, None)
            .find_item("Unobtainium", "ns-1")
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::NotFound { kind: "Item", .. }));
    }

    #[tokio::test]
    async fn test_graphql_errors_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "message": "permission denied" }]
            })))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .namespace_by_name("FFXIV")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Query(ref m) if m == "permission denied"));

        let down = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&down)
            .await;
        let err = client(&down, None)
            .namespace_by_name("FFXIV")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Status(503)));
    }
}
