// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Consumer for `import.recipe` events.
//!
//! Only logs what arrives. It does not yet decide between creating and
//! updating a recipe, so imported records are not stored.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::bus::{BusError, EventHandler};

/// Logs imported records.
#[derive(Debug, Default)]
pub struct ImportEventConsumer;

impl ImportEventConsumer {
    /// Create the consumer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventHandler for ImportEventConsumer {
    async fn handle(&self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        match serde_json::from_slice::<Value>(payload) {
            Ok(record) => {
                let inputs = record["inputs"].as_array().map_or(0, Vec::len);
                let outputs = record["outputs"].as_array().map_or(0, Vec::len);
                info!(
                    topic,
                    namespace = record["namespace"].as_str().unwrap_or_default(),
                    inputs,
                    outputs,
                    "Received imported recipe"
                );
            }
            // Acknowledged anyway: a redelivery would not parse either.
            Err(e) => warn!(topic, error = %e, "Discarding unparseable import event"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accepts_valid_and_invalid_payloads() {
        let consumer = ImportEventConsumer::new();

        assert!(
            consumer
                .handle("import.recipe", br#"{"namespace":"ns","inputs":[],"outputs":[]}"#)
                .await
                .is_ok()
        );
        assert!(consumer.handle("import.recipe", b"{").await.is_ok());
    }
}
