// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-process event bus for tests and local development.
//!
//! Every emitted event is recorded and then pushed to subscribers before
//! `emit` returns, once per consumer group. [`MemoryBus::inject`] delivers an
//! event without recording it, which is how tests simulate other services.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;

use super::{BusError, EventBus, EventHandler, Subscription};

/// A recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Topic the event was published on.
    pub topic: String,
    /// Raw payload.
    pub payload: Vec<u8>,
}

impl Event {
    /// Decode the payload as JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

struct Subscriber {
    topic: String,
    group: String,
    handler: Arc<dyn EventHandler>,
}

/// In-memory bus.
#[derive(Default)]
pub struct MemoryBus {
    events: RwLock<Vec<Event>>,
    subscribers: RwLock<Vec<Subscriber>>,
    fail_emit: AtomicBool,
}

impl MemoryBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `emit` fail until reset.
    pub fn fail_emit(&self, fail: bool) {
        self.fail_emit.store(fail, Ordering::SeqCst);
    }

    /// All recorded events in publish order.
    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }

    /// Recorded events on one topic.
    pub async fn events_on(&self, topic: &str) -> Vec<Event> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.topic == topic)
            .cloned()
            .collect()
    }

    /// Deliver an event to subscribers without recording it.
    pub async fn inject(&self, topic: &str, payload: &[u8]) {
        self.deliver(topic, payload).await;
    }

    async fn deliver(&self, topic: &str, payload: &[u8]) {
        // Collect first so handlers may publish without holding the lock.
        let handlers: Vec<Arc<dyn EventHandler>> = {
            let subscribers = self.subscribers.read().await;
            let mut groups = HashSet::new();
            subscribers
                .iter()
                .filter(|s| s.topic == topic && groups.insert(s.group.clone()))
                .map(|s| s.handler.clone())
                .collect()
        };

        for handler in handlers {
            if let Err(e) = handler.handle(topic, payload).await {
                warn!(topic, error = %e, "Event handler failed");
            }
        }
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn emit(&self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        if self.fail_emit.load(Ordering::SeqCst) {
            return Err(BusError::Unavailable(format!(
                "injected emit failure on '{topic}'"
            )));
        }
        self.events.write().await.push(Event {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        });
        self.deliver(topic, payload).await;
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<Subscription, BusError> {
        self.subscribers.write().await.push(Subscriber {
            topic: topic.to_string(),
            group: group.to_string(),
            handler,
        });
        Ok(Subscription::passive(topic, group))
    }
}
