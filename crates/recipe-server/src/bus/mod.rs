// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Publish/subscribe event bus.
//!
//! Topics carry JSON payloads. Delivery is at-least-once with one consumer
//! group per subscribing service: every group sees every event once, and
//! within a group each event goes to a single consumer.
//!
//! | Topic                  | Payload                | Direction |
//! |------------------------|------------------------|-----------|
//! | `service.up`           | service descriptor     | both      |
//! | `import.recipe`        | one transformed record | both      |
//! | `import.completed`     | import run summary     | out       |
//! | `recipe.created`       | record                 | out       |
//! | `recipe.updated`       | record                 | out       |
//! | `recipe.deleted`       | `{ "id": ... }`        | out       |
//! | `registerQuery`        | one query operation    | out       |
//! | `registerMutation`     | one mutation operation | out       |
//! | `registerSubscription` | one subscription       | out       |
//! | `registerType`         | one exported type      | out       |

pub mod memory;
pub mod redis;

pub use self::memory::MemoryBus;
pub use self::redis::RedisBus;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

/// Well-known topic names.
pub mod topics {
    /// Service lifecycle announcements.
    pub const SERVICE_UP: &str = "service.up";
    /// One imported record ready to be stored.
    pub const IMPORT_RECIPE: &str = "import.recipe";
    /// Summary of a finished import run.
    pub const IMPORT_COMPLETED: &str = "import.completed";
    /// A recipe was created.
    pub const RECIPE_CREATED: &str = "recipe.created";
    /// A recipe was replaced.
    pub const RECIPE_UPDATED: &str = "recipe.updated";
    /// A recipe was deleted.
    pub const RECIPE_DELETED: &str = "recipe.deleted";
    /// A query operation the gateway should route here.
    pub const REGISTER_QUERY: &str = "registerQuery";
    /// A mutation operation the gateway should route here.
    pub const REGISTER_MUTATION: &str = "registerMutation";
    /// A subscription operation the gateway should route here.
    pub const REGISTER_SUBSCRIPTION: &str = "registerSubscription";
    /// A type owned by the announcing service.
    pub const REGISTER_TYPE: &str = "registerType";
}

/// Bus errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BusError {
    /// Redis command failed.
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// Payload could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A handler rejected an event.
    #[error("Handler error on '{topic}': {message}")]
    Handler {
        /// Topic the event arrived on.
        topic: String,
        /// What went wrong.
        message: String,
    },

    /// The bus refused the operation.
    #[error("Bus unavailable: {0}")]
    Unavailable(String),
}

/// Consumer of events on one topic.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one event. An error leaves the event unacknowledged.
    async fn handle(&self, topic: &str, payload: &[u8]) -> Result<(), BusError>;
}

/// Publish/subscribe transport.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a payload. Returns once the transport accepted it.
    async fn emit(&self, topic: &str, payload: &[u8]) -> Result<(), BusError>;

    /// Deliver events on `topic` to `handler` as member of consumer `group`.
    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<Subscription, BusError>;
}

/// Serialize `value` and publish it.
pub async fn emit_json<T: Serialize + ?Sized>(
    bus: &dyn EventBus,
    topic: &str,
    value: &T,
) -> Result<(), BusError> {
    let payload = serde_json::to_vec(value)?;
    bus.emit(topic, &payload).await
}

/// An active subscription.
///
/// Dropping the subscription leaves the consumer running; call
/// [`stop`](Self::stop) to end it.
pub struct Subscription {
    topic: String,
    group: String,
    shutdown: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// A subscription without a consumer task (push-delivered transports).
    pub fn passive(topic: &str, group: &str) -> Self {
        Self {
            topic: topic.to_string(),
            group: group.to_string(),
            shutdown: Arc::new(Notify::new()),
            handle: None,
        }
    }

    /// A subscription backed by a consumer task that exits when notified.
    pub fn with_worker(
        topic: &str,
        group: &str,
        shutdown: Arc<Notify>,
        handle: JoinHandle<()>,
    ) -> Self {
        Self {
            topic: topic.to_string(),
            group: group.to_string(),
            shutdown,
            handle: Some(handle),
        }
    }

    /// Subscribed topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Consumer group.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Stop the consumer and wait for it to exit.
    pub async fn stop(self) {
        self.shutdown.notify_one();
        if let Some(handle) = self.handle {
            let _ = handle.await;
        }
        debug!(topic = %self.topic, group = %self.group, "Subscription stopped");
    }
}
