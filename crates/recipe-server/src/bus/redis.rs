// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Redis Streams event bus.
//!
//! Each topic is a stream. Publishing is `XADD topic * payload <bytes>`.
//! Each subscription joins the consumer group named after the subscribing
//! service (`XGROUP CREATE ... MKSTREAM`) and runs a consumer task:
//!
//! ```text
//! loop {
//!     XREADGROUP GROUP <group> <consumer> COUNT n BLOCK ms STREAMS <topic> >
//!     for each entry: handler.handle(payload) ─ ok ─► XACK
//!                                             └ err ─► left pending
//! }
//! ```
//!
//! Consumers use their own connection because `XREADGROUP ... BLOCK` would
//! stall every other command multiplexed on a shared one.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{BusError, EventBus, EventHandler, Subscription};

const PAYLOAD_FIELD: &str = "payload";

/// Tuning for stream consumers.
#[derive(Debug, Clone)]
pub struct RedisBusConfig {
    /// Entries fetched per `XREADGROUP`.
    pub batch_size: usize,
    /// How long one `XREADGROUP` blocks waiting for entries.
    pub block: Duration,
    /// Pause after a failed read before retrying.
    pub retry_delay: Duration,
}

impl Default for RedisBusConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            block: Duration::from_secs(5),
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Event bus over Redis Streams.
#[derive(Clone)]
pub struct RedisBus {
    client: Client,
    conn: ConnectionManager,
    config: RedisBusConfig,
}

impl fmt::Debug for RedisBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBus")
            .field("connection", &"ConnectionManager")
            .field("config", &self.config)
            .finish()
    }
}

impl RedisBus {
    /// Connect to Redis.
    pub async fn connect(redis_url: &str) -> Result<Self, BusError> {
        Self::connect_with_config(redis_url, RedisBusConfig::default()).await
    }

    /// Connect to Redis with explicit consumer tuning.
    pub async fn connect_with_config(
        redis_url: &str,
        config: RedisBusConfig,
    ) -> Result<Self, BusError> {
        info!("Connecting to Redis event bus");
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        info!("Connected to Redis event bus");
        Ok(Self {
            client,
            conn,
            config,
        })
    }

    async fn ensure_group(&self, topic: &str, group: &str) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        let created: redis::RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(topic)
            .arg(group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;
        match created {
            Ok(()) => {
                debug!(topic, group, "Created consumer group");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl EventBus for RedisBus {
    async fn emit(&self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        let id: String = conn.xadd(topic, "*", &[(PAYLOAD_FIELD, payload)]).await?;
        debug!(topic, entry_id = %id, bytes = payload.len(), "Published event");
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<Subscription, BusError> {
        self.ensure_group(topic, group).await?;

        let conn = self.client.get_multiplexed_async_connection().await?;
        let consumer = StreamConsumer {
            conn,
            topic: topic.to_string(),
            group: group.to_string(),
            consumer: format!("{group}-{}", Uuid::new_v4()),
            handler,
            config: self.config.clone(),
            shutdown: Arc::new(Notify::new()),
        };
        let shutdown = consumer.shutdown.clone();

        info!(topic, group, consumer = %consumer.consumer, "Subscribed to stream");
        let handle = tokio::spawn(consumer.run());
        Ok(Subscription::with_worker(topic, group, shutdown, handle))
    }
}

struct StreamConsumer {
    conn: MultiplexedConnection,
    topic: String,
    group: String,
    consumer: String,
    handler: Arc<dyn EventHandler>,
    config: RedisBusConfig,
    shutdown: Arc<Notify>,
}

impl StreamConsumer {
    async fn run(mut self) {
        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(self.config.batch_size)
            .block(self.config.block.as_millis() as usize);

        loop {
            let keys = [self.topic.as_str()];
            let read: redis::RedisResult<Option<StreamReadReply>> = tokio::select! {
                _ = self.shutdown.notified() => {
                    debug!(topic = %self.topic, "Stream consumer shutting down");
                    break;
                }
                read = self.conn.xread_options(&keys, &[">"], &options) => read,
            };

            match read {
                Ok(Some(reply)) => self.dispatch(reply).await,
                Ok(None) => {}
                Err(e) => {
                    error!(topic = %self.topic, error = %e, "XREADGROUP failed");
                    tokio::select! {
                        _ = self.shutdown.notified() => break,
                        _ = tokio::time::sleep(self.config.retry_delay) => {}
                    }
                }
            }
        }
    }

    async fn dispatch(&mut self, reply: StreamReadReply) {
        for key in reply.keys {
            for entry in key.ids {
                let Some(payload) = entry.get::<Vec<u8>>(PAYLOAD_FIELD) else {
                    warn!(topic = %self.topic, entry_id = %entry.id, "Entry without payload, acknowledging");
                    self.ack(&entry.id).await;
                    continue;
                };

                match self.handler.handle(&self.topic, &payload).await {
                    Ok(()) => self.ack(&entry.id).await,
                    Err(e) => {
                        warn!(topic = %self.topic, entry_id = %entry.id, error = %e, "Handler failed, entry left pending");
                    }
                }
            }
        }
    }

    async fn ack(&mut self, id: &str) {
        let acked: redis::RedisResult<i64> = self.conn.xack(&self.topic, &self.group, &[id]).await;
        if let Err(e) = acked {
            warn!(topic = %self.topic, entry_id = id, error = %e, "XACK failed");
        }
    }
}
