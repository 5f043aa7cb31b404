// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Service announcement to the schema gateway.
//!
//! ```text
//!   recipe                    bus                      gateway
//!     │ subscribe(service.up)  │                          │
//!     │──── service.up ───────►│─────────────────────────►│ (if already up)
//!     │                        │◄──── service.up ─────────│ (gateway restarts)
//!     │◄─── name == gateway ───│                          │
//!     │──── service.up ───────►│─────────────────────────►│
//! ```
//!
//! Startup order between the two is unknown, so every gateway announcement
//! is answered with a fresh one of ours. The gateway treats repeats as
//! no-ops. Publishing is fire-and-forget.
//!
//! Each announcement is followed by the API surface: one `registerQuery`,
//! `registerMutation` or `registerSubscription` event per root operation and
//! one `registerType` event per exported type, all tagged with the service
//! name.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bus::{BusError, EventBus, EventHandler, Subscription, topics};
use crate::descriptor::{ApiSurface, ServiceDescriptor};

#[derive(Deserialize)]
struct Announcement {
    name: String,
}

#[derive(Serialize)]
struct Registration<'a, T> {
    service: &'a str,
    #[serde(flatten)]
    definition: &'a T,
}

/// Publishes this service's descriptor and answers gateway announcements.
pub struct ServiceAnnouncer {
    bus: Arc<dyn EventBus>,
    descriptor: ServiceDescriptor,
    payload: Vec<u8>,
    registrations: Vec<(&'static str, Vec<u8>)>,
    gateway_name: String,
}

impl ServiceAnnouncer {
    /// Create an announcer. Descriptor and registrations are encoded once.
    pub fn new(
        bus: Arc<dyn EventBus>,
        descriptor: ServiceDescriptor,
        surface: &ApiSurface,
        gateway_name: impl Into<String>,
    ) -> Result<Self, BusError> {
        let payload = serde_json::to_vec(&descriptor)?;
        let service = descriptor.name.as_str();

        let mut registrations = Vec::new();
        for operation in &surface.operations {
            let registration = Registration {
                service,
                definition: operation,
            };
            registrations.push((operation.kind.topic(), serde_json::to_vec(&registration)?));
        }
        for type_definition in &surface.types {
            let registration = Registration {
                service,
                definition: type_definition,
            };
            registrations.push((topics::REGISTER_TYPE, serde_json::to_vec(&registration)?));
        }

        Ok(Self {
            bus,
            descriptor,
            payload,
            registrations,
            gateway_name: gateway_name.into(),
        })
    }

    /// The published descriptor.
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// Publish the descriptor, then every registration.
    pub async fn announce(&self) -> Result<(), BusError> {
        self.bus.emit(topics::SERVICE_UP, &self.payload).await?;
        for (topic, payload) in &self.registrations {
            self.bus.emit(topic, payload).await?;
        }
        info!(
            service = %self.descriptor.name,
            registrations = self.registrations.len(),
            "Announced service"
        );
        Ok(())
    }

    /// React to a `service.up` event. Returns whether we re-announced.
    pub async fn handle_gateway_up(&self, payload: &[u8]) -> Result<bool, BusError> {
        let announcement: Announcement = match serde_json::from_slice(payload) {
            Ok(a) => a,
            Err(e) => {
                debug!(error = %e, "Ignoring malformed service.up payload");
                return Ok(false);
            }
        };

        if announcement.name != self.gateway_name {
            return Ok(false);
        }

        info!(gateway = %announcement.name, "Gateway came up, re-announcing");
        self.announce().await?;
        Ok(true)
    }

    /// Subscribe to gateway announcements, then announce.
    ///
    /// A failed initial announcement is logged; the next gateway
    /// announcement triggers another attempt.
    pub async fn start(self: &Arc<Self>, group: &str) -> Result<Subscription, BusError> {
        let subscription = self
            .bus
            .subscribe(topics::SERVICE_UP, group, self.clone())
            .await?;

        if let Err(e) = self.announce().await {
            warn!(error = %e, "Initial service announcement failed");
        }
        Ok(subscription)
    }
}

#[async_trait]
impl EventHandler for ServiceAnnouncer {
    async fn handle(&self, _topic: &str, payload: &[u8]) -> Result<(), BusError> {
        if let Err(e) = self.handle_gateway_up(payload).await {
            warn!(error = %e, "Re-announcement failed");
        }
        Ok(())
    }
}
