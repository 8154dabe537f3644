//! # Notifier Port
//!
//! Fire-and-forget domain events. A failed publish never fails the state
//! write that produced it: the write is authoritative, the event is
//! logged and retried out-of-band by the adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use aqar_core::{EntityFamily, Timestamp};

/// One domain event emitted after an accepted workflow transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    /// Envelope id for dedup on the consumer side.
    pub id: Uuid,
    pub entity: EntityFamily,
    pub entity_id: i64,
    pub action: String,
    pub at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl DomainEvent {
    pub fn new(
        entity: EntityFamily,
        entity_id: i64,
        action: impl Into<String>,
        at: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity,
            entity_id,
            action: action.into(),
            at,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Fan-out of domain events to interested parties.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish an event. Infallible by contract: adapters swallow and log
    /// transport failures.
    async fn publish(&self, event: DomainEvent);
}

/// Discards everything. Default wiring for the CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn publish(&self, event: DomainEvent) {
        tracing::debug!(
            entity = %event.entity,
            entity_id = event.entity_id,
            action = %event.action,
            "domain event dropped by null notifier"
        );
    }
}

/// Captures published events for assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, event: DomainEvent) {
        self.events.lock().await.push(event);
    }
}
