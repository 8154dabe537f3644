//! Shared wiring handed to every workflow service.

use std::sync::Arc;

use aqar_core::{DomainResult, EntityFamily, Timestamp};
use aqar_ports::{
    Clock, DomainEvent, IdAllocator, InMemoryIdAllocator, InMemoryStore, Notifier, NullNotifier,
    SnapshotStore, SystemClock,
};

/// The port bundle the use-case layer runs against.
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn SnapshotStore>,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn Notifier>,
    pub ids: Arc<dyn IdAllocator>,
}

impl ServiceContext {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        ids: Arc<dyn IdAllocator>,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            ids,
        }
    }

    /// Fully in-memory wiring for the CLI and tests.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            clock: Arc::new(SystemClock),
            notifier: Arc::new(NullNotifier),
            ids: Arc::new(InMemoryIdAllocator::new()),
        }
    }

    pub(crate) async fn next_id(&self, family: EntityFamily) -> DomainResult<i64> {
        self.ids.next(family).await
    }

    /// Publish an accepted-transition event. Fire-and-forget.
    pub(crate) async fn emit(
        &self,
        entity: EntityFamily,
        entity_id: i64,
        action: &str,
        at: Timestamp,
    ) {
        self.notifier
            .publish(DomainEvent::new(entity, entity_id, action, at))
            .await;
    }
}
