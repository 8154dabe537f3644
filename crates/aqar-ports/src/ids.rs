//! # Identifier Allocation Port
//!
//! Integer identifiers are allocated monotonically per entity family.
//! Production wiring backs this with the database sequence; the in-memory
//! allocator serves tests and the CLI.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use aqar_core::{DomainResult, EntityFamily};

/// Monotonic per-family identifier source.
#[async_trait]
pub trait IdAllocator: Send + Sync {
    /// The next identifier in the family's sequence, starting at 1.
    async fn next(&self, family: EntityFamily) -> DomainResult<i64>;
}

/// Process-local allocator.
#[derive(Debug, Default)]
pub struct InMemoryIdAllocator {
    counters: Mutex<HashMap<EntityFamily, i64>>,
}

impl InMemoryIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdAllocator for InMemoryIdAllocator {
    async fn next(&self, family: EntityFamily) -> DomainResult<i64> {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let counter = counters.entry(family).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequences_are_per_family() {
        let ids = InMemoryIdAllocator::new();
        assert_eq!(ids.next(EntityFamily::Deal).await.unwrap(), 1);
        assert_eq!(ids.next(EntityFamily::Deal).await.unwrap(), 2);
        assert_eq!(ids.next(EntityFamily::Contract).await.unwrap(), 1);
    }
}
