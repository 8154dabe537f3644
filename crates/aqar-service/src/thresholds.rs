//! # Acceptance-Thresholds Cache
//!
//! The TM-approved ratio thresholds are read on every calculation but
//! change rarely. Readers take a cheap `Arc` snapshot; a configuration
//! change swaps the whole set atomically, so no reader ever sees a
//! half-updated mix of bounds.

use std::sync::Arc;

use tokio::sync::RwLock;

use aqar_pricing::AcceptanceThresholds;

/// Atomically replaceable snapshot of the active thresholds.
#[derive(Debug)]
pub struct ThresholdsCache {
    current: RwLock<Arc<AcceptanceThresholds>>,
}

impl ThresholdsCache {
    /// Start with the given set (typically loaded from configuration at
    /// boot; the default set has every dimension unbounded).
    pub fn new(initial: AcceptanceThresholds) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// The active set. The returned `Arc` stays consistent even if a
    /// replace lands while the caller is still evaluating.
    pub async fn active(&self) -> Arc<AcceptanceThresholds> {
        Arc::clone(&*self.current.read().await)
    }

    /// Swap in a new TM-approved set.
    pub async fn replace(&self, next: AcceptanceThresholds) {
        let mut guard = self.current.write().await;
        *guard = Arc::new(next);
        tracing::info!("acceptance thresholds replaced");
    }
}

impl Default for ThresholdsCache {
    fn default() -> Self {
        Self::new(AcceptanceThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_replace_is_atomic_for_held_snapshots() {
        let cache = ThresholdsCache::default();
        let before = cache.active().await;
        assert!(before.dp_percent_min.is_none());

        cache
            .replace(AcceptanceThresholds {
                dp_percent_min: Some(dec!(10)),
                dp_percent_max: Some(dec!(50)),
                ..Default::default()
            })
            .await;

        // The old snapshot is unchanged; new readers see the new set.
        assert!(before.dp_percent_min.is_none());
        let after = cache.active().await;
        assert_eq!(after.dp_percent_min, Some(dec!(10)));
        assert_eq!(after.dp_percent_max, Some(dec!(50)));
    }
}
