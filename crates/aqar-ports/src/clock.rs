//! # Clock Port
//!
//! All timestamps the workflow writes flow through this port so tests can
//! pin the clock and transitions stay reproducible.

use std::sync::atomic::{AtomicI64, Ordering};

use aqar_core::Timestamp;

/// Deterministic source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock implementation for production wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A pinned clock for tests, advanced manually.
#[derive(Debug)]
pub struct FixedClock {
    epoch_secs: AtomicI64,
}

impl FixedClock {
    pub fn at_epoch(secs: i64) -> Self {
        Self {
            epoch_secs: AtomicI64::new(secs),
        }
    }

    /// Move the clock forward.
    pub fn advance_secs(&self, secs: i64) {
        self.epoch_secs.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i64) {
        self.advance_secs(days * 86_400);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        let secs = self.epoch_secs.load(Ordering::SeqCst);
        // The stored value is always a valid epoch second in tests.
        Timestamp::from_epoch_secs(secs).unwrap_or_else(|_| Timestamp::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::at_epoch(1_000);
        let a = clock.now();
        clock.advance_days(2);
        let b = clock.now();
        assert_eq!(b.epoch_secs() - a.epoch_secs(), 2 * 86_400);
    }

    #[test]
    fn test_system_clock_is_utc_seconds() {
        let ts = SystemClock.now();
        assert!(ts.to_iso8601().ends_with('Z'));
    }
}
