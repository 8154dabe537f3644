//! # aqar-ports — Abstract Ports and In-Memory Adapters
//!
//! The interfaces the core depends on, free of transport detail: the
//! snapshot store with optimistic versioning, the clock, the notifier,
//! identifier allocation, the document renderer, and number-to-words.
//!
//! Each port ships with an in-memory adapter good enough for tests and
//! the CLI. Production adapters (database, template engine, messaging)
//! live outside this workspace and implement the same traits.
//!
//! ## Failure Contract
//!
//! - Store adapters report `CONFLICT` on stale versions and `NOT_FOUND`
//!   on missing rows; infrastructure faults map to
//!   `UPSTREAM_UNAVAILABLE`, never to their native error types.
//! - Renders run under a hard timeout ([`DEFAULT_RENDER_TIMEOUT`]) and
//!   fail `RENDER_TIMEOUT` without mutating state.
//! - Notifier publishes are fire-and-forget; a lost event never fails
//!   the state write that produced it.

pub mod clock;
pub mod ids;
pub mod notify;
pub mod render;
pub mod retry;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use ids::{IdAllocator, InMemoryIdAllocator};
pub use notify::{DomainEvent, Notifier, NullNotifier, RecordingNotifier};
pub use render::{
    render_with_timeout, AmountWords, DigitWords, DocRenderer, JsonEchoRenderer,
    DEFAULT_RENDER_TIMEOUT,
};
pub use retry::{retry_with_backoff, DEFAULT_ATTEMPTS};
pub use store::{InMemoryStore, SnapshotStore};
