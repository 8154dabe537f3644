//! # aqar-state — Workflow State Machines
//!
//! Runtime state machines for the entities the back-office moves through
//! its pipeline: Deal, ReservationForm, Contract, Unit, and UnitBlock.
//!
//! ## Design
//!
//! Every entity carries an explicit status enum (SCREAMING_SNAKE_CASE on
//! the wire), guarded event methods, and an append-only audit history.
//! Guards are checked in a fixed order:
//!
//! 1. **Role** — wrong actor fails `FORBIDDEN_ROLE` before anything else.
//! 2. **State** — disallowed transitions fail `INVALID_TRANSITION`.
//! 3. **Domain** — entity-specific conditions (plan attached, evaluation
//!    accepted, override complete).
//!
//! A failed guard leaves the entity untouched: no status change, no audit
//! row. A successful event mutates state and appends exactly one history
//! record.
//!
//! ## What Lives Elsewhere
//!
//! Persistence, optimistic-version retry, and the at-most-one-active-block
//! invariant are enforced by the `aqar-ports` store contract and the
//! `aqar-service` coordinator. This crate is pure state logic: timestamps
//! come in as arguments so the machines stay deterministic under test.

pub mod audit;
pub mod contract;
pub mod deal;
pub mod reservation;
pub mod unit;

pub use audit::{is_monotonic, AuditRecord};
pub use contract::{Approval, Contract, ContractStatus};
pub use deal::{CalculatorSnapshot, Deal, DealStatus, OverrideState, Review};
pub use reservation::{DpBreakdown, ReservationForm, ReservationStatus};
pub use unit::{BlockStatus, Unit, UnitBlock, UnitStatus};
