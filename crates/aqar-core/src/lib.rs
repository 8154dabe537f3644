//! # aqar-core — Foundational Types for the Aqar Back-Office
//!
//! This crate is the bedrock of the Aqar sales back-office workspace. It
//! defines the primitives every other crate consumes: decimal money with
//! banker's rounding, clamped month arithmetic for installment due dates,
//! UTC timestamps for audit rows, integer entity identifiers, actor roles,
//! and the single domain error union.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `DealId`, `UnitId`,
//!    `ContractId`, `Money` — all newtypes with explicit constructors.
//!    No bare integers for identifiers, no bare `Decimal` for amounts.
//!
//! 2. **No floats on user-visible amounts.** All monetary arithmetic flows
//!    through `Money`, which rounds half-even to two decimals at the
//!    presentation boundary. Present-value math keeps full `Decimal`
//!    precision internally.
//!
//! 3. **UTC-only timestamps at seconds precision.** Audit ordering
//!    comparisons must be deterministic across processes; sub-second noise
//!    is truncated at construction.
//!
//! 4. **One error union.** Every failure the core can report carries a
//!    stable [`ErrorKind`] so callers can branch without string matching.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `aqar-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize` where they cross a port boundary.

pub mod calendar;
pub mod error;
pub mod identity;
pub mod money;
pub mod role;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use calendar::{add_months, days_between, format_display, parse_iso, DEFAULT_DISPLAY_TIMEZONE};
pub use error::{DomainError, ErrorKind};
pub use identity::{
    ContractId, DealId, EntityFamily, PaymentPlanId, ReservationFormId, UnitBlockId, UnitId,
    UserId,
};
pub use money::{Currency, Money};
pub use role::{Language, Role};
pub use temporal::Timestamp;

/// Convenience result alias used across the workspace.
pub type DomainResult<T> = Result<T, DomainError>;
