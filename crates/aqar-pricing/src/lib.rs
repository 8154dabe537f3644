//! # aqar-pricing — Payment Plan Evaluation & Pricing Engine
//!
//! Given a standard plan (list price, annual financial rate, tenure,
//! frequency) and a candidate custom plan, this crate produces a dated
//! nominal installment schedule, computes present value, and either
//! evaluates acceptance or back-solves the nominal total so the offer PV
//! matches the standard PV.
//!
//! ## Pipeline
//!
//! 1. [`standard`] derives the effective monthly rate and the standard
//!    (benchmark) present value.
//! 2. [`builder`] constructs the anchored schedule for one of the five
//!    calculation modes and fills the equal-installment remainder.
//! 3. [`solver`] closed-form solves the scale factor for the target-PV
//!    modes. No iteration: `s = (PV_std - A) / C`.
//! 4. [`acceptance`] checks the PV gate and the four ratio conditions
//!    against the active thresholds.
//!
//! ## Determinism
//!
//! Re-running the same request produces a byte-identical schedule: all
//! math is decimal, rounding is half-even at fixed points, and ordering
//! ties are broken by a fixed payment-kind rank.

pub mod acceptance;
pub mod builder;
pub mod inputs;
pub mod schedule;
pub mod solver;
pub mod standard;

pub use acceptance::{AcceptanceThresholds, Condition, Decision, Evaluation, PvCheck};
pub use builder::{build_plan, PlanMeta, PlanResult, Totals};
pub use inputs::{CustomPlanInputs, DpType, FirstYearKind, FirstYearPayment, Mode, SubsequentYear};
pub use schedule::{PaymentKind, ScheduleEntry};
pub use standard::{Frequency, StandardPlan};
