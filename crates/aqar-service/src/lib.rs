//! # aqar-service — Use-Case Layer
//!
//! Orchestrates the pricing engine and the workflow entities over the
//! abstract ports. Every mutation follows the same shape: read the entity
//! under its current version, apply the guarded transition, write back
//! optimistically, publish the domain event. Stale writes retry within a
//! bounded budget; the one exception is block approval, whose conflict is
//! an answer, not a transient.

pub mod calc;
pub mod context;
pub mod contracts;
pub mod coordinator;
pub mod deals;
pub mod documents;
pub mod reconcile;
pub mod reservations;
pub mod thresholds;

pub use calc::{
    calculate, evaluate_standard, generate_plan, CalculateRequest, CalculateResponse,
    GeneratePlanRequest,
};
pub use context::ServiceContext;
pub use contracts::ContractService;
pub use coordinator::UnitCoordinator;
pub use deals::DealService;
pub use documents::{ClientInfo, DocumentService};
pub use reconcile::{
    missing_contract_rows, missing_deal_rows, missing_reservation_rows, Reconciler,
};
pub use reservations::ReservationService;
pub use thresholds::ThresholdsCache;
