//! # Domain Error Union
//!
//! One error type for everything the core can report to a caller, each
//! variant carrying a stable [`ErrorKind`]. Infrastructure faults behind
//! the ports surface as `UpstreamUnavailable` or `RenderTimeout` and never
//! leak their native cause into workflow results.
//!
//! ## Propagation Policy
//!
//! - Validation, transition, and permission errors are returned without
//!   side effects: no state write, no audit row.
//! - `Conflict` (optimistic-version mismatch) is retried at the use-case
//!   layer, bounded, then surfaced.
//! - `UpstreamUnavailable` is retried at the port layer with backoff and
//!   jitter; persistent failure is surfaced.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable machine-readable kind for every [`DomainError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    InfeasiblePlan,
    PvUnreachable,
    ConvergenceFail,
    InvalidTransition,
    ForbiddenRole,
    Conflict,
    NotFound,
    UpstreamUnavailable,
    RenderTimeout,
}

impl ErrorKind {
    /// Whether the use-case layer may retry an operation failing with
    /// this kind. Guard violations are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict | Self::UpstreamUnavailable)
    }
}

/// The error union of the pricing engine and workflow machine.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Malformed input: out-of-range percentage, missing required field.
    #[error("validation error: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Plan arithmetic cannot be satisfied (negative residual, anchors
    /// exceeding the effective price).
    #[error("infeasible plan: {0}")]
    InfeasiblePlan(String),

    /// The solver's anchor cash flows already exceed the standard PV, or
    /// the required scale factor falls outside its cap.
    #[error("target PV unreachable: {0}")]
    PvUnreachable(String),

    /// The rebuilt schedule missed the PV tolerance after applying the
    /// solved scale factor.
    #[error("solver verification failed: {0}")]
    ConvergenceFail(String),

    /// The requested workflow event is not allowed from the current state.
    #[error("invalid {entity} transition: {from} -> {event}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        event: String,
    },

    /// The actor's role may not fire the requested event.
    #[error("role {role} may not perform {action}")]
    ForbiddenRole { role: String, action: String },

    /// Optimistic-version mismatch on a snapshot update.
    #[error("version conflict on {entity} {id}")]
    Conflict { entity: &'static str, id: i64 },

    /// The referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A port collaborator stayed unavailable through its retry budget.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The document renderer exceeded its hard timeout.
    #[error("render timed out after {0:?}")]
    RenderTimeout(Duration),
}

impl DomainError {
    /// Build a validation error.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::InfeasiblePlan(_) => ErrorKind::InfeasiblePlan,
            Self::PvUnreachable(_) => ErrorKind::PvUnreachable,
            Self::ConvergenceFail(_) => ErrorKind::ConvergenceFail,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::ForbiddenRole { .. } => ErrorKind::ForbiddenRole,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            Self::RenderTimeout(_) => ErrorKind::RenderTimeout,
        }
    }
}
