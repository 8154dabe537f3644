//! # Deal Lifecycle
//!
//! A deal is a consultant's committed offer on a unit, carrying an
//! immutable snapshot of the calculation that produced it. Transitions are
//! role-gated and every accepted event appends one audit row.
//!
//! ## States
//!
//! ```text
//! Draft ──submit──▶ PendingApproval ──approve_sm──▶ Approved
//!   ▲                    │      │
//!   └──return_for_edits──┘      └──reject_sm──▶ Rejected
//!
//! Draft | PendingApproval ──cancel──▶ Cancelled
//! ```
//!
//! ## Override Ladder
//!
//! A rejected evaluation can still proceed through an out-of-policy
//! approval chain running alongside the status:
//!
//! ```text
//! None ──request──▶ Requested ──sm──▶ SmApproved ──fm──▶ FmApproved
//!                       │                  │                 │
//!                       └────reject────────┴───────┬─────────┘
//!                                                  ▼
//!                              Rejected       ──tm──▶ TmApproved
//! ```
//!
//! `approve_sm` on the deal itself requires either an accepted evaluation
//! or a fully TM-approved override.

use serde::{Deserialize, Serialize};

use aqar_core::{
    DealId, DomainError, DomainResult, EntityFamily, Language, Money, Role, Timestamp, UnitId,
    UserId,
};
use aqar_pricing::{CustomPlanInputs, Decision, PlanResult, StandardPlan};

use crate::audit::AuditRecord;

/// Lifecycle status of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
    Cancelled,
}

impl DealStatus {
    /// Canonical state name as stored in audit rows.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether no further status transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress of the out-of-policy override chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideState {
    #[default]
    None,
    Requested,
    SmApproved,
    FmApproved,
    TmApproved,
    Rejected,
}

impl OverrideState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Requested => "REQUESTED",
            Self::SmApproved => "SM_APPROVED",
            Self::FmApproved => "FM_APPROVED",
            Self::TmApproved => "TM_APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

/// The immutable calculation snapshot a deal carries.
///
/// Frozen once the deal leaves `Draft`; the only way back is the explicit
/// return-for-edits round trip, which re-opens the draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorSnapshot {
    pub std_plan: StandardPlan,
    pub inputs: CustomPlanInputs,
    pub result: PlanResult,
}

/// A review stamp: who acted and when.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub by: UserId,
    pub at: Timestamp,
}

/// A consultant's committed offer, the root entity of the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: DealId,
    pub creator_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<UnitId>,
    pub status: DealStatus,
    /// Present once a plan has been generated; required to submit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculator_snapshot: Option<CalculatorSnapshot>,
    pub needs_override: bool,
    pub override_state: OverrideState,
    /// Nominal total of the plan excluding maintenance.
    pub amount: Money,
    pub language: Language,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_review: Option<Review>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fm_review: Option<Review>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_requested_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_sm_review: Option<Review>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_fm_review: Option<Review>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_tm_review: Option<Review>,
    /// Optimistic-concurrency version, bumped by the store on write.
    #[serde(default)]
    pub version: u64,
    /// Append-only event history.
    #[serde(default)]
    pub history: Vec<AuditRecord>,
}

impl Deal {
    /// Open a new draft deal with no plan yet.
    pub fn draft(id: DealId, creator_id: UserId, language: Language, at: Timestamp) -> Self {
        Self {
            id,
            creator_id,
            unit_id: None,
            status: DealStatus::Draft,
            calculator_snapshot: None,
            needs_override: false,
            override_state: OverrideState::None,
            amount: Money::ZERO,
            language,
            created_at: at,
            manager_review: None,
            fm_review: None,
            override_requested_at: None,
            override_sm_review: None,
            override_fm_review: None,
            override_tm_review: None,
            version: 0,
            history: Vec::new(),
        }
    }

    /// Attach or replace the calculation snapshot. Allowed only in draft.
    pub fn attach_plan(
        &mut self,
        snapshot: CalculatorSnapshot,
        unit_id: Option<UnitId>,
    ) -> DomainResult<()> {
        if self.status != DealStatus::Draft {
            return Err(self.invalid("attach_plan"));
        }
        self.amount = snapshot.result.totals.nominal_excl_maintenance;
        self.needs_override = snapshot.result.needs_override;
        self.calculator_snapshot = Some(snapshot);
        self.unit_id = unit_id;
        Ok(())
    }

    /// The evaluation decision of the attached plan, if any.
    pub fn decision(&self) -> Option<Decision> {
        self.calculator_snapshot
            .as_ref()
            .map(|s| s.result.evaluation.decision)
    }

    /// Whether the deal may advance past sales-manager review: either the
    /// plan was accepted outright or the override chain completed.
    pub fn clears_policy(&self) -> bool {
        self.decision() == Some(Decision::Accept)
            || self.override_state == OverrideState::TmApproved
    }

    // ── Status events ────────────────────────────────────────────────

    /// Submit the draft for approval. Creator or admin; a plan must be
    /// attached.
    pub fn submit(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        self.require(actor == self.creator_id || role == Role::Admin, role, "submit")?;
        if self.status != DealStatus::Draft {
            return Err(self.invalid("submit"));
        }
        if self.calculator_snapshot.is_none() {
            return Err(DomainError::validation(
                "calculator_snapshot",
                "a deal cannot be submitted without a generated plan",
            ));
        }
        self.status = DealStatus::PendingApproval;
        self.log("submit", actor, role, at);
        Ok(())
    }

    /// Sales-manager approval. Requires an accepted evaluation or a fully
    /// TM-approved override.
    pub fn approve_sm(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        self.require(role == Role::SalesManager, role, "approve_sm")?;
        if self.status != DealStatus::PendingApproval {
            return Err(self.invalid("approve_sm"));
        }
        if !self.clears_policy() {
            return Err(self.invalid("approve_sm"));
        }
        self.status = DealStatus::Approved;
        self.manager_review = Some(Review { by: actor, at });
        self.log("approve_sm", actor, role, at);
        Ok(())
    }

    /// Sales-manager rejection.
    pub fn reject_sm(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        self.require(role == Role::SalesManager, role, "reject_sm")?;
        if self.status != DealStatus::PendingApproval {
            return Err(self.invalid("reject_sm"));
        }
        self.status = DealStatus::Rejected;
        self.manager_review = Some(Review { by: actor, at });
        self.log("reject_sm", actor, role, at);
        Ok(())
    }

    /// Send a pending deal back to the consultant for edits. The snapshot
    /// re-opens; the deal must be submitted again.
    pub fn return_for_edits(
        &mut self,
        actor: UserId,
        role: Role,
        at: Timestamp,
    ) -> DomainResult<()> {
        self.require(role == Role::SalesManager, role, "return_for_edits")?;
        if self.status != DealStatus::PendingApproval {
            return Err(self.invalid("return_for_edits"));
        }
        self.status = DealStatus::Draft;
        self.log("return_for_edits", actor, role, at);
        Ok(())
    }

    /// Cancel a deal that has not been decided yet.
    pub fn cancel(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        self.require(actor == self.creator_id || role == Role::Admin, role, "cancel")?;
        if !matches!(self.status, DealStatus::Draft | DealStatus::PendingApproval) {
            return Err(self.invalid("cancel"));
        }
        self.status = DealStatus::Cancelled;
        self.log("cancel", actor, role, at);
        Ok(())
    }

    /// Logged confirmation when the unit block tied to this deal gets
    /// approved. The status does not change; the row records the trigger.
    pub fn auto_approved_on_block(&mut self, at: Timestamp) -> DomainResult<()> {
        if self.status != DealStatus::Approved {
            return Err(self.invalid("auto_approved_on_block"));
        }
        self.log("auto_approved_on_block", UserId::new(0), Role::System, at);
        Ok(())
    }

    // ── Override ladder ──────────────────────────────────────────────

    /// The creator asks for an out-of-policy approval of a rejected
    /// evaluation.
    pub fn request_override(
        &mut self,
        actor: UserId,
        role: Role,
        at: Timestamp,
    ) -> DomainResult<()> {
        self.require(actor == self.creator_id, role, "request_override")?;
        if self.decision() != Some(Decision::Reject) {
            return Err(self.invalid_override("request_override"));
        }
        if self.override_state != OverrideState::None {
            return Err(self.invalid_override("request_override"));
        }
        self.override_state = OverrideState::Requested;
        self.override_requested_at = Some(at);
        self.log("request_override", actor, role, at);
        Ok(())
    }

    /// Sales-manager step of the override chain.
    pub fn override_sm_approve(
        &mut self,
        actor: UserId,
        role: Role,
        at: Timestamp,
    ) -> DomainResult<()> {
        self.require(role == Role::SalesManager, role, "override_sm_approve")?;
        if self.override_state != OverrideState::Requested {
            return Err(self.invalid_override("override_sm_approve"));
        }
        self.override_state = OverrideState::SmApproved;
        self.override_sm_review = Some(Review { by: actor, at });
        self.log("override_sm_approve", actor, role, at);
        Ok(())
    }

    /// Financial-manager step of the override chain.
    pub fn override_fm_approve(
        &mut self,
        actor: UserId,
        role: Role,
        at: Timestamp,
    ) -> DomainResult<()> {
        self.require(role == Role::FinancialManager, role, "override_fm_approve")?;
        if self.override_state != OverrideState::SmApproved {
            return Err(self.invalid_override("override_fm_approve"));
        }
        self.override_state = OverrideState::FmApproved;
        self.override_fm_review = Some(Review { by: actor, at });
        self.fm_review = Some(Review { by: actor, at });
        self.log("override_fm_approve", actor, role, at);
        Ok(())
    }

    /// Terminal approval by top management.
    pub fn override_tm_approve(
        &mut self,
        actor: UserId,
        role: Role,
        at: Timestamp,
    ) -> DomainResult<()> {
        self.require(role.is_top_management(), role, "override_tm_approve")?;
        if self.override_state != OverrideState::FmApproved {
            return Err(self.invalid_override("override_tm_approve"));
        }
        self.override_state = OverrideState::TmApproved;
        self.override_tm_review = Some(Review { by: actor, at });
        self.log("override_tm_approve", actor, role, at);
        Ok(())
    }

    /// Rejection at any step of the chain by the role that owns that step.
    pub fn override_reject(
        &mut self,
        actor: UserId,
        role: Role,
        at: Timestamp,
    ) -> DomainResult<()> {
        let allowed = match self.override_state {
            OverrideState::Requested => role == Role::SalesManager,
            OverrideState::SmApproved => role == Role::FinancialManager,
            OverrideState::FmApproved => role.is_top_management(),
            _ => return Err(self.invalid_override("override_reject")),
        };
        self.require(allowed, role, "override_reject")?;
        self.override_state = OverrideState::Rejected;
        self.log("override_reject", actor, role, at);
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────

    fn require(&self, ok: bool, role: Role, action: &str) -> DomainResult<()> {
        if ok {
            Ok(())
        } else {
            Err(DomainError::ForbiddenRole {
                role: role.to_string(),
                action: action.to_string(),
            })
        }
    }

    fn invalid(&self, event: &str) -> DomainError {
        DomainError::InvalidTransition {
            entity: "deal",
            from: self.status.name().to_string(),
            event: event.to_string(),
        }
    }

    fn invalid_override(&self, event: &str) -> DomainError {
        DomainError::InvalidTransition {
            entity: "deal",
            from: format!("override:{}", self.override_state.name()),
            event: event.to_string(),
        }
    }

    fn log(&mut self, action: &str, actor: UserId, role: Role, at: Timestamp) {
        self.history.push(AuditRecord::event(
            EntityFamily::Deal,
            self.id.as_i64(),
            action,
            actor,
            role,
            at,
        ));
    }
}
