//! # Contract Lifecycle
//!
//! The final signed document, generated from an approved reservation form
//! and carrying its own approval chain:
//!
//! ```text
//! Draft ──submit (CA)──▶ PendingCm ──approve (CM)──▶ PendingTm
//!                            │                          │
//!                            └────────reject────────────┤
//!                                                       ▼
//!                 Executed ◀──execute (CA)── Approved ◀─approve (TM)
//! ```
//!
//! Rejection is allowed from either pending stage by the role that owns
//! it. Execution requires `APPROVED` and is terminal.

use serde::{Deserialize, Serialize};

use aqar_core::{
    ContractId, DomainError, DomainResult, EntityFamily, ReservationFormId, Role, Timestamp,
    UserId,
};

use crate::audit::AuditRecord;
use crate::reservation::{ReservationForm, ReservationStatus};

/// Lifecycle status of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Draft,
    PendingCm,
    PendingTm,
    Approved,
    Rejected,
    Executed,
}

impl ContractStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::PendingCm => "PENDING_CM",
            Self::PendingTm => "PENDING_TM",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Executed => "EXECUTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Executed)
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An approval stamp in the contract chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub by: UserId,
    pub role: Role,
    pub at: Timestamp,
}

/// The contract entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: ContractId,
    pub reservation_form_id: ReservationFormId,
    pub status: ContractStatus,
    pub creator_id: UserId,
    pub created_at: Timestamp,
    /// CM and TM stamps in chain order.
    #[serde(default)]
    pub approvers: Vec<Approval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<Timestamp>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub history: Vec<AuditRecord>,
}

impl Contract {
    /// Draft a contract from an approved reservation. Contract admin only.
    pub fn draft(
        id: ContractId,
        reservation: &ReservationForm,
        actor: UserId,
        role: Role,
        at: Timestamp,
    ) -> DomainResult<Self> {
        if role != Role::ContractAdmin {
            return Err(DomainError::ForbiddenRole {
                role: role.to_string(),
                action: "draft_contract".to_string(),
            });
        }
        if reservation.status != ReservationStatus::Approved {
            return Err(DomainError::InvalidTransition {
                entity: "contract",
                from: reservation.status.name().to_string(),
                event: "draft_contract".to_string(),
            });
        }
        let mut contract = Self {
            id,
            reservation_form_id: reservation.id,
            status: ContractStatus::Draft,
            creator_id: actor,
            created_at: at,
            approvers: Vec::new(),
            executed_at: None,
            version: 0,
            history: Vec::new(),
        };
        contract.log("draft_contract", actor, role, at);
        Ok(contract)
    }

    /// Submit the draft to the contract manager.
    pub fn submit(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        self.require(role == Role::ContractAdmin, role, "submit_contract")?;
        self.step(ContractStatus::Draft, ContractStatus::PendingCm, "submit_contract")?;
        self.log("submit_contract", actor, role, at);
        Ok(())
    }

    /// Contract-manager approval, forwarding to top management.
    pub fn cm_approve(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        self.require(role == Role::ContractManager, role, "cm_approve")?;
        self.step(ContractStatus::PendingCm, ContractStatus::PendingTm, "cm_approve")?;
        self.approvers.push(Approval { by: actor, role, at });
        self.log("cm_approve", actor, role, at);
        Ok(())
    }

    /// Top-management approval.
    pub fn tm_approve(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        self.require(role.is_top_management(), role, "tm_approve")?;
        self.step(ContractStatus::PendingTm, ContractStatus::Approved, "tm_approve")?;
        self.approvers.push(Approval { by: actor, role, at });
        self.log("tm_approve", actor, role, at);
        Ok(())
    }

    /// Rejection from either pending stage by the role that owns it.
    pub fn reject(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        let allowed = match self.status {
            ContractStatus::PendingCm => role == Role::ContractManager,
            ContractStatus::PendingTm => role.is_top_management(),
            _ => return Err(self.invalid("reject_contract")),
        };
        self.require(allowed, role, "reject_contract")?;
        self.status = ContractStatus::Rejected;
        self.log("reject_contract", actor, role, at);
        Ok(())
    }

    /// Mark the approved contract as signed and executed. Terminal.
    pub fn execute(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        self.require(
            matches!(role, Role::ContractAdmin | Role::ContractManager),
            role,
            "execute_contract",
        )?;
        self.step(ContractStatus::Approved, ContractStatus::Executed, "execute_contract")?;
        self.executed_at = Some(at);
        self.log("execute_contract", actor, role, at);
        Ok(())
    }

    fn step(
        &mut self,
        from: ContractStatus,
        to: ContractStatus,
        event: &str,
    ) -> DomainResult<()> {
        if self.status != from {
            return Err(self.invalid(event));
        }
        self.status = to;
        Ok(())
    }

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
            entity: "contract",
            from: self.status.name().to_string(),
            event: event.to_string(),
        }
    }

    fn log(&mut self, action: &str, actor: UserId, role: Role, at: Timestamp) {
        self.history.push(AuditRecord::event(
            EntityFamily::Contract,
            self.id.as_i64(),
            action,
            actor,
            role,
            at,
        ));
    }
}
