//! # Units and Unit Blocks
//!
//! A unit is the one contended resource in the workflow. A block is a
//! time-bounded hold placed by a deal; at most one approved, unexpired
//! block may exist per unit at any instant. That uniqueness is enforced
//! by the store's conditional write; this module owns the entity-level
//! transitions and the expiry arithmetic.
//!
//! Expiry is evaluated lazily on every read through
//! [`UnitBlock::effective_status`], and eagerly by the availability
//! coordinator's sweep. The lazy read always reflects the shortest
//! remaining life.

use serde::{Deserialize, Serialize};

use aqar_core::{
    DealId, DomainError, DomainResult, EntityFamily, Role, Timestamp, UnitBlockId, UnitId, UserId,
};

use crate::audit::AuditRecord;

/// Sales status of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    /// Still being set up in inventory; not sellable.
    InventoryDraft,
    Available,
    Blocked,
    Reserved,
    Contracted,
}

impl UnitStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InventoryDraft => "INVENTORY_DRAFT",
            Self::Available => "AVAILABLE",
            Self::Blocked => "BLOCKED",
            Self::Reserved => "RESERVED",
            Self::Contracted => "CONTRACTED",
        }
    }

    /// Whether a freed block may return the unit to the market. Units
    /// that advanced to reservation or contract stay off it.
    pub fn can_release(&self) -> bool {
        matches!(self, Self::Blocked)
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A sellable unit in the compound inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    /// Inventory code printed on documents, e.g. "B3-204".
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<i64>,
    pub status: UnitStatus,
    pub available: bool,
    #[serde(default)]
    pub version: u64,
}

impl Unit {
    pub fn new(id: UnitId, code: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            model_id: None,
            status: UnitStatus::Available,
            available: true,
            version: 0,
        }
    }

    /// Take the unit off the market for an approved block.
    pub fn mark_blocked(&mut self) -> DomainResult<()> {
        if self.status != UnitStatus::Available {
            return Err(self.invalid("mark_blocked"));
        }
        self.status = UnitStatus::Blocked;
        self.available = false;
        Ok(())
    }

    /// Advance a blocked unit to reserved (reservation form approved).
    pub fn mark_reserved(&mut self) -> DomainResult<()> {
        if self.status != UnitStatus::Blocked {
            return Err(self.invalid("mark_reserved"));
        }
        self.status = UnitStatus::Reserved;
        self.available = false;
        Ok(())
    }

    /// Advance a reserved unit to contracted (contract executed).
    pub fn mark_contracted(&mut self) -> DomainResult<()> {
        if self.status != UnitStatus::Reserved {
            return Err(self.invalid("mark_contracted"));
        }
        self.status = UnitStatus::Contracted;
        self.available = false;
        Ok(())
    }

    /// Return a blocked unit to the market after its block is freed.
    /// No effect reported for units that have advanced past blocking.
    pub fn restore_available(&mut self) -> bool {
        if self.status.can_release() {
            self.status = UnitStatus::Available;
            self.available = true;
            true
        } else {
            false
        }
    }

    fn invalid(&self, event: &str) -> DomainError {
        DomainError::InvalidTransition {
            entity: "unit",
            from: self.status.name().to_string(),
            event: event.to_string(),
        }
    }
}

/// Lifecycle status of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Expired,
    UnblockingRequested,
    Unblocked,
}

impl BlockStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
            Self::Expired => "EXPIRED",
            Self::UnblockingRequested => "UNBLOCKING_REQUESTED",
            Self::Unblocked => "UNBLOCKED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled | Self::Expired | Self::Unblocked)
    }
}

impl std::fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A time-bounded hold on a unit by a deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitBlock {
    pub id: UnitBlockId,
    pub unit_id: UnitId,
    pub deal_id: DealId,
    pub requested_by: UserId,
    pub status: BlockStatus,
    pub duration_days: u32,
    pub reason: String,
    pub requested_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub history: Vec<AuditRecord>,
}

impl UnitBlock {
    /// Request a hold. Competing requests on the same unit stay pending;
    /// the first to reach approval wins the unit.
    pub fn request(
        id: UnitBlockId,
        unit_id: UnitId,
        deal_id: DealId,
        requested_by: UserId,
        duration_days: u32,
        reason: impl Into<String>,
        at: Timestamp,
    ) -> DomainResult<Self> {
        if duration_days == 0 {
            return Err(DomainError::validation(
                "duration_days",
                "a block must last at least one day",
            ));
        }
        let mut block = Self {
            id,
            unit_id,
            deal_id,
            requested_by,
            status: BlockStatus::Pending,
            duration_days,
            reason: reason.into(),
            requested_at: at,
            approved_at: None,
            expires_at: None,
            version: 0,
            history: Vec::new(),
        };
        block.log("request_block", requested_by, Role::Consultant, at);
        Ok(block)
    }

    /// Approve the hold and start its clock: it expires `duration_days`
    /// after approval.
    pub fn approve(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        self.require(role == Role::SalesManager || role == Role::Admin, role, "approve_block")?;
        if self.status != BlockStatus::Pending {
            return Err(self.invalid("approve_block"));
        }
        self.status = BlockStatus::Approved;
        self.approved_at = Some(at);
        self.expires_at = Some(at.plus_days(self.duration_days));
        self.log("approve_block", actor, role, at);
        Ok(())
    }

    pub fn reject(
        &mut self,
        actor: UserId,
        role: Role,
        reason: impl Into<String>,
        at: Timestamp,
    ) -> DomainResult<()> {
        self.require(role == Role::SalesManager || role == Role::Admin, role, "reject_block")?;
        if self.status != BlockStatus::Pending {
            return Err(self.invalid("reject_block"));
        }
        self.status = BlockStatus::Rejected;
        self.log_noted("reject_block", actor, role, at, reason.into());
        Ok(())
    }

    /// Withdraw a pending request.
    pub fn cancel(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        self.require(
            actor == self.requested_by || role == Role::Admin,
            role,
            "cancel_block",
        )?;
        if self.status != BlockStatus::Pending {
            return Err(self.invalid("cancel_block"));
        }
        self.status = BlockStatus::Cancelled;
        self.log("cancel_block", actor, role, at);
        Ok(())
    }

    /// Ask to free an approved hold early.
    pub fn request_unblock(
        &mut self,
        actor: UserId,
        role: Role,
        reason: impl Into<String>,
        at: Timestamp,
    ) -> DomainResult<()> {
        if self.effective_status(at) != BlockStatus::Approved {
            return Err(self.invalid("request_unblock"));
        }
        self.status = BlockStatus::UnblockingRequested;
        self.log_noted("request_unblock", actor, role, at, reason.into());
        Ok(())
    }

    /// Confirm the early release.
    pub fn unblock(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        self.require(role == Role::SalesManager || role == Role::Admin, role, "unblock")?;
        if self.status != BlockStatus::UnblockingRequested {
            return Err(self.invalid("unblock"));
        }
        self.status = BlockStatus::Unblocked;
        self.log("unblock", actor, role, at);
        Ok(())
    }

    /// Mark an approved block whose clock ran out. Fired by the sweep.
    pub fn expire(&mut self, now: Timestamp) -> DomainResult<()> {
        if self.status != BlockStatus::Approved || !self.is_past_expiry(now) {
            return Err(self.invalid("expire_block"));
        }
        self.status = BlockStatus::Expired;
        self.log("expire_block", UserId::new(0), Role::System, now);
        Ok(())
    }

    /// The status as of `now`, with lazy expiry applied. Reads must use
    /// this rather than the stored status.
    pub fn effective_status(&self, now: Timestamp) -> BlockStatus {
        if self.status == BlockStatus::Approved && self.is_past_expiry(now) {
            BlockStatus::Expired
        } else {
            self.status
        }
    }

    /// Whether this block currently holds the unit.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.effective_status(now) == BlockStatus::Approved
    }

    fn is_past_expiry(&self, now: Timestamp) -> bool {
        match self.expires_at {
            Some(expires) => expires <= now,
            None => false,
        }
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
            entity: "unit_block",
            from: self.status.name().to_string(),
            event: event.to_string(),
        }
    }

    fn log(&mut self, action: &str, actor: UserId, role: Role, at: Timestamp) {
        self.history.push(AuditRecord::event(
            EntityFamily::UnitBlock,
            self.id.as_i64(),
            action,
            actor,
            role,
            at,
        ));
    }

    fn log_noted(&mut self, action: &str, actor: UserId, role: Role, at: Timestamp, reason: String) {
        let record = AuditRecord::event(
            EntityFamily::UnitBlock,
            self.id.as_i64(),
            action,
            actor,
            role,
            at,
        )
        .with_notes(serde_json::json!({ "reason": reason }));
        self.history.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(secs).unwrap()
    }

    const DAY: i64 = 86_400;

    fn pending_block() -> UnitBlock {
        UnitBlock::request(
            UnitBlockId::new(1),
            UnitId::new(5),
            DealId::new(9),
            UserId::new(10),
            7,
            "client finalizing paperwork",
            ts(0),
        )
        .unwrap()
    }

    #[test]
    fn test_approval_starts_the_clock() {
        let mut b = pending_block();
        b.approve(UserId::new(20), Role::SalesManager, ts(100)).unwrap();
        assert_eq!(b.status, BlockStatus::Approved);
        assert_eq!(b.expires_at, Some(ts(100 + 7 * DAY)));
        assert!(b.is_active(ts(100 + DAY)));
    }

    #[test]
    fn test_lazy_expiry_on_read() {
        let mut b = pending_block();
        b.approve(UserId::new(20), Role::SalesManager, ts(0)).unwrap();
        // One second before the deadline the hold is still live.
        assert_eq!(b.effective_status(ts(7 * DAY - 1)), BlockStatus::Approved);
        // At and past the deadline the read reports EXPIRED even though
        // the stored status has not been swept yet.
        assert_eq!(b.effective_status(ts(7 * DAY)), BlockStatus::Expired);
        assert_eq!(b.status, BlockStatus::Approved);
        assert!(!b.is_active(ts(7 * DAY)));
    }

    #[test]
    fn test_sweep_expire() {
        let mut b = pending_block();
        b.approve(UserId::new(20), Role::SalesManager, ts(0)).unwrap();
        assert!(b.expire(ts(DAY)).is_err());
        b.expire(ts(7 * DAY)).unwrap();
        assert_eq!(b.status, BlockStatus::Expired);
        assert!(b.status.is_terminal());
        assert_eq!(b.history.last().unwrap().actor_role, Role::System);
    }

    #[test]
    fn test_unblock_round_trip() {
        let mut b = pending_block();
        b.approve(UserId::new(20), Role::SalesManager, ts(0)).unwrap();
        b.request_unblock(UserId::new(10), Role::Consultant, "deal fell through", ts(DAY))
            .unwrap();
        assert_eq!(b.status, BlockStatus::UnblockingRequested);
        b.unblock(UserId::new(20), Role::SalesManager, ts(DAY + 10)).unwrap();
        assert_eq!(b.status, BlockStatus::Unblocked);
    }

    #[test]
    fn test_expired_block_cannot_request_unblock() {
        let mut b = pending_block();
        b.approve(UserId::new(20), Role::SalesManager, ts(0)).unwrap();
        let err = b
            .request_unblock(UserId::new(10), Role::Consultant, "late", ts(8 * DAY))
            .unwrap_err();
        assert_eq!(err.kind(), aqar_core::ErrorKind::InvalidTransition);
    }

    #[test]
    fn test_cancel_only_pending() {
        let mut b = pending_block();
        b.cancel(UserId::new(10), Role::Consultant, ts(1)).unwrap();
        assert_eq!(b.status, BlockStatus::Cancelled);

        let mut b = pending_block();
        b.approve(UserId::new(20), Role::SalesManager, ts(1)).unwrap();
        assert!(b.cancel(UserId::new(10), Role::Consultant, ts(2)).is_err());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let err = UnitBlock::request(
            UnitBlockId::new(1),
            UnitId::new(5),
            DealId::new(9),
            UserId::new(10),
            0,
            "x",
            ts(0),
        )
        .unwrap_err();
        assert_eq!(err.kind(), aqar_core::ErrorKind::Validation);
    }

    #[test]
    fn test_unit_progression() {
        let mut u = Unit::new(UnitId::new(5), "B3-204");
        u.mark_blocked().unwrap();
        assert_eq!(u.status, UnitStatus::Blocked);
        assert!(!u.available);
        u.mark_reserved().unwrap();
        u.mark_contracted().unwrap();
        assert_eq!(u.status, UnitStatus::Contracted);
        // Freeing a block cannot resurrect a contracted unit.
        assert!(!u.restore_available());
        assert!(!u.available);
    }

    #[test]
    fn test_restore_from_blocked() {
        let mut u = Unit::new(UnitId::new(5), "B3-204");
        u.mark_blocked().unwrap();
        assert!(u.restore_available());
        assert_eq!(u.status, UnitStatus::Available);
        assert!(u.available);
    }

    #[test]
    fn test_block_cannot_double_approve() {
        let mut b = pending_block();
        b.approve(UserId::new(20), Role::SalesManager, ts(0)).unwrap();
        let err = b.approve(UserId::new(20), Role::SalesManager, ts(1)).unwrap_err();
        assert_eq!(err.kind(), aqar_core::ErrorKind::InvalidTransition);
    }
}
