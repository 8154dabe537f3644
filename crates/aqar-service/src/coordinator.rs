//! # Unit Availability Coordinator
//!
//! Owns the blocking protocol: requests queue freely, approval is the one
//! contended step. Approval persists through the store's conditional
//! write, so at most one approved, unexpired block exists per unit even
//! under concurrent approvers. Approval conflicts are not retried; the
//! losing request stays pending until its unit frees up or it is
//! withdrawn.
//!
//! Frees (rejection, cancellation, unblocking, expiry) restore the unit
//! to the market only while it is still merely blocked. A unit that
//! advanced to reserved or contracted stays off it.

use aqar_core::{
    DealId, DomainError, DomainResult, EntityFamily, Role, Timestamp, UnitBlockId, UnitId, UserId,
};
use aqar_ports::{retry_with_backoff, DEFAULT_ATTEMPTS};
use aqar_state::{DealStatus, UnitBlock};

use crate::context::ServiceContext;

pub struct UnitCoordinator {
    ctx: ServiceContext,
}

impl UnitCoordinator {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Queue a hold request for a deal's unit. The deal must clear policy
    /// (accepted evaluation or completed override).
    pub async fn request_block(
        &self,
        deal_id: DealId,
        unit_id: UnitId,
        duration_days: u32,
        reason: impl Into<String>,
        actor: UserId,
    ) -> DomainResult<UnitBlock> {
        let now = self.ctx.clock.now();
        let deal = self.ctx.store.get_deal(deal_id).await?;
        if !deal.clears_policy() {
            return Err(DomainError::InvalidTransition {
                entity: "unit_block",
                from: format!("deal:{}", deal.status.name()),
                event: "request_block".to_string(),
            });
        }
        // The unit must exist; its status is checked at approval time.
        self.ctx.store.get_unit(unit_id).await?;

        let id = UnitBlockId::new(self.ctx.next_id(EntityFamily::UnitBlock).await?);
        let block = UnitBlock::request(id, unit_id, deal_id, actor, duration_days, reason, now)?;
        self.ctx.store.insert_block(block.clone()).await?;
        tracing::info!(block = %id, unit = %unit_id, deal = %deal_id, "block requested");
        self.ctx.emit(EntityFamily::UnitBlock, id.as_i64(), "request_block", now).await;
        Ok(block)
    }

    /// Approve a pending block. Single attempt: a `CONFLICT` here means
    /// another block already holds the unit and must surface to the
    /// caller, not be retried away.
    pub async fn approve_block(
        &self,
        id: UnitBlockId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<UnitBlock> {
        let now = self.ctx.clock.now();
        let mut block = self.ctx.store.get_block(id).await?;
        let read_version = block.version;
        block.approve(actor, role, now)?;
        let block = self
            .ctx
            .store
            .commit_block_approval(block, read_version, now)
            .await?;

        retry_with_backoff("mark_blocked", DEFAULT_ATTEMPTS, || async {
            let mut unit = self.ctx.store.get_unit(block.unit_id).await?;
            let read_version = unit.version;
            unit.mark_blocked()?;
            self.ctx.store.update_unit(unit, read_version).await
        })
        .await?;

        // Confirmation row on the deal the hold belongs to. Only an
        // already approved deal carries it; a hold taken while the deal
        // is still in review commits without the row.
        retry_with_backoff("auto_approved_on_block", DEFAULT_ATTEMPTS, || async {
            let mut deal = self.ctx.store.get_deal(block.deal_id).await?;
            let read_version = deal.version;
            if deal.status != DealStatus::Approved {
                tracing::debug!(
                    deal = %deal.id,
                    status = deal.status.name(),
                    "deal not yet approved, skipping block confirmation row"
                );
                return Ok(deal);
            }
            deal.auto_approved_on_block(now)?;
            self.ctx.store.update_deal(deal, read_version).await
        })
        .await?;

        tracing::info!(block = %id, unit = %block.unit_id, "block approved");
        self.ctx.emit(EntityFamily::UnitBlock, id.as_i64(), "approve_block", now).await;
        Ok(block)
    }

    pub async fn reject_block(
        &self,
        id: UnitBlockId,
        actor: UserId,
        role: Role,
        reason: impl Into<String>,
    ) -> DomainResult<UnitBlock> {
        let reason = reason.into();
        self.apply(id, "reject_block", |block, at| {
            block.reject(actor, role, reason.clone(), at)
        })
        .await
    }

    /// Withdraw a pending request. No unit change: a pending block never
    /// held the unit.
    pub async fn cancel_block(
        &self,
        id: UnitBlockId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<UnitBlock> {
        self.apply(id, "cancel_block", |block, at| block.cancel(actor, role, at)).await
    }

    pub async fn request_unblock(
        &self,
        id: UnitBlockId,
        actor: UserId,
        role: Role,
        reason: impl Into<String>,
    ) -> DomainResult<UnitBlock> {
        let reason = reason.into();
        self.apply(id, "request_unblock", |block, at| {
            block.request_unblock(actor, role, reason.clone(), at)
        })
        .await
    }

    /// Confirm an early release and put the unit back on the market.
    pub async fn unblock(
        &self,
        id: UnitBlockId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<UnitBlock> {
        let block = self
            .apply(id, "unblock", |block, at| block.unblock(actor, role, at))
            .await?;
        self.release_unit(block.unit_id).await?;
        Ok(block)
    }

    /// Sweep approved blocks whose clock ran out: mark them expired and
    /// restore their units. Returns how many were expired.
    pub async fn expire_due(&self) -> DomainResult<usize> {
        let now = self.ctx.clock.now();
        let mut expired = 0usize;
        for block in self.ctx.store.approved_blocks().await? {
            if block.is_active(now) {
                continue;
            }
            let id = block.id;
            let swept = retry_with_backoff("expire_block", DEFAULT_ATTEMPTS, || async {
                let mut block = self.ctx.store.get_block(id).await?;
                let read_version = block.version;
                block.expire(now)?;
                self.ctx.store.update_block(block, read_version).await
            })
            .await;
            match swept {
                Ok(block) => {
                    self.release_unit(block.unit_id).await?;
                    self.ctx
                        .emit(EntityFamily::UnitBlock, id.as_i64(), "expire_block", now)
                        .await;
                    expired += 1;
                }
                // Another sweep or an unblock got there first.
                Err(err) if err.kind() == aqar_core::ErrorKind::InvalidTransition => continue,
                Err(err) => return Err(err),
            }
        }
        if expired > 0 {
            tracing::info!(expired, "expiry sweep released blocks");
        }
        Ok(expired)
    }

    pub async fn get_block(&self, id: UnitBlockId) -> DomainResult<UnitBlock> {
        self.ctx.store.get_block(id).await
    }

    async fn release_unit(&self, unit_id: UnitId) -> DomainResult<()> {
        retry_with_backoff("restore_available", DEFAULT_ATTEMPTS, || async {
            let mut unit = self.ctx.store.get_unit(unit_id).await?;
            let read_version = unit.version;
            if !unit.restore_available() {
                // Reserved or contracted units stay off the market.
                return Ok(unit);
            }
            self.ctx.store.update_unit(unit, read_version).await
        })
        .await?;
        Ok(())
    }

    async fn apply<F>(&self, id: UnitBlockId, action: &'static str, f: F) -> DomainResult<UnitBlock>
    where
        F: Fn(&mut UnitBlock, Timestamp) -> DomainResult<()>,
    {
        let now = self.ctx.clock.now();
        let updated = retry_with_backoff(action, DEFAULT_ATTEMPTS, || async {
            let mut block = self.ctx.store.get_block(id).await?;
            let read_version = block.version;
            f(&mut block, now)?;
            self.ctx.store.update_block(block, read_version).await
        })
        .await?;
        self.ctx.emit(EntityFamily::UnitBlock, id.as_i64(), action, now).await;
        Ok(updated)
    }
}
