//! # Deal Service
//!
//! Use cases over the deal lifecycle: load under the current version,
//! apply the transition, write back with optimistic concurrency. A stale
//! write re-reads and retries within the bounded budget; the guard itself
//! is re-evaluated against the fresh copy on every attempt.

use aqar_core::{DealId, DomainResult, EntityFamily, Language, Role, Timestamp, UnitId, UserId};
use aqar_ports::{retry_with_backoff, DEFAULT_ATTEMPTS};
use aqar_state::{CalculatorSnapshot, Deal};

use crate::context::ServiceContext;

pub struct DealService {
    ctx: ServiceContext,
}

impl DealService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Open a new draft deal for a consultant.
    pub async fn create_draft(&self, creator: UserId, language: Language) -> DomainResult<Deal> {
        let now = self.ctx.clock.now();
        let id = DealId::new(self.ctx.next_id(EntityFamily::Deal).await?);
        let deal = Deal::draft(id, creator, language, now);
        self.ctx.store.insert_deal(deal.clone()).await?;
        tracing::info!(deal = %id, creator = %creator, "deal drafted");
        self.ctx.emit(EntityFamily::Deal, id.as_i64(), "create_draft", now).await;
        Ok(deal)
    }

    /// Attach or replace the calculation snapshot on a draft.
    pub async fn attach_plan(
        &self,
        id: DealId,
        snapshot: CalculatorSnapshot,
        unit_id: Option<UnitId>,
    ) -> DomainResult<Deal> {
        self.apply(id, "attach_plan", |deal, _| {
            deal.attach_plan(snapshot.clone(), unit_id)
        })
        .await
    }

    pub async fn submit(&self, id: DealId, actor: UserId, role: Role) -> DomainResult<Deal> {
        self.apply(id, "submit", |deal, at| deal.submit(actor, role, at)).await
    }

    pub async fn approve_sm(&self, id: DealId, actor: UserId, role: Role) -> DomainResult<Deal> {
        self.apply(id, "approve_sm", |deal, at| deal.approve_sm(actor, role, at)).await
    }

    pub async fn reject_sm(&self, id: DealId, actor: UserId, role: Role) -> DomainResult<Deal> {
        self.apply(id, "reject_sm", |deal, at| deal.reject_sm(actor, role, at)).await
    }

    pub async fn return_for_edits(
        &self,
        id: DealId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<Deal> {
        self.apply(id, "return_for_edits", |deal, at| {
            deal.return_for_edits(actor, role, at)
        })
        .await
    }

    pub async fn cancel(&self, id: DealId, actor: UserId, role: Role) -> DomainResult<Deal> {
        self.apply(id, "cancel", |deal, at| deal.cancel(actor, role, at)).await
    }

    // ── Override ladder ──────────────────────────────────────────────

    pub async fn request_override(
        &self,
        id: DealId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<Deal> {
        self.apply(id, "request_override", |deal, at| {
            deal.request_override(actor, role, at)
        })
        .await
    }

    pub async fn override_sm_approve(
        &self,
        id: DealId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<Deal> {
        self.apply(id, "override_sm_approve", |deal, at| {
            deal.override_sm_approve(actor, role, at)
        })
        .await
    }

    pub async fn override_fm_approve(
        &self,
        id: DealId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<Deal> {
        self.apply(id, "override_fm_approve", |deal, at| {
            deal.override_fm_approve(actor, role, at)
        })
        .await
    }

    pub async fn override_tm_approve(
        &self,
        id: DealId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<Deal> {
        self.apply(id, "override_tm_approve", |deal, at| {
            deal.override_tm_approve(actor, role, at)
        })
        .await
    }

    pub async fn override_reject(
        &self,
        id: DealId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<Deal> {
        self.apply(id, "override_reject", |deal, at| {
            deal.override_reject(actor, role, at)
        })
        .await
    }

    pub async fn get(&self, id: DealId) -> DomainResult<Deal> {
        self.ctx.store.get_deal(id).await
    }

    /// Read-apply-write with the bounded retry shared by all services.
    async fn apply<F>(&self, id: DealId, action: &'static str, f: F) -> DomainResult<Deal>
    where
        F: Fn(&mut Deal, Timestamp) -> DomainResult<()>,
    {
        let now = self.ctx.clock.now();
        let updated = retry_with_backoff(action, DEFAULT_ATTEMPTS, || async {
            let mut deal = self.ctx.store.get_deal(id).await?;
            let read_version = deal.version;
            f(&mut deal, now)?;
            self.ctx.store.update_deal(deal, read_version).await
        })
        .await?;
        self.ctx.emit(EntityFamily::Deal, id.as_i64(), action, now).await;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use aqar_core::Money;
    use aqar_ports::{FixedClock, InMemoryIdAllocator, InMemoryStore, RecordingNotifier};
    use aqar_pricing::{
        build_plan, AcceptanceThresholds, CustomPlanInputs, DpType, Frequency, Mode, StandardPlan,
    };
    use aqar_state::DealStatus;
    use rust_decimal_macros::dec;

    fn ctx_with(notifier: Arc<RecordingNotifier>) -> ServiceContext {
        ServiceContext::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(FixedClock::at_epoch(1_000)),
            notifier,
            Arc::new(InMemoryIdAllocator::new()),
        )
    }

    fn snapshot() -> CalculatorSnapshot {
        let std_plan = StandardPlan::new(
            Money::from_major(1_000_000),
            dec!(12),
            6,
            Frequency::Quarterly,
        )
        .unwrap();
        let inputs = CustomPlanInputs {
            mode: Mode::StandardMode,
            dp_type: DpType::Percentage,
            dp_value: dec!(20),
            duration_years: 6,
            frequency: Frequency::Quarterly,
            handover_year: 3,
            ..Default::default()
        };
        let result = build_plan(&std_plan, &inputs, &AcceptanceThresholds::default()).unwrap();
        CalculatorSnapshot {
            std_plan,
            inputs,
            result,
        }
    }

    #[tokio::test]
    async fn test_draft_to_approved_bumps_versions_and_emits() {
        let notifier = Arc::new(RecordingNotifier::new());
        let service = DealService::new(ctx_with(Arc::clone(&notifier)));

        let deal = service.create_draft(UserId::new(10), Language::En).await.unwrap();
        assert_eq!(deal.version, 0);

        let deal = service
            .attach_plan(deal.id, snapshot(), Some(UnitId::new(5)))
            .await
            .unwrap();
        assert_eq!(deal.version, 1);

        let deal = service.submit(deal.id, UserId::new(10), Role::Consultant).await.unwrap();
        let deal = service
            .approve_sm(deal.id, UserId::new(20), Role::SalesManager)
            .await
            .unwrap();
        assert_eq!(deal.status, DealStatus::Approved);
        assert_eq!(deal.version, 3);

        let actions: Vec<String> = notifier
            .events()
            .await
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec!["create_draft", "attach_plan", "submit", "approve_sm"]
        );
    }

    #[tokio::test]
    async fn test_failed_guard_emits_nothing_and_stores_nothing() {
        let notifier = Arc::new(RecordingNotifier::new());
        let service = DealService::new(ctx_with(Arc::clone(&notifier)));

        let deal = service.create_draft(UserId::new(10), Language::En).await.unwrap();
        // Submitting without a plan fails the domain guard.
        let err = service
            .submit(deal.id, UserId::new(10), Role::Consultant)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), aqar_core::ErrorKind::Validation);

        let stored = service.get(deal.id).await.unwrap();
        assert_eq!(stored.status, DealStatus::Draft);
        assert!(stored.history.is_empty());
        assert_eq!(notifier.events().await.len(), 1); // only create_draft
    }
}
