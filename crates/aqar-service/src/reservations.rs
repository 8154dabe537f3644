//! # Reservation Service
//!
//! Creation is gated on the approved deal at the moment of the call;
//! financial-manager approval also advances the unit from blocked to
//! reserved, so a freed block can no longer return it to the market.

use chrono::NaiveDate;

use aqar_core::{
    DomainResult, EntityFamily, PaymentPlanId, ReservationFormId, Role, Timestamp, UserId,
};
use aqar_ports::{retry_with_backoff, DEFAULT_ATTEMPTS};
use aqar_state::{DpBreakdown, ReservationForm};

use crate::context::ServiceContext;

pub struct ReservationService {
    ctx: ServiceContext,
}

impl ReservationService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Open a reservation form against an approved deal. The form is born
    /// pending financial-manager review.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        deal_id: aqar_core::DealId,
        payment_plan_id: PaymentPlanId,
        reservation_date: NaiveDate,
        dp: DpBreakdown,
        actor: UserId,
        role: Role,
    ) -> DomainResult<ReservationForm> {
        let now = self.ctx.clock.now();
        let deal = self.ctx.store.get_deal(deal_id).await?;
        let id = ReservationFormId::new(self.ctx.next_id(EntityFamily::ReservationForm).await?);
        let form = ReservationForm::create(
            id,
            &deal,
            payment_plan_id,
            reservation_date,
            dp,
            actor,
            role,
            now,
        )?;
        self.ctx.store.insert_reservation(form.clone()).await?;
        tracing::info!(form = %id, deal = %deal_id, "reservation form opened");
        self.ctx
            .emit(EntityFamily::ReservationForm, id.as_i64(), "create_reservation", now)
            .await;
        Ok(form)
    }

    /// Approve the form and advance the deal's unit to reserved.
    pub async fn approve(
        &self,
        id: ReservationFormId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<ReservationForm> {
        let form = self
            .apply(id, "approve_reservation", |form, at| form.approve(actor, role, at))
            .await?;
        self.advance_unit(&form).await?;
        Ok(form)
    }

    pub async fn reject(
        &self,
        id: ReservationFormId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<ReservationForm> {
        self.apply(id, "reject_reservation", |form, at| form.reject(actor, role, at))
            .await
    }

    pub async fn cancel(
        &self,
        id: ReservationFormId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<ReservationForm> {
        self.apply(id, "cancel_reservation", |form, at| form.cancel(actor, role, at))
            .await
    }

    /// Record a collected down-payment instalment on a pending or
    /// approved form.
    pub async fn record_dp_payment(
        &self,
        id: ReservationFormId,
        amount: aqar_core::Money,
        on: NaiveDate,
    ) -> DomainResult<ReservationForm> {
        self.apply(id, "record_dp_payment", |form, _| {
            form.record_dp_payment(amount, on)
        })
        .await
    }

    pub async fn get(&self, id: ReservationFormId) -> DomainResult<ReservationForm> {
        self.ctx.store.get_reservation(id).await
    }

    async fn advance_unit(&self, form: &ReservationForm) -> DomainResult<()> {
        let deal = self.ctx.store.get_deal(form.deal_id).await?;
        let Some(unit_id) = deal.unit_id else {
            return Ok(());
        };
        retry_with_backoff("mark_reserved", DEFAULT_ATTEMPTS, || async {
            let mut unit = self.ctx.store.get_unit(unit_id).await?;
            let read_version = unit.version;
            unit.mark_reserved()?;
            self.ctx.store.update_unit(unit, read_version).await
        })
        .await?;
        Ok(())
    }

    async fn apply<F>(
        &self,
        id: ReservationFormId,
        action: &'static str,
        f: F,
    ) -> DomainResult<ReservationForm>
    where
        F: Fn(&mut ReservationForm, Timestamp) -> DomainResult<()>,
    {
        let now = self.ctx.clock.now();
        let updated = retry_with_backoff(action, DEFAULT_ATTEMPTS, || async {
            let mut form = self.ctx.store.get_reservation(id).await?;
            let read_version = form.version;
            f(&mut form, now)?;
            self.ctx.store.update_reservation(form, read_version).await
        })
        .await?;
        self.ctx
            .emit(EntityFamily::ReservationForm, id.as_i64(), action, now)
            .await;
        Ok(updated)
    }
}
