//! # Contract Service
//!
//! Drafting reads the reservation at call time; execution walks back to
//! the deal's unit and marks it contracted, the terminal inventory state.

use aqar_core::{ContractId, DomainResult, EntityFamily, ReservationFormId, Role, Timestamp, UserId};
use aqar_ports::{retry_with_backoff, DEFAULT_ATTEMPTS};
use aqar_state::Contract;

use crate::context::ServiceContext;

pub struct ContractService {
    ctx: ServiceContext,
}

impl ContractService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Draft a contract from an approved reservation form.
    pub async fn draft(
        &self,
        reservation_form_id: ReservationFormId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<Contract> {
        let now = self.ctx.clock.now();
        let reservation = self.ctx.store.get_reservation(reservation_form_id).await?;
        let id = ContractId::new(self.ctx.next_id(EntityFamily::Contract).await?);
        let contract = Contract::draft(id, &reservation, actor, role, now)?;
        self.ctx.store.insert_contract(contract.clone()).await?;
        tracing::info!(contract = %id, reservation = %reservation_form_id, "contract drafted");
        self.ctx
            .emit(EntityFamily::Contract, id.as_i64(), "draft_contract", now)
            .await;
        Ok(contract)
    }

    pub async fn submit(&self, id: ContractId, actor: UserId, role: Role) -> DomainResult<Contract> {
        self.apply(id, "submit_contract", |c, at| c.submit(actor, role, at)).await
    }

    pub async fn cm_approve(
        &self,
        id: ContractId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<Contract> {
        self.apply(id, "cm_approve", |c, at| c.cm_approve(actor, role, at)).await
    }

    pub async fn tm_approve(
        &self,
        id: ContractId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<Contract> {
        self.apply(id, "tm_approve", |c, at| c.tm_approve(actor, role, at)).await
    }

    pub async fn reject(&self, id: ContractId, actor: UserId, role: Role) -> DomainResult<Contract> {
        self.apply(id, "reject_contract", |c, at| c.reject(actor, role, at)).await
    }

    /// Execute the signed contract and mark the unit contracted.
    pub async fn execute(
        &self,
        id: ContractId,
        actor: UserId,
        role: Role,
    ) -> DomainResult<Contract> {
        let contract = self
            .apply(id, "execute_contract", |c, at| c.execute(actor, role, at))
            .await?;
        self.seal_unit(&contract).await?;
        Ok(contract)
    }

    pub async fn get(&self, id: ContractId) -> DomainResult<Contract> {
        self.ctx.store.get_contract(id).await
    }

    async fn seal_unit(&self, contract: &Contract) -> DomainResult<()> {
        let reservation = self
            .ctx
            .store
            .get_reservation(contract.reservation_form_id)
            .await?;
        let deal = self.ctx.store.get_deal(reservation.deal_id).await?;
        let Some(unit_id) = deal.unit_id else {
            return Ok(());
        };
        retry_with_backoff("mark_contracted", DEFAULT_ATTEMPTS, || async {
            let mut unit = self.ctx.store.get_unit(unit_id).await?;
            let read_version = unit.version;
            unit.mark_contracted()?;
            self.ctx.store.update_unit(unit, read_version).await
        })
        .await?;
        Ok(())
    }

    async fn apply<F>(&self, id: ContractId, action: &'static str, f: F) -> DomainResult<Contract>
    where
        F: Fn(&mut Contract, Timestamp) -> DomainResult<()>,
    {
        let now = self.ctx.clock.now();
        let updated = retry_with_backoff(action, DEFAULT_ATTEMPTS, || async {
            let mut contract = self.ctx.store.get_contract(id).await?;
            let read_version = contract.version;
            f(&mut contract, now)?;
            self.ctx.store.update_contract(contract, read_version).await
        })
        .await?;
        self.ctx.emit(EntityFamily::Contract, id.as_i64(), action, now).await;
        Ok(updated)
    }
}
