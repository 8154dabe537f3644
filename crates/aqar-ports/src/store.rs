//! # Snapshot Store Port
//!
//! CRUD over the workflow entities with optimistic-version updates. Every
//! update names the version it read; a stale version fails `CONFLICT` and
//! the use-case layer re-reads and retries, bounded.
//!
//! The store also owns the one conditional write in the system:
//! committing a block approval succeeds only while no other approved,
//! unexpired block exists for the same unit. That check and the write are
//! atomic inside the adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use aqar_core::{
    ContractId, DealId, DomainError, DomainResult, ReservationFormId, Timestamp, UnitBlockId,
    UnitId,
};
use aqar_state::{BlockStatus, Contract, Deal, ReservationForm, Unit, UnitBlock};

/// Persistence boundary of the workflow.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    // ── Deals ────────────────────────────────────────────────────────
    async fn insert_deal(&self, deal: Deal) -> DomainResult<()>;
    async fn get_deal(&self, id: DealId) -> DomainResult<Deal>;
    /// Write back a deal read at `expected_version`. Returns the stored
    /// copy with its version bumped.
    async fn update_deal(&self, deal: Deal, expected_version: u64) -> DomainResult<Deal>;

    // ── Reservation forms ────────────────────────────────────────────
    async fn insert_reservation(&self, form: ReservationForm) -> DomainResult<()>;
    async fn get_reservation(&self, id: ReservationFormId) -> DomainResult<ReservationForm>;
    async fn update_reservation(
        &self,
        form: ReservationForm,
        expected_version: u64,
    ) -> DomainResult<ReservationForm>;

    // ── Contracts ────────────────────────────────────────────────────
    async fn insert_contract(&self, contract: Contract) -> DomainResult<()>;
    async fn get_contract(&self, id: ContractId) -> DomainResult<Contract>;
    async fn update_contract(
        &self,
        contract: Contract,
        expected_version: u64,
    ) -> DomainResult<Contract>;

    // ── Units ────────────────────────────────────────────────────────
    async fn insert_unit(&self, unit: Unit) -> DomainResult<()>;
    async fn get_unit(&self, id: UnitId) -> DomainResult<Unit>;
    async fn update_unit(&self, unit: Unit, expected_version: u64) -> DomainResult<Unit>;

    // ── Unit blocks ──────────────────────────────────────────────────
    async fn insert_block(&self, block: UnitBlock) -> DomainResult<()>;
    async fn get_block(&self, id: UnitBlockId) -> DomainResult<UnitBlock>;
    /// Plain versioned write for non-approval block transitions.
    async fn update_block(
        &self,
        block: UnitBlock,
        expected_version: u64,
    ) -> DomainResult<UnitBlock>;
    /// Conditional write for the approval transition: persists only while
    /// no other approved, unexpired block exists for the same unit.
    async fn commit_block_approval(
        &self,
        block: UnitBlock,
        expected_version: u64,
        now: Timestamp,
    ) -> DomainResult<UnitBlock>;
    /// All blocks for one unit, any status.
    async fn blocks_for_unit(&self, unit_id: UnitId) -> DomainResult<Vec<UnitBlock>>;
    /// All blocks whose stored status is APPROVED, for the expiry sweep.
    async fn approved_blocks(&self) -> DomainResult<Vec<UnitBlock>>;
}

/// HashMap-backed store for tests and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    deals: RwLock<HashMap<i64, Deal>>,
    reservations: RwLock<HashMap<i64, ReservationForm>>,
    contracts: RwLock<HashMap<i64, Contract>>,
    units: RwLock<HashMap<i64, Unit>>,
    blocks: RwLock<HashMap<i64, UnitBlock>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(entity: &'static str, id: i64) -> DomainError {
    DomainError::NotFound { entity, id }
}

fn conflict(entity: &'static str, id: i64) -> DomainError {
    DomainError::Conflict { entity, id }
}

#[async_trait]
impl SnapshotStore for InMemoryStore {
    async fn insert_deal(&self, deal: Deal) -> DomainResult<()> {
        self.deals.write().await.insert(deal.id.as_i64(), deal);
        Ok(())
    }

    async fn get_deal(&self, id: DealId) -> DomainResult<Deal> {
        self.deals
            .read()
            .await
            .get(&id.as_i64())
            .cloned()
            .ok_or_else(|| not_found("deal", id.as_i64()))
    }

    async fn update_deal(&self, mut deal: Deal, expected_version: u64) -> DomainResult<Deal> {
        let mut deals = self.deals.write().await;
        let stored = deals
            .get(&deal.id.as_i64())
            .ok_or_else(|| not_found("deal", deal.id.as_i64()))?;
        if stored.version != expected_version {
            return Err(conflict("deal", deal.id.as_i64()));
        }
        deal.version = expected_version + 1;
        deals.insert(deal.id.as_i64(), deal.clone());
        Ok(deal)
    }

    async fn insert_reservation(&self, form: ReservationForm) -> DomainResult<()> {
        self.reservations.write().await.insert(form.id.as_i64(), form);
        Ok(())
    }

    async fn get_reservation(&self, id: ReservationFormId) -> DomainResult<ReservationForm> {
        self.reservations
            .read()
            .await
            .get(&id.as_i64())
            .cloned()
            .ok_or_else(|| not_found("reservation_form", id.as_i64()))
    }

    async fn update_reservation(
        &self,
        mut form: ReservationForm,
        expected_version: u64,
    ) -> DomainResult<ReservationForm> {
        let mut forms = self.reservations.write().await;
        let stored = forms
            .get(&form.id.as_i64())
            .ok_or_else(|| not_found("reservation_form", form.id.as_i64()))?;
        if stored.version != expected_version {
            return Err(conflict("reservation_form", form.id.as_i64()));
        }
        form.version = expected_version + 1;
        forms.insert(form.id.as_i64(), form.clone());
        Ok(form)
    }

    async fn insert_contract(&self, contract: Contract) -> DomainResult<()> {
        self.contracts
            .write()
            .await
            .insert(contract.id.as_i64(), contract);
        Ok(())
    }

    async fn get_contract(&self, id: ContractId) -> DomainResult<Contract> {
        self.contracts
            .read()
            .await
            .get(&id.as_i64())
            .cloned()
            .ok_or_else(|| not_found("contract", id.as_i64()))
    }

    async fn update_contract(
        &self,
        mut contract: Contract,
        expected_version: u64,
    ) -> DomainResult<Contract> {
        let mut contracts = self.contracts.write().await;
        let stored = contracts
            .get(&contract.id.as_i64())
            .ok_or_else(|| not_found("contract", contract.id.as_i64()))?;
        if stored.version != expected_version {
            return Err(conflict("contract", contract.id.as_i64()));
        }
        contract.version = expected_version + 1;
        contracts.insert(contract.id.as_i64(), contract.clone());
        Ok(contract)
    }

    async fn insert_unit(&self, unit: Unit) -> DomainResult<()> {
        self.units.write().await.insert(unit.id.as_i64(), unit);
        Ok(())
    }

    async fn get_unit(&self, id: UnitId) -> DomainResult<Unit> {
        self.units
            .read()
            .await
            .get(&id.as_i64())
            .cloned()
            .ok_or_else(|| not_found("unit", id.as_i64()))
    }

    async fn update_unit(&self, mut unit: Unit, expected_version: u64) -> DomainResult<Unit> {
        let mut units = self.units.write().await;
        let stored = units
            .get(&unit.id.as_i64())
            .ok_or_else(|| not_found("unit", unit.id.as_i64()))?;
        if stored.version != expected_version {
            return Err(conflict("unit", unit.id.as_i64()));
        }
        unit.version = expected_version + 1;
        units.insert(unit.id.as_i64(), unit.clone());
        Ok(unit)
    }

    async fn insert_block(&self, block: UnitBlock) -> DomainResult<()> {
        self.blocks.write().await.insert(block.id.as_i64(), block);
        Ok(())
    }

    async fn get_block(&self, id: UnitBlockId) -> DomainResult<UnitBlock> {
        self.blocks
            .read()
            .await
            .get(&id.as_i64())
            .cloned()
            .ok_or_else(|| not_found("unit_block", id.as_i64()))
    }

    async fn update_block(
        &self,
        mut block: UnitBlock,
        expected_version: u64,
    ) -> DomainResult<UnitBlock> {
        let mut blocks = self.blocks.write().await;
        let stored = blocks
            .get(&block.id.as_i64())
            .ok_or_else(|| not_found("unit_block", block.id.as_i64()))?;
        if stored.version != expected_version {
            return Err(conflict("unit_block", block.id.as_i64()));
        }
        block.version = expected_version + 1;
        blocks.insert(block.id.as_i64(), block.clone());
        Ok(block)
    }

    async fn commit_block_approval(
        &self,
        mut block: UnitBlock,
        expected_version: u64,
        now: Timestamp,
    ) -> DomainResult<UnitBlock> {
        let mut blocks = self.blocks.write().await;
        let stored = blocks
            .get(&block.id.as_i64())
            .ok_or_else(|| not_found("unit_block", block.id.as_i64()))?;
        if stored.version != expected_version {
            return Err(conflict("unit_block", block.id.as_i64()));
        }
        // The uniqueness condition: at most one live hold per unit.
        let holder = blocks.values().find(|b| {
            b.unit_id == block.unit_id && b.id != block.id && b.is_active(now)
        });
        if let Some(holder) = holder {
            return Err(conflict("unit_block", holder.id.as_i64()));
        }
        block.version = expected_version + 1;
        blocks.insert(block.id.as_i64(), block.clone());
        Ok(block)
    }

    async fn blocks_for_unit(&self, unit_id: UnitId) -> DomainResult<Vec<UnitBlock>> {
        Ok(self
            .blocks
            .read()
            .await
            .values()
            .filter(|b| b.unit_id == unit_id)
            .cloned()
            .collect())
    }

    async fn approved_blocks(&self) -> DomainResult<Vec<UnitBlock>> {
        Ok(self
            .blocks
            .read()
            .await
            .values()
            .filter(|b| b.status == BlockStatus::Approved)
            .cloned()
            .collect())
    }
}
