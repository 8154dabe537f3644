//! # History Reconciliation
//!
//! A crash between a state write and its history append leaves an entity
//! whose stamps (review fields, approval lists, execution time) have no
//! matching audit row. The reconciler detects those gaps and back-fills
//! rows flagged `reconciled`, attributed to the system actor. It never
//! removes or edits existing rows; back-filled rows are merged in
//! timestamp order so the monotonic-history invariant keeps holding.

use aqar_core::{ContractId, DealId, DomainResult, EntityFamily, ReservationFormId, Role};
use aqar_ports::{retry_with_backoff, DEFAULT_ATTEMPTS};
use aqar_state::{AuditRecord, Contract, ContractStatus, Deal, DealStatus, ReservationForm, ReservationStatus};

use crate::context::ServiceContext;

/// Rows a deal's stamps imply but its history lacks.
pub fn missing_deal_rows(deal: &Deal) -> Vec<AuditRecord> {
    let mut missing = Vec::new();
    let has = |action: &str| deal.history.iter().any(|r| r.action == action);
    let entity_id = deal.id.as_i64();

    if let Some(review) = deal.manager_review {
        let action = match deal.status {
            DealStatus::Rejected => "reject_sm",
            _ => "approve_sm",
        };
        if !has(action) {
            missing.push(AuditRecord::reconciled(
                EntityFamily::Deal,
                entity_id,
                action,
                review.at,
            ));
        }
    }
    if let Some(at) = deal.override_requested_at {
        if !has("request_override") {
            missing.push(AuditRecord::reconciled(
                EntityFamily::Deal,
                entity_id,
                "request_override",
                at,
            ));
        }
    }
    for (review, action) in [
        (deal.override_sm_review, "override_sm_approve"),
        (deal.override_fm_review, "override_fm_approve"),
        (deal.override_tm_review, "override_tm_approve"),
    ] {
        if let Some(review) = review {
            if !has(action) {
                missing.push(AuditRecord::reconciled(
                    EntityFamily::Deal,
                    entity_id,
                    action,
                    review.at,
                ));
            }
        }
    }
    missing
}

/// Rows a reservation form's stamps imply but its history lacks.
pub fn missing_reservation_rows(form: &ReservationForm) -> Vec<AuditRecord> {
    let mut missing = Vec::new();
    let has = |action: &str| form.history.iter().any(|r| r.action == action);
    let entity_id = form.id.as_i64();

    if !has("create_reservation") {
        missing.push(AuditRecord::reconciled(
            EntityFamily::ReservationForm,
            entity_id,
            "create_reservation",
            form.created_at,
        ));
    }
    if let Some(at) = form.reviewed_at {
        let action = match form.status {
            ReservationStatus::Rejected => "reject_reservation",
            _ => "approve_reservation",
        };
        if !has(action) {
            missing.push(AuditRecord::reconciled(
                EntityFamily::ReservationForm,
                entity_id,
                action,
                at,
            ));
        }
    }
    missing
}

/// Rows a contract's stamps imply but its history lacks.
pub fn missing_contract_rows(contract: &Contract) -> Vec<AuditRecord> {
    let mut missing = Vec::new();
    let has = |action: &str| contract.history.iter().any(|r| r.action == action);
    let entity_id = contract.id.as_i64();

    if !has("draft_contract") {
        missing.push(AuditRecord::reconciled(
            EntityFamily::Contract,
            entity_id,
            "draft_contract",
            contract.created_at,
        ));
    }
    for approval in &contract.approvers {
        let action = if approval.role == Role::ContractManager {
            "cm_approve"
        } else {
            "tm_approve"
        };
        if !has(action) {
            missing.push(AuditRecord::reconciled(
                EntityFamily::Contract,
                entity_id,
                action,
                approval.at,
            ));
        }
    }
    if contract.status == ContractStatus::Executed {
        if let Some(at) = contract.executed_at {
            if !has("execute_contract") {
                missing.push(AuditRecord::reconciled(
                    EntityFamily::Contract,
                    entity_id,
                    "execute_contract",
                    at,
                ));
            }
        }
    }
    missing
}

/// Merge back-filled rows into a history, keeping it monotonic in `at`.
fn merge(history: &mut Vec<AuditRecord>, missing: Vec<AuditRecord>) {
    history.extend(missing);
    history.sort_by_key(|r| r.at);
}

/// Background reconciler over the snapshot store.
pub struct Reconciler {
    ctx: ServiceContext,
}

impl Reconciler {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Back-fill a deal's history. Returns how many rows were added.
    pub async fn reconcile_deal(&self, id: DealId) -> DomainResult<usize> {
        retry_with_backoff("reconcile_deal", DEFAULT_ATTEMPTS, || async {
            let mut deal = self.ctx.store.get_deal(id).await?;
            let read_version = deal.version;
            let missing = missing_deal_rows(&deal);
            if missing.is_empty() {
                return Ok(0);
            }
            let count = missing.len();
            tracing::warn!(deal = %id, count, "back-filling lost history rows");
            merge(&mut deal.history, missing);
            self.ctx.store.update_deal(deal, read_version).await?;
            Ok(count)
        })
        .await
    }

    pub async fn reconcile_reservation(&self, id: ReservationFormId) -> DomainResult<usize> {
        retry_with_backoff("reconcile_reservation", DEFAULT_ATTEMPTS, || async {
            let mut form = self.ctx.store.get_reservation(id).await?;
            let read_version = form.version;
            let missing = missing_reservation_rows(&form);
            if missing.is_empty() {
                return Ok(0);
            }
            let count = missing.len();
            tracing::warn!(form = %id, count, "back-filling lost history rows");
            merge(&mut form.history, missing);
            self.ctx.store.update_reservation(form, read_version).await?;
            Ok(count)
        })
        .await
    }

    pub async fn reconcile_contract(&self, id: ContractId) -> DomainResult<usize> {
        retry_with_backoff("reconcile_contract", DEFAULT_ATTEMPTS, || async {
            let mut contract = self.ctx.store.get_contract(id).await?;
            let read_version = contract.version;
            let missing = missing_contract_rows(&contract);
            if missing.is_empty() {
                return Ok(0);
            }
            let count = missing.len();
            tracing::warn!(contract = %id, count, "back-filling lost history rows");
            merge(&mut contract.history, missing);
            self.ctx.store.update_contract(contract, read_version).await?;
            Ok(count)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqar_core::{Language, Money, Role, Timestamp, UserId};
    use aqar_state::{is_monotonic, Review};

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(secs).unwrap()
    }

    #[test]
    fn test_intact_deal_needs_nothing() {
        let deal = Deal::draft(DealId::new(1), UserId::new(10), Language::En, ts(0));
        assert!(missing_deal_rows(&deal).is_empty());
    }

    #[test]
    fn test_lost_approval_row_is_backfilled() {
        let mut deal = Deal::draft(DealId::new(1), UserId::new(10), Language::En, ts(0));
        // Simulate a crash: the approval stamp landed, the row did not.
        deal.status = DealStatus::Approved;
        deal.manager_review = Some(Review {
            by: UserId::new(20),
            at: ts(50),
        });
        deal.history.push(AuditRecord::event(
            EntityFamily::Deal,
            1,
            "submit",
            UserId::new(10),
            Role::Consultant,
            ts(10),
        ));

        let missing = missing_deal_rows(&deal);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].action, "approve_sm");
        assert!(missing[0].reconciled);
        assert_eq!(missing[0].actor_role, Role::System);

        merge(&mut deal.history, missing);
        assert!(is_monotonic(&deal.history));
        // The original row is untouched.
        assert_eq!(deal.history[0].action, "submit");
        assert!(!deal.history[0].reconciled);
    }

    #[test]
    fn test_rejected_deal_backfills_reject_row() {
        let mut deal = Deal::draft(DealId::new(1), UserId::new(10), Language::En, ts(0));
        deal.status = DealStatus::Rejected;
        deal.manager_review = Some(Review {
            by: UserId::new(20),
            at: ts(50),
        });
        let missing = missing_deal_rows(&deal);
        assert_eq!(missing[0].action, "reject_sm");
    }

    #[test]
    fn test_backfill_is_idempotent() {
        let mut deal = Deal::draft(DealId::new(1), UserId::new(10), Language::En, ts(0));
        deal.status = DealStatus::Approved;
        deal.manager_review = Some(Review {
            by: UserId::new(20),
            at: ts(50),
        });
        let missing = missing_deal_rows(&deal);
        merge(&mut deal.history, missing);
        // A second pass finds the reconciled row and adds nothing.
        assert!(missing_deal_rows(&deal).is_empty());
    }

    #[test]
    fn test_contract_execution_row_backfilled() {
        use aqar_core::{PaymentPlanId, ReservationFormId};
        use aqar_state::DpBreakdown;
        use chrono::NaiveDate;

        let form = ReservationForm {
            id: ReservationFormId::new(3),
            deal_id: DealId::new(1),
            payment_plan_id: PaymentPlanId::new(7),
            status: ReservationStatus::Approved,
            reservation_date: NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
            preliminary_payment: Money::from_major(20_000),
            dp: DpBreakdown::new(
                Money::from_major(200_000),
                Money::from_major(20_000),
                None,
                Money::from_major(20_000),
                None,
            )
            .unwrap(),
            language: Language::En,
            created_at: ts(0),
            reviewed_by: Some(UserId::new(40)),
            reviewed_at: Some(ts(1)),
            version: 1,
            history: Vec::new(),
        };
        let mut contract = Contract::draft(
            ContractId::new(9),
            &form,
            UserId::new(50),
            Role::ContractAdmin,
            ts(2),
        )
        .unwrap();
        contract.status = ContractStatus::Executed;
        contract.executed_at = Some(ts(9));

        let missing = missing_contract_rows(&contract);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].action, "execute_contract");
        assert_eq!(missing[0].at, ts(9));
    }

    #[test]
    fn test_reservation_creation_row_backfilled() {
        let form = ReservationForm {
            id: ReservationFormId::new(3),
            deal_id: DealId::new(1),
            payment_plan_id: aqar_core::PaymentPlanId::new(7),
            status: ReservationStatus::PendingApproval,
            reservation_date: chrono::NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
            preliminary_payment: Money::from_major(20_000),
            dp: aqar_state::DpBreakdown::new(
                Money::from_major(200_000),
                Money::from_major(20_000),
                None,
                Money::from_major(20_000),
                None,
            )
            .unwrap(),
            language: Language::En,
            created_at: ts(4),
            reviewed_by: None,
            reviewed_at: None,
            version: 0,
            history: Vec::new(),
        };
        let missing = missing_reservation_rows(&form);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].action, "create_reservation");
    }
}
