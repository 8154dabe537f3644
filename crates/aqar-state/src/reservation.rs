//! # Reservation Form
//!
//! The financial-admin document binding an approved deal to a reservation
//! date and a preliminary payment. It cannot exist without an approved
//! deal whose plan either passed evaluation or carries a fully TM-approved
//! override.
//!
//! The down-payment breakdown is recomputed from its parts on every edit;
//! the `remaining` figure is never stored independently of the others.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use aqar_core::{
    DomainError, DomainResult, EntityFamily, Language, Money, PaymentPlanId, ReservationFormId,
    Role, Timestamp, UserId,
};

use crate::audit::AuditRecord;
use crate::deal::{Deal, DealStatus, OverrideState};

/// Lifecycle status of a reservation form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    PendingApproval,
    Approved,
    Rejected,
    Cancelled,
}

impl ReservationStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Down-payment breakdown shown on the form and on the contract.
///
/// `remaining = total - paid_amount`; the preliminary payment is part of
/// the paid figure once collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DpBreakdown {
    pub total: Money,
    pub preliminary_amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preliminary_date: Option<NaiveDate>,
    pub paid_amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<NaiveDate>,
    pub remaining: Money,
}

impl DpBreakdown {
    /// Build a breakdown with the remainder derived, not trusted.
    pub fn new(
        total: Money,
        preliminary_amount: Money,
        preliminary_date: Option<NaiveDate>,
        paid_amount: Money,
        paid_date: Option<NaiveDate>,
    ) -> DomainResult<Self> {
        if preliminary_amount.is_negative() || paid_amount.is_negative() {
            return Err(DomainError::validation(
                "dp",
                "payment figures must be non-negative",
            ));
        }
        if paid_amount > total {
            return Err(DomainError::validation(
                "dp.paid_amount",
                "paid amount cannot exceed the down-payment total",
            ));
        }
        Ok(Self {
            total: total.rounded(),
            preliminary_amount: preliminary_amount.rounded(),
            preliminary_date,
            paid_amount: paid_amount.rounded(),
            paid_date,
            remaining: (total - paid_amount).rounded(),
        })
    }

    /// Record a collected payment and rederive the remainder.
    pub fn record_payment(&mut self, amount: Money, on: NaiveDate) -> DomainResult<()> {
        let paid = self.paid_amount + amount;
        if paid > self.total {
            return Err(DomainError::validation(
                "dp.paid_amount",
                "paid amount cannot exceed the down-payment total",
            ));
        }
        self.paid_amount = paid.rounded();
        self.paid_date = Some(on);
        self.remaining = (self.total - self.paid_amount).rounded();
        Ok(())
    }
}

/// The reservation form entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationForm {
    pub id: ReservationFormId,
    pub deal_id: aqar_core::DealId,
    pub payment_plan_id: PaymentPlanId,
    pub status: ReservationStatus,
    pub reservation_date: NaiveDate,
    pub preliminary_payment: Money,
    pub dp: DpBreakdown,
    pub language: Language,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<Timestamp>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub history: Vec<AuditRecord>,
}

impl ReservationForm {
    /// Open a form against an approved deal. Financial admin only.
    ///
    /// Guards: the deal must be `APPROVED` with a plan attached; a deal
    /// flagged for override must carry the full TM approval.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: ReservationFormId,
        deal: &Deal,
        payment_plan_id: PaymentPlanId,
        reservation_date: NaiveDate,
        dp: DpBreakdown,
        actor: UserId,
        role: Role,
        at: Timestamp,
    ) -> DomainResult<Self> {
        if role != Role::FinancialAdmin {
            return Err(DomainError::ForbiddenRole {
                role: role.to_string(),
                action: "create_reservation".to_string(),
            });
        }
        if deal.status != DealStatus::Approved || deal.calculator_snapshot.is_none() {
            return Err(DomainError::InvalidTransition {
                entity: "reservation_form",
                from: deal.status.name().to_string(),
                event: "create_reservation".to_string(),
            });
        }
        if deal.needs_override && deal.override_state != OverrideState::TmApproved {
            return Err(DomainError::InvalidTransition {
                entity: "reservation_form",
                from: format!("override:{}", deal.override_state.name()),
                event: "create_reservation".to_string(),
            });
        }
        let preliminary_payment = dp.preliminary_amount;
        let mut form = Self {
            id,
            deal_id: deal.id,
            payment_plan_id,
            status: ReservationStatus::PendingApproval,
            reservation_date,
            preliminary_payment,
            dp,
            language: deal.language,
            created_at: at,
            reviewed_by: None,
            reviewed_at: None,
            version: 0,
            history: Vec::new(),
        };
        form.log("create_reservation", actor, role, at);
        Ok(form)
    }

    /// Financial-manager approval.
    pub fn approve(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        self.review("approve_reservation", ReservationStatus::Approved, actor, role, at)
    }

    /// Financial-manager rejection.
    pub fn reject(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        self.review("reject_reservation", ReservationStatus::Rejected, actor, role, at)
    }

    /// Cancel a form that has not been decided.
    pub fn cancel(&mut self, actor: UserId, role: Role, at: Timestamp) -> DomainResult<()> {
        if !matches!(role, Role::FinancialAdmin | Role::Admin) {
            return Err(DomainError::ForbiddenRole {
                role: role.to_string(),
                action: "cancel_reservation".to_string(),
            });
        }
        if self.status != ReservationStatus::PendingApproval {
            return Err(self.invalid("cancel_reservation"));
        }
        self.status = ReservationStatus::Cancelled;
        self.log("cancel_reservation", actor, role, at);
        Ok(())
    }

    /// Record a collected down-payment instalment. Terminal forms no
    /// longer take money.
    pub fn record_dp_payment(&mut self, amount: Money, on: NaiveDate) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(self.invalid("record_dp_payment"));
        }
        self.dp.record_payment(amount, on)
    }

    fn review(
        &mut self,
        action: &str,
        to: ReservationStatus,
        actor: UserId,
        role: Role,
        at: Timestamp,
    ) -> DomainResult<()> {
        if role != Role::FinancialManager {
            return Err(DomainError::ForbiddenRole {
                role: role.to_string(),
                action: action.to_string(),
            });
        }
        if self.status != ReservationStatus::PendingApproval {
            return Err(self.invalid(action));
        }
        self.status = to;
        self.reviewed_by = Some(actor);
        self.reviewed_at = Some(at);
        self.log(action, actor, role, at);
        Ok(())
    }

    fn invalid(&self, event: &str) -> DomainError {
        DomainError::InvalidTransition {
            entity: "reservation_form",
            from: self.status.name().to_string(),
            event: event.to_string(),
        }
    }

    fn log(&mut self, action: &str, actor: UserId, role: Role, at: Timestamp) {
        self.history.push(AuditRecord::event(
            EntityFamily::ReservationForm,
            self.id.as_i64(),
            action,
            actor,
            role,
            at,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::{CalculatorSnapshot, Deal};
    use aqar_core::{DealId, UnitId};
    use aqar_pricing::{
        build_plan, AcceptanceThresholds, CustomPlanInputs, DpType, Frequency, Mode, StandardPlan,
    };
    use rust_decimal_macros::dec;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(secs).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    fn approved_deal() -> Deal {
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
        let mut deal = Deal::draft(DealId::new(1), UserId::new(10), Language::Ar, ts(0));
        deal.attach_plan(
            CalculatorSnapshot {
                std_plan,
                inputs,
                result,
            },
            Some(UnitId::new(5)),
        )
        .unwrap();
        deal.submit(UserId::new(10), Role::Consultant, ts(1)).unwrap();
        deal.approve_sm(UserId::new(20), Role::SalesManager, ts(2)).unwrap();
        deal
    }

    fn dp() -> DpBreakdown {
        DpBreakdown::new(
            Money::from_major(200_000),
            Money::from_major(20_000),
            Some(date(1)),
            Money::from_major(20_000),
            Some(date(1)),
        )
        .unwrap()
    }

    fn create_form(deal: &Deal) -> DomainResult<ReservationForm> {
        ReservationForm::create(
            ReservationFormId::new(1),
            deal,
            PaymentPlanId::new(7),
            date(2),
            dp(),
            UserId::new(30),
            Role::FinancialAdmin,
            ts(3),
        )
    }

    #[test]
    fn test_create_against_approved_deal() {
        let form = create_form(&approved_deal()).unwrap();
        assert_eq!(form.status, ReservationStatus::PendingApproval);
        assert_eq!(form.preliminary_payment, Money::from_major(20_000));
        assert_eq!(form.language, Language::Ar);
        assert_eq!(form.history.len(), 1);
    }

    #[test]
    fn test_create_requires_approved_deal() {
        let mut deal = approved_deal();
        deal.status = DealStatus::PendingApproval;
        let err = create_form(&deal).unwrap_err();
        assert_eq!(err.kind(), aqar_core::ErrorKind::InvalidTransition);
    }

    #[test]
    fn test_create_requires_financial_admin() {
        let deal = approved_deal();
        let err = ReservationForm::create(
            ReservationFormId::new(1),
            &deal,
            PaymentPlanId::new(7),
            date(2),
            dp(),
            UserId::new(30),
            Role::Consultant,
            ts(3),
        )
        .unwrap_err();
        assert_eq!(err.kind(), aqar_core::ErrorKind::ForbiddenRole);
    }

    #[test]
    fn test_pending_override_blocks_reservation() {
        let mut deal = approved_deal();
        deal.needs_override = true;
        // Override never completed.
        let err = create_form(&deal).unwrap_err();
        assert_eq!(err.kind(), aqar_core::ErrorKind::InvalidTransition);
    }

    #[test]
    fn test_completed_override_permits_reservation() {
        let mut deal = approved_deal();
        deal.needs_override = true;
        deal.override_state = OverrideState::TmApproved;
        assert!(create_form(&deal).is_ok());
    }

    #[test]
    fn test_fm_approves_then_terminal() {
        let mut form = create_form(&approved_deal()).unwrap();
        form.approve(UserId::new(40), Role::FinancialManager, ts(4)).unwrap();
        assert_eq!(form.status, ReservationStatus::Approved);
        assert_eq!(form.reviewed_by, Some(UserId::new(40)));
        let err = form.reject(UserId::new(40), Role::FinancialManager, ts(5)).unwrap_err();
        assert_eq!(err.kind(), aqar_core::ErrorKind::InvalidTransition);
    }

    #[test]
    fn test_only_fm_reviews() {
        let mut form = create_form(&approved_deal()).unwrap();
        let err = form.approve(UserId::new(30), Role::FinancialAdmin, ts(4)).unwrap_err();
        assert_eq!(err.kind(), aqar_core::ErrorKind::ForbiddenRole);
    }

    #[test]
    fn test_terminal_form_takes_no_payments() {
        let mut form = create_form(&approved_deal()).unwrap();
        form.cancel(UserId::new(30), Role::FinancialAdmin, ts(4)).unwrap();
        let before = form.dp.clone();
        let err = form
            .record_dp_payment(Money::from_major(70_000), date(10))
            .unwrap_err();
        assert_eq!(err.kind(), aqar_core::ErrorKind::InvalidTransition);
        assert_eq!(form.dp, before);

        // An approved form still takes the remainder.
        let mut form = create_form(&approved_deal()).unwrap();
        form.approve(UserId::new(40), Role::FinancialManager, ts(4)).unwrap();
        form.record_dp_payment(Money::from_major(70_000), date(10)).unwrap();
        assert_eq!(form.dp.paid_amount, Money::from_major(90_000));
    }

    #[test]
    fn test_dp_breakdown_derives_remaining() {
        let mut b = DpBreakdown::new(
            Money::from_major(200_000),
            Money::from_major(20_000),
            Some(date(1)),
            Money::from_major(20_000),
            Some(date(1)),
        )
        .unwrap();
        assert_eq!(b.remaining, Money::from_major(180_000));

        b.record_payment(Money::from_major(80_000), date(10)).unwrap();
        assert_eq!(b.paid_amount, Money::from_major(100_000));
        assert_eq!(b.remaining, Money::from_major(100_000));
        assert_eq!(b.paid_date, Some(date(10)));

        // Overpayment is rejected and leaves the breakdown unchanged.
        assert!(b.record_payment(Money::from_major(150_000), date(11)).is_err());
        assert_eq!(b.paid_amount, Money::from_major(100_000));
    }
}
