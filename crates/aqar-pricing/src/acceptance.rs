//! # Acceptance Evaluator
//!
//! A custom plan is accepted when its present value meets the standard PV
//! and every configured ratio condition passes. Thresholds are maintained
//! by top management; an absent bound leaves that side unbounded, and a
//! dimension with neither bound always passes.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use aqar_core::Money;

use crate::schedule::{nominal_excl_maintenance, PaymentKind, ScheduleEntry};

/// TM-approved ratio thresholds, percentages of the nominal total
/// excluding maintenance and garage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceThresholds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_year_percent_min: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_year_percent_max: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_year_percent_min: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_year_percent_max: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handover_percent_min: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handover_percent_max: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dp_percent_min: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dp_percent_max: Option<Decimal>,
}

/// Final verdict of the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accept,
    Reject,
}

/// The PV gate of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvCheck {
    pub proposed_pv: Money,
    pub standard_pv: Money,
    /// `proposed - standard`, rounded.
    pub difference: Money,
    pub pass: bool,
}

/// One ratio condition with its measured value and verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub name: String,
    /// Measured percentage of the nominal total.
    pub value_percent: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Decimal>,
    pub pass: bool,
}

/// Structured acceptance decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub decision: Decision,
    pub pv: PvCheck,
    pub conditions: Vec<Condition>,
}

impl Evaluation {
    pub fn is_accepted(&self) -> bool {
        self.decision == Decision::Accept
    }
}

fn check(name: &str, value: Decimal, min: Option<Decimal>, max: Option<Decimal>) -> Condition {
    let pass = min.map_or(true, |lo| value >= lo) && max.map_or(true, |hi| value <= hi);
    Condition {
        name: name.to_owned(),
        value_percent: value.round_dp(4),
        min,
        max,
        pass,
    }
}

fn ratio(part: Money, whole: Money) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part.amount() / whole.amount() * dec!(100)
}

/// Evaluate a built schedule against the standard PV and the active
/// thresholds.
///
/// Ratio numerators: `dpPercent` counts entries tagged `dp`; `firstYear%`
/// counts all PV-relevant cash in months 0..=12 (the down payment
/// included); `secondYear%` months 13..=24; `handover%` the handover lump
/// alone.
pub fn evaluate(
    entries: &[ScheduleEntry],
    proposed_pv: Money,
    standard_pv: Money,
    thresholds: &AcceptanceThresholds,
) -> Evaluation {
    let nominal = nominal_excl_maintenance(entries);

    let dp_cash: Money = entries
        .iter()
        .filter(|e| e.kind == PaymentKind::Dp)
        .map(|e| e.amount)
        .sum();
    let first_year_cash: Money = entries
        .iter()
        .filter(|e| e.kind.counts_toward_pv() && e.month_offset <= 12)
        .map(|e| e.amount)
        .sum();
    let second_year_cash: Money = entries
        .iter()
        .filter(|e| e.kind.counts_toward_pv() && e.month_offset > 12 && e.month_offset <= 24)
        .map(|e| e.amount)
        .sum();
    let handover_cash: Money = entries
        .iter()
        .filter(|e| e.kind == PaymentKind::Handover)
        .map(|e| e.amount)
        .sum();

    let conditions = vec![
        check(
            "firstYearPercent",
            ratio(first_year_cash, nominal),
            thresholds.first_year_percent_min,
            thresholds.first_year_percent_max,
        ),
        check(
            "secondYearPercent",
            ratio(second_year_cash, nominal),
            thresholds.second_year_percent_min,
            thresholds.second_year_percent_max,
        ),
        check(
            "handoverPercent",
            ratio(handover_cash, nominal),
            thresholds.handover_percent_min,
            thresholds.handover_percent_max,
        ),
        check(
            "dpPercent",
            ratio(dp_cash, nominal),
            thresholds.dp_percent_min,
            thresholds.dp_percent_max,
        ),
    ];

    let pv_pass = proposed_pv >= standard_pv;
    let pv = PvCheck {
        proposed_pv: proposed_pv.rounded(),
        standard_pv: standard_pv.rounded(),
        difference: (proposed_pv - standard_pv).rounded(),
        pass: pv_pass,
    };

    let decision = if pv_pass && conditions.iter().all(|c| c.pass) {
        Decision::Accept
    } else {
        Decision::Reject
    };

    Evaluation {
        decision,
        pv,
        conditions,
    }
}
