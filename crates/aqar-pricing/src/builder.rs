//! # Custom-Plan Builder
//!
//! Produces the nominal schedule for a custom plan across the five
//! calculation modes, then evaluates acceptance (or back-solves the
//! nominal total in the target-PV modes).
//!
//! ## Anchoring
//!
//! - Down payment at month 0.
//! - Split first-year payments at their declared months (1..=12).
//! - Subsequent-year block `k` partitions its nominal evenly within year
//!   `k + 2` at its declared frequency.
//! - Handover lump at `handover_year * 12` (a zero-amount marker entry is
//!   still emitted so documents can show the handover point).
//! - Equal installments fill the periods strictly after the last nonzero
//!   anchor through the end of the tenure, stepping by the global
//!   frequency.
//! - Maintenance and garage are appended at their date or month offset
//!   (defaulting to handover) and stay outside PV and ratios.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use aqar_core::{DomainError, DomainResult, Money};

use crate::acceptance::{self, AcceptanceThresholds, Decision, Evaluation};
use crate::inputs::{CustomPlanInputs, DpType, FirstYearKind, Mode};
use crate::schedule::{
    self, finalize_order, resolve_dates, PaymentKind, ScheduleEntry,
};
use crate::solver::{self, DEFAULT_SCALE_CAP};
use crate::standard::StandardPlan;

/// Nominal totals of a built schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub nominal_excl_maintenance: Money,
    pub nominal_incl_maintenance: Money,
}

/// Calculation metadata echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMeta {
    /// Annual rate actually used, percent.
    pub rate_used_percent: Decimal,
    /// List price after the sales discount.
    pub effective_list_price: Money,
    /// Benchmark PV the plan was measured against.
    pub standard_pv: Money,
    /// Applied scale factor in target-PV modes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_factor: Option<Decimal>,
    /// Plan tenure in years after mode policy is applied.
    pub effective_duration_years: u32,
}

/// The full result of a plan calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub schedule: Vec<ScheduleEntry>,
    pub totals: Totals,
    pub computed_pv: Money,
    pub evaluation: Evaluation,
    /// Set when the decision is REJECT, or when a sales discount is
    /// applied under the fixed standard policy.
    pub needs_override: bool,
    pub meta: PlanMeta,
}

// Fixed standard-policy constants: 20% DP, 15% per year over years 1-3
// paid quarterly, remainder equally over years 4-6, handover at year 3.
const STD_DP_PERCENT: Decimal = dec!(20);
const STD_QUARTER_PERCENT: Decimal = dec!(3.75);
const STD_DURATION_YEARS: u32 = 6;
const STD_ANCHORED_YEARS: u32 = 3;
const STD_HANDOVER_YEAR: u32 = 3;

/// Build and evaluate a plan in the requested mode.
pub fn build_plan(
    std_plan: &StandardPlan,
    inputs: &CustomPlanInputs,
    thresholds: &AcceptanceThresholds,
) -> DomainResult<PlanResult> {
    inputs.validate()?;

    let standard_pv = std_plan.standard_pv()?;
    let monthly_rate = std_plan.effective_monthly_rate();
    let effective_price = effective_list_price(std_plan, inputs);

    let (mut entries, duration_years, scale_factor) = match inputs.mode {
        Mode::StandardMode => (standard_policy_entries(effective_price), STD_DURATION_YEARS, None),
        Mode::EvaluateCustomPrice | Mode::CustomYearlyThenEqual_UseStdPrice => {
            (anchored_entries(effective_price, inputs)?, inputs.duration_years, None)
        }
        Mode::CalculateForTargetPV | Mode::CustomYearlyThenEqual_TargetPV => {
            let mut entries = anchored_entries(effective_price, inputs)?;
            let scaled_kinds: &[PaymentKind] = match inputs.mode {
                Mode::CalculateForTargetPV => {
                    &[PaymentKind::Equal, PaymentKind::SubsequentYear]
                }
                _ => &[PaymentKind::Equal],
            };
            let s = solver::solve_and_apply(
                &mut entries,
                scaled_kinds,
                monthly_rate,
                standard_pv,
                DEFAULT_SCALE_CAP,
            )?;
            (entries, inputs.duration_years, Some(s))
        }
    };

    append_excluded(&mut entries, inputs)?;

    finalize_order(&mut entries);
    if let Some(base) = inputs.base_date() {
        resolve_dates(&mut entries, base)?;
    }

    let totals = Totals {
        nominal_excl_maintenance: schedule::nominal_excl_maintenance(&entries).rounded(),
        nominal_incl_maintenance: schedule::nominal_incl_maintenance(&entries).rounded(),
    };
    let computed_pv = schedule::present_value(&entries, monthly_rate);
    let evaluation = acceptance::evaluate(&entries, computed_pv, standard_pv, thresholds);
    let needs_override = evaluation.decision == Decision::Reject
        || (inputs.mode == Mode::StandardMode
            && inputs.sales_discount_percent > Decimal::ZERO);

    Ok(PlanResult {
        schedule: entries,
        totals,
        computed_pv: computed_pv.rounded(),
        evaluation,
        needs_override,
        meta: PlanMeta {
            rate_used_percent: std_plan.annual_rate_percent,
            effective_list_price: effective_price.rounded(),
            standard_pv: standard_pv.rounded(),
            scale_factor,
            effective_duration_years: duration_years,
        },
    })
}

fn effective_list_price(std_plan: &StandardPlan, inputs: &CustomPlanInputs) -> Money {
    std_plan.list_price
        * (Decimal::ONE - inputs.sales_discount_percent / dec!(100))
}

/// The fixed-policy schedule: entries sum to the effective price exactly.
fn standard_policy_entries(effective_price: Money) -> Vec<ScheduleEntry> {
    let mut entries = Vec::with_capacity(26);

    let dp = effective_price.percent_of(STD_DP_PERCENT).rounded();
    entries.push(ScheduleEntry::unsequenced("Down Payment", 0, dp, PaymentKind::Dp));

    let quarter = effective_price.percent_of(STD_QUARTER_PERCENT).rounded();
    let mut anchored_sum = dp;
    for q in 1..=(STD_ANCHORED_YEARS * 4) {
        let month = q * 3;
        let kind = if month <= 12 {
            PaymentKind::FirstYear
        } else {
            PaymentKind::SubsequentYear
        };
        entries.push(ScheduleEntry::unsequenced(
            format!("Quarterly Installment {q}"),
            month,
            quarter,
            kind,
        ));
        anchored_sum += quarter;
    }

    // Handover marker at year 3; the standard policy carries no lump.
    entries.push(ScheduleEntry::unsequenced(
        "Handover",
        STD_HANDOVER_YEAR * 12,
        Money::ZERO,
        PaymentKind::Handover,
    ));

    // Remaining 35% equally over the 12 quarters of years 4-6, the last
    // installment absorbing the rounding remainder.
    let remaining = effective_price - anchored_sum;
    let slots = (STD_DURATION_YEARS - STD_ANCHORED_YEARS) * 4;
    let per = remaining / Decimal::from(slots);
    let per = per.rounded();
    for (i, q) in (1..=slots).enumerate() {
        let month = STD_ANCHORED_YEARS * 12 + q * 3;
        let amount = if q == slots {
            remaining.split_remainder(per, slots)
        } else {
            per
        };
        entries.push(ScheduleEntry::unsequenced(
            format!("Installment {}", i + 1),
            month,
            amount,
            PaymentKind::Equal,
        ));
    }

    entries
}

/// Anchored construction shared by the custom modes.
fn anchored_entries(
    effective_price: Money,
    inputs: &CustomPlanInputs,
) -> DomainResult<Vec<ScheduleEntry>> {
    let mut entries = Vec::new();
    let mut anchored_sum = Money::ZERO;
    // Month of the latest nonzero anchored payment; the equal remainder
    // starts strictly after it.
    let mut last_anchor: u32 = 0;

    let dp = match inputs.dp_type {
        DpType::Amount => Money::new(inputs.dp_value),
        DpType::Percentage => effective_price.percent_of(inputs.dp_value),
    }
    .rounded();
    if !dp.is_zero() {
        entries.push(ScheduleEntry::unsequenced("Down Payment", 0, dp, PaymentKind::Dp));
        anchored_sum += dp;
    }

    if inputs.split_first_year {
        for payment in &inputs.first_year_payments {
            if payment.amount.is_zero() {
                continue;
            }
            let kind = match payment.kind {
                FirstYearKind::Dp => PaymentKind::Dp,
                FirstYearKind::Regular => PaymentKind::FirstYear,
            };
            entries.push(ScheduleEntry::unsequenced(
                format!("Year 1 Payment (Month {})", payment.month),
                payment.month,
                payment.amount,
                kind,
            ));
            anchored_sum += payment.amount.rounded();
            last_anchor = last_anchor.max(payment.month);
        }
    }

    for (k, block) in inputs.subsequent_years.iter().enumerate() {
        let year = k as u32 + 2;
        let parts = block.frequency.per_year();
        let step = block.frequency.step_months();
        let per = block.total_nominal.divided_by(parts)?;
        for j in 1..=parts {
            let month = (year - 1) * 12 + j * step;
            let amount = if j == parts {
                block.total_nominal.split_remainder(per, parts)
            } else {
                per
            };
            if amount.is_zero() {
                continue;
            }
            entries.push(ScheduleEntry::unsequenced(
                format!("Year {year} Installment {j}"),
                month,
                amount,
                PaymentKind::SubsequentYear,
            ));
            anchored_sum += amount;
            last_anchor = last_anchor.max(month);
        }
    }

    let handover_month = inputs.handover_year * 12;
    let lump = inputs.additional_handover_payment.rounded();
    entries.push(ScheduleEntry::unsequenced(
        "Handover",
        handover_month,
        lump,
        PaymentKind::Handover,
    ));
    if !lump.is_zero() {
        anchored_sum += lump;
        last_anchor = last_anchor.max(handover_month);
    }

    let residual = effective_price - anchored_sum;
    if residual.amount() < dec!(-0.01) {
        return Err(DomainError::InfeasiblePlan(format!(
            "anchored payments {anchored_sum} exceed the effective price {effective_price}"
        )));
    }
    let residual = if residual.is_negative() { Money::ZERO } else { residual };

    if !residual.is_zero() {
        let step = inputs.frequency.step_months();
        let horizon = inputs.duration_years * 12;
        let slots: Vec<u32> = (1..=horizon / step)
            .map(|k| k * step)
            .filter(|month| *month > last_anchor)
            .collect();
        if slots.is_empty() {
            return Err(DomainError::InfeasiblePlan(format!(
                "residual {residual} left but no periods remain after month {last_anchor}"
            )));
        }
        let count = slots.len() as u32;
        let per = residual.divided_by(count)?;
        for (i, month) in slots.iter().enumerate() {
            let amount = if i as u32 == count - 1 {
                residual.split_remainder(per, count)
            } else {
                per
            };
            entries.push(ScheduleEntry::unsequenced(
                format!("Installment {}", i + 1),
                *month,
                amount,
                PaymentKind::Equal,
            ));
        }
    }

    Ok(entries)
}

/// Append maintenance and garage entries, which ride outside PV.
fn append_excluded(
    entries: &mut Vec<ScheduleEntry>,
    inputs: &CustomPlanInputs,
) -> DomainResult<()> {
    let handover_month = inputs.handover_year * 12;

    if !inputs.maintenance_amount.is_zero() {
        let (month, date) = excluded_anchor(
            inputs.maintenance_month,
            inputs.maintenance_date,
            inputs.base_date(),
            handover_month,
            "maintenance_date",
        )?;
        let mut entry = ScheduleEntry::unsequenced(
            "Maintenance Deposit",
            month,
            inputs.maintenance_amount,
            PaymentKind::Maintenance,
        );
        entry.due_date = date;
        entries.push(entry);
    }

    if !inputs.garage_amount.is_zero() {
        let (month, date) = excluded_anchor(
            inputs.garage_month,
            None,
            inputs.base_date(),
            handover_month,
            "garage_month",
        )?;
        let mut entry = ScheduleEntry::unsequenced(
            "Garage Payment",
            month,
            inputs.garage_amount,
            PaymentKind::Garage,
        );
        entry.due_date = date;
        entries.push(entry);
    }

    Ok(())
}

/// Resolve the anchor of a PV-excluded payment: explicit date first, then
/// month offset, then the handover default. Month 0 means "not provided".
fn excluded_anchor(
    month: u32,
    date: Option<NaiveDate>,
    base: Option<NaiveDate>,
    handover_month: u32,
    field: &str,
) -> DomainResult<(u32, Option<NaiveDate>)> {
    if let Some(date) = date {
        let base = base.ok_or_else(|| {
            DomainError::validation(field, "a calendar anchor requires a plan base date")
        })?;
        let months = (date.year() - base.year()) * 12 + date.month() as i32
            - base.month() as i32;
        if months < 0 {
            return Err(DomainError::validation(
                field,
                "anchor date precedes the plan base date",
            ));
        }
        return Ok((months as u32, Some(date)));
    }
    if month > 0 {
        return Ok((month, None));
    }
    Ok((handover_month, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::{FirstYearPayment, SubsequentYear};
    use crate::standard::Frequency;

    fn std_plan() -> StandardPlan {
        StandardPlan::new(
            Money::from_major(1_000_000),
            dec!(12),
            6,
            Frequency::Quarterly,
        )
        .unwrap()
    }

    fn thresholds() -> AcceptanceThresholds {
        AcceptanceThresholds::default()
    }

    fn standard_mode_inputs() -> CustomPlanInputs {
        CustomPlanInputs {
            mode: Mode::StandardMode,
            dp_type: DpType::Percentage,
            dp_value: dec!(20),
            duration_years: 6,
            frequency: Frequency::Quarterly,
            handover_year: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_standard_mode_totals_and_shape() {
        let result = build_plan(&std_plan(), &standard_mode_inputs(), &thresholds()).unwrap();
        // DP + 24 quarterly installments + handover marker.
        assert_eq!(result.schedule.len(), 26);
        assert_eq!(
            result.totals.nominal_excl_maintenance,
            Money::from_major(1_000_000)
        );
        let dp = &result.schedule[0];
        assert_eq!(dp.kind, PaymentKind::Dp);
        assert_eq!(dp.amount, Money::from_major(200_000));
        assert_eq!(result.meta.effective_duration_years, 6);
        assert!(!result.needs_override);
    }

    #[test]
    fn test_standard_mode_pv_matches_benchmark() {
        let result = build_plan(&std_plan(), &standard_mode_inputs(), &thresholds()).unwrap();
        let std_pv = std_plan().standard_pv().unwrap();
        // DP up front plus the same nominal makes the proposed PV beat
        // the equal-installment benchmark.
        assert!(result.computed_pv >= std_pv.rounded());
        assert_eq!(result.evaluation.decision, Decision::Accept);
    }

    #[test]
    fn test_standard_mode_discount_forces_override() {
        let mut inputs = standard_mode_inputs();
        inputs.sales_discount_percent = dec!(1.5);
        let result = build_plan(&std_plan(), &inputs, &thresholds()).unwrap();
        // Front-loading the down payment keeps the PV above the
        // benchmark, but a nonzero discount under the fixed policy
        // always escalates.
        assert!(result.needs_override);
        assert!(result.evaluation.pv.pass);
        // Schedule is still built against the discounted price.
        assert_eq!(
            result.totals.nominal_excl_maintenance,
            Money::from_major(985_000)
        );
        assert_eq!(result.meta.effective_list_price, Money::from_major(985_000));
    }

    #[test]
    fn test_custom_price_residual_becomes_equal_installments() {
        let inputs = CustomPlanInputs {
            mode: Mode::EvaluateCustomPrice,
            dp_type: DpType::Amount,
            dp_value: dec!(200_000),
            duration_years: 4,
            frequency: Frequency::Quarterly,
            handover_year: 2,
            ..Default::default()
        };
        let result = build_plan(&std_plan(), &inputs, &thresholds()).unwrap();
        assert_eq!(
            result.totals.nominal_excl_maintenance,
            Money::from_major(1_000_000)
        );
        let equals: Vec<&ScheduleEntry> = result
            .schedule
            .iter()
            .filter(|e| e.kind == PaymentKind::Equal)
            .collect();
        // 16 quarterly slots, all after month 0.
        assert_eq!(equals.len(), 16);
        assert!(equals.iter().all(|e| e.month_offset >= 3));
        let equal_sum: Money = equals.iter().map(|e| e.amount).sum();
        assert_eq!(equal_sum, Money::from_major(800_000));
    }

    #[test]
    fn test_equal_fill_starts_after_last_nonzero_anchor() {
        let inputs = CustomPlanInputs {
            mode: Mode::CustomYearlyThenEqual_UseStdPrice,
            dp_type: DpType::Amount,
            dp_value: dec!(100_000),
            duration_years: 5,
            frequency: Frequency::Quarterly,
            handover_year: 3,
            subsequent_years: vec![SubsequentYear {
                total_nominal: Money::from_major(120_000),
                frequency: Frequency::Monthly,
            }],
            ..Default::default()
        };
        let result = build_plan(&std_plan(), &inputs, &thresholds()).unwrap();
        // The year-2 block ends at month 24; equals start at month 27.
        let first_equal = result
            .schedule
            .iter()
            .filter(|e| e.kind == PaymentKind::Equal)
            .map(|e| e.month_offset)
            .min()
            .unwrap();
        assert_eq!(first_equal, 27);
        // Zero handover marker does not push the window.
        let handover = result
            .schedule
            .iter()
            .find(|e| e.kind == PaymentKind::Handover)
            .unwrap();
        assert_eq!(handover.month_offset, 36);
        assert!(handover.amount.is_zero());
    }

    #[test]
    fn test_infeasible_when_anchors_exceed_price() {
        let inputs = CustomPlanInputs {
            mode: Mode::EvaluateCustomPrice,
            dp_type: DpType::Amount,
            dp_value: dec!(0),
            duration_years: 2,
            frequency: Frequency::Quarterly,
            handover_year: 1,
            split_first_year: true,
            first_year_payments: vec![
                FirstYearPayment {
                    amount: Money::from_major(600_000),
                    month: 3,
                    kind: FirstYearKind::Regular,
                },
                FirstYearPayment {
                    amount: Money::from_major(500_000),
                    month: 9,
                    kind: FirstYearKind::Regular,
                },
            ],
            ..Default::default()
        };
        let err = build_plan(&std_plan(), &inputs, &thresholds()).unwrap_err();
        assert_eq!(err.kind(), aqar_core::ErrorKind::InfeasiblePlan);
    }

    #[test]
    fn test_target_pv_solves_to_standard_pv() {
        let plan = StandardPlan::new(
            Money::from_major(1_000_000),
            dec!(12),
            5,
            Frequency::Monthly,
        )
        .unwrap();
        let inputs = CustomPlanInputs {
            mode: Mode::CalculateForTargetPV,
            dp_type: DpType::Amount,
            dp_value: dec!(100_000),
            duration_years: 5,
            frequency: Frequency::Monthly,
            handover_year: 2,
            ..Default::default()
        };
        let result = build_plan(&plan, &inputs, &thresholds()).unwrap();
        let std_pv = plan.standard_pv().unwrap();
        let diff = (result.computed_pv - std_pv).abs();
        assert!(diff.amount() <= dec!(0.01), "diff = {diff}");
        assert!(result.meta.scale_factor.is_some());
        // Discounting pushes the nominal total above the PV target.
        assert!(result.totals.nominal_excl_maintenance > std_pv);
        assert_eq!(result.evaluation.decision, Decision::Accept);
    }

    #[test]
    fn test_target_pv_server_locked_benchmark() {
        let mut plan = StandardPlan::new(
            Money::from_major(1_000_000),
            dec!(12),
            5,
            Frequency::Monthly,
        )
        .unwrap();
        plan.computed_pv = Some(Money::from_major(850_000));
        let inputs = CustomPlanInputs {
            mode: Mode::CalculateForTargetPV,
            dp_type: DpType::Amount,
            dp_value: dec!(100_000),
            duration_years: 5,
            frequency: Frequency::Monthly,
            handover_year: 2,
            ..Default::default()
        };
        let result = build_plan(&plan, &inputs, &thresholds()).unwrap();
        let diff = (result.computed_pv - Money::from_major(850_000)).abs();
        assert!(diff.amount() <= dec!(0.01), "diff = {diff}");
        assert!(result.totals.nominal_excl_maintenance > Money::from_major(850_000));
    }

    #[test]
    fn test_maintenance_defaults_to_handover_and_stays_out_of_pv() {
        let mut inputs = standard_mode_inputs();
        inputs.mode = Mode::EvaluateCustomPrice;
        inputs.maintenance_amount = Money::from_major(50_000);
        let without = build_plan(&std_plan(), &standard_mode_inputs(), &thresholds()).unwrap();
        let with = build_plan(&std_plan(), &inputs, &thresholds()).unwrap();
        let maint = with
            .schedule
            .iter()
            .find(|e| e.kind == PaymentKind::Maintenance)
            .unwrap();
        assert_eq!(maint.month_offset, 36);
        assert_eq!(
            with.totals.nominal_incl_maintenance,
            with.totals.nominal_excl_maintenance + Money::from_major(50_000)
        );
        // PV ignores the deposit entirely.
        assert_eq!(
            with.totals.nominal_excl_maintenance,
            without.totals.nominal_excl_maintenance
        );
    }

    #[test]
    fn test_schedule_is_deterministic() {
        let a = build_plan(&std_plan(), &standard_mode_inputs(), &thresholds()).unwrap();
        let b = build_plan(&std_plan(), &standard_mode_inputs(), &thresholds()).unwrap();
        assert_eq!(a.schedule, b.schedule);
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }

    #[test]
    fn test_totals_match_schedule_sum() {
        let result = build_plan(&std_plan(), &standard_mode_inputs(), &thresholds()).unwrap();
        let sum = schedule::nominal_excl_maintenance(&result.schedule);
        let drift = (sum - result.totals.nominal_excl_maintenance).abs();
        assert!(drift.amount() <= dec!(0.01));
    }

    #[test]
    fn test_due_dates_resolved_from_offer_date() {
        let mut inputs = standard_mode_inputs();
        inputs.offer_date = NaiveDate::from_ymd_opt(2026, 1, 31);
        let result = build_plan(&std_plan(), &inputs, &thresholds()).unwrap();
        let dp = &result.schedule[0];
        assert_eq!(dp.due_date, NaiveDate::from_ymd_opt(2026, 1, 31));
        let q1 = result
            .schedule
            .iter()
            .find(|e| e.month_offset == 3)
            .unwrap();
        assert_eq!(q1.due_date, NaiveDate::from_ymd_opt(2026, 4, 30));
    }
}
