//! # Custom-Plan Inputs
//!
//! The consultant-facing knobs of a custom financing plan, validated
//! before any schedule math runs. Validation failures carry the offending
//! field name so the UI can highlight it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use aqar_core::{DomainError, DomainResult, Money};

use crate::standard::Frequency;

/// Calculation mode.
///
/// Variant names match the wire labels the front office sends.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Fixed company policy: 20% DP, six years quarterly, handover at
    /// year three. Any nonzero sales discount flags an override.
    StandardMode,
    /// Build the schedule against the discounted list price and evaluate
    /// its PV as-is.
    EvaluateCustomPrice,
    /// Back-solve the nominal total (scaling the equal remainder and the
    /// subsequent-year blocks) so the offer PV equals the standard PV.
    CalculateForTargetPV,
    /// Yearly blocks then equal remainder, evaluated against the list
    /// price as-is.
    CustomYearlyThenEqual_UseStdPrice,
    /// Yearly blocks then equal remainder, scaling only the equal
    /// remainder to hit the standard PV.
    CustomYearlyThenEqual_TargetPV,
}

impl Mode {
    /// Whether this mode back-solves the nominal total.
    pub fn is_target_pv(&self) -> bool {
        matches!(
            self,
            Self::CalculateForTargetPV | Self::CustomYearlyThenEqual_TargetPV
        )
    }
}

/// How the down payment value is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DpType {
    Amount,
    Percentage,
}

/// Tag on a split first-year payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstYearKind {
    /// Counts toward the down payment ratio.
    Dp,
    Regular,
}

/// One declared payment inside the split first year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstYearPayment {
    pub amount: Money,
    /// Month within the first year, 1..=12.
    pub month: u32,
    pub kind: FirstYearKind,
}

/// One year-sized block of nominal payments after the first year.
/// Block `k` (zero-based) occupies year `k + 2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsequentYear {
    pub total_nominal: Money,
    pub frequency: Frequency,
}

/// The full set of custom-plan knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPlanInputs {
    pub mode: Mode,
    /// Sales discount off the list price, percent in [0, 100].
    #[serde(default)]
    pub sales_discount_percent: Decimal,
    pub dp_type: DpType,
    /// Amount or percentage per `dp_type`; non-negative.
    pub dp_value: Decimal,
    /// Plan tenure in years, at least 1.
    pub duration_years: u32,
    /// Global frequency for the equal-installment remainder.
    pub frequency: Frequency,
    /// Handover year, at least 1.
    pub handover_year: u32,
    /// Optional lump due at handover.
    #[serde(default)]
    pub additional_handover_payment: Money,
    /// Whether year one is split into declared payments.
    #[serde(default)]
    pub split_first_year: bool,
    #[serde(default)]
    pub first_year_payments: Vec<FirstYearPayment>,
    #[serde(default)]
    pub subsequent_years: Vec<SubsequentYear>,
    /// Maintenance deposit, excluded from PV.
    #[serde(default)]
    pub maintenance_amount: Money,
    /// Month offset of the maintenance deposit; 0 means "not provided".
    #[serde(default)]
    pub maintenance_month: u32,
    /// Explicit maintenance due date; wins over the month offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_date: Option<NaiveDate>,
    /// Garage payment, excluded from PV.
    #[serde(default)]
    pub garage_amount: Money,
    /// Month offset of the garage payment; 0 means "not provided".
    #[serde(default)]
    pub garage_month: u32,
    /// Date the offer is made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_date: Option<NaiveDate>,
    /// Date of the first installment; base for month offsets when no
    /// explicit base date is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_payment_date: Option<NaiveDate>,
}

impl CustomPlanInputs {
    /// Structural validation, independent of the standard plan.
    pub fn validate(&self) -> DomainResult<()> {
        if self.sales_discount_percent < Decimal::ZERO
            || self.sales_discount_percent > dec!(100)
        {
            return Err(DomainError::validation(
                "sales_discount_percent",
                "discount must be within [0, 100]",
            ));
        }
        if self.dp_value < Decimal::ZERO {
            return Err(DomainError::validation(
                "dp_value",
                "down payment must be non-negative",
            ));
        }
        if self.dp_type == DpType::Percentage && self.dp_value > dec!(100) {
            return Err(DomainError::validation(
                "dp_value",
                "down payment percentage must be within [0, 100]",
            ));
        }
        if self.duration_years == 0 {
            return Err(DomainError::validation(
                "duration_years",
                "duration must be at least one year",
            ));
        }
        if self.handover_year == 0 {
            return Err(DomainError::validation(
                "handover_year",
                "handover year must be at least 1",
            ));
        }
        if self.handover_year > self.duration_years {
            return Err(DomainError::validation(
                "handover_year",
                "handover year cannot exceed the plan duration",
            ));
        }
        if self.mode.is_target_pv() && self.dp_type != DpType::Amount {
            return Err(DomainError::validation(
                "dp_type",
                "target-PV modes require the down payment as an amount",
            ));
        }
        if self.split_first_year {
            for (i, p) in self.first_year_payments.iter().enumerate() {
                if p.month == 0 || p.month > 12 {
                    return Err(DomainError::validation(
                        format!("first_year_payments[{i}].month"),
                        "first-year months run from 1 to 12",
                    ));
                }
                if p.amount.is_negative() {
                    return Err(DomainError::validation(
                        format!("first_year_payments[{i}].amount"),
                        "payment amounts must be non-negative",
                    ));
                }
            }
        } else if !self.first_year_payments.is_empty() {
            return Err(DomainError::validation(
                "first_year_payments",
                "declared first-year payments require split_first_year",
            ));
        }
        // Subsequent blocks are year-sized; the last one must still fit.
        let last_block_year = 1 + self.subsequent_years.len() as u32;
        if last_block_year > self.duration_years {
            return Err(DomainError::validation(
                "subsequent_years",
                "subsequent-year blocks extend past the plan duration",
            ));
        }
        for (i, block) in self.subsequent_years.iter().enumerate() {
            if block.total_nominal.is_negative() {
                return Err(DomainError::validation(
                    format!("subsequent_years[{i}].total_nominal"),
                    "block totals must be non-negative",
                ));
            }
        }
        if self.maintenance_amount.is_negative() {
            return Err(DomainError::validation(
                "maintenance_amount",
                "maintenance deposit must be non-negative",
            ));
        }
        if self.garage_amount.is_negative() {
            return Err(DomainError::validation(
                "garage_amount",
                "garage payment must be non-negative",
            ));
        }
        if self.additional_handover_payment.is_negative() {
            return Err(DomainError::validation(
                "additional_handover_payment",
                "handover lump must be non-negative",
            ));
        }
        Ok(())
    }

    /// Base date for month-offset resolution: the first payment date when
    /// given, otherwise the offer date.
    pub fn base_date(&self) -> Option<NaiveDate> {
        self.first_payment_date.or(self.offer_date)
    }
}

/// Minimal valid inputs for tests and defaults.
impl Default for CustomPlanInputs {
    fn default() -> Self {
        Self {
            mode: Mode::EvaluateCustomPrice,
            sales_discount_percent: Decimal::ZERO,
            dp_type: DpType::Percentage,
            dp_value: Decimal::ZERO,
            duration_years: 1,
            frequency: Frequency::Quarterly,
            handover_year: 1,
            additional_handover_payment: Money::ZERO,
            split_first_year: false,
            first_year_payments: Vec::new(),
            subsequent_years: Vec::new(),
            maintenance_amount: Money::ZERO,
            maintenance_month: 0,
            maintenance_date: None,
            garage_amount: Money::ZERO,
            garage_month: 0,
            offer_date: None,
            first_payment_date: None,
        }
    }
}
