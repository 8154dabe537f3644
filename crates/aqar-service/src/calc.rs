//! # Calculation Use Cases
//!
//! The two request/response envelopes the front office sends to the
//! pricing engine. `Calculate` evaluates a plan; `GeneratePlan` does the
//! same and additionally resolves calendar due dates and fills
//! words-for-amount on every schedule entry, ready for document bindings.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aqar_core::{Currency, DomainResult, Language, Money};
use aqar_pricing::{
    build_plan, CustomPlanInputs, Evaluation, PlanMeta, ScheduleEntry, StandardPlan, Totals,
};
use aqar_ports::AmountWords;

use crate::thresholds::ThresholdsCache;

/// Request envelope for a plan calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    /// The benchmark plan. Server-locked when sourced for a selected
    /// unit: `computed_pv` is authoritative.
    pub std_plan: StandardPlan,
    pub inputs: CustomPlanInputs,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub currency: Currency,
}

/// Response envelope shared by both use cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateResponse {
    pub ok: bool,
    pub schedule: Vec<ScheduleEntry>,
    pub totals: Totals,
    pub computed_pv: Money,
    pub evaluation: Evaluation,
    pub needs_override: bool,
    pub meta: PlanMeta,
    pub language: Language,
    pub currency: Currency,
}

/// Request envelope for plan generation: calculation plus dated,
/// words-annotated schedule rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanRequest {
    #[serde(flatten)]
    pub calculate: CalculateRequest,
    /// Overrides the inputs' own base-date derivation when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_date: Option<NaiveDate>,
}

/// Evaluate a plan against the active thresholds.
pub async fn calculate(
    request: &CalculateRequest,
    thresholds: &ThresholdsCache,
) -> DomainResult<CalculateResponse> {
    let active = thresholds.active().await;
    let result = build_plan(&request.std_plan, &request.inputs, &active)?;
    tracing::debug!(
        mode = ?request.inputs.mode,
        decision = ?result.evaluation.decision,
        needs_override = result.needs_override,
        "plan calculated"
    );
    Ok(CalculateResponse {
        ok: true,
        schedule: result.schedule,
        totals: result.totals,
        computed_pv: result.computed_pv,
        evaluation: result.evaluation,
        needs_override: result.needs_override,
        meta: result.meta,
        language: request.language,
        currency: request.currency.clone(),
    })
}

/// Calculate, then resolve dates and written amounts for documents.
pub async fn generate_plan(
    request: &GeneratePlanRequest,
    thresholds: &ThresholdsCache,
    words: &dyn AmountWords,
) -> DomainResult<CalculateResponse> {
    let mut inputs = request.calculate.inputs.clone();
    if request.base_date.is_some() {
        inputs.first_payment_date = request.base_date;
    }
    let shadowed = CalculateRequest {
        inputs,
        ..request.calculate.clone()
    };
    let mut response = calculate(&shadowed, thresholds).await?;
    for entry in response.schedule.iter_mut() {
        if !entry.amount.is_zero() {
            entry.written_amount =
                Some(words.to_words(entry.amount, response.language).await?);
        }
    }
    Ok(response)
}

/// Build a standard plan with its benchmark PV cached, the shape the
/// calculator screen requests when a unit is selected.
pub fn evaluate_standard(
    list_price: Money,
    annual_rate_percent: Decimal,
    duration_years: u32,
    frequency: aqar_pricing::Frequency,
) -> DomainResult<StandardPlan> {
    StandardPlan::new(list_price, annual_rate_percent, duration_years, frequency)?.evaluated()
}
