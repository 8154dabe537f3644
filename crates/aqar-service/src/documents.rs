//! # Document Bindings and Rendering
//!
//! Flattens a deal's snapshot, its reservation form, and the unit into
//! the binding tree the template engine consumes. Every monetary figure
//! is paired with its written form in the document language; Arabic
//! contracts additionally carry the composed remaining-down-payment
//! sentence. Rendering runs under the hard timeout of the renderer port.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use aqar_core::{DomainError, DomainResult, Language, Money};
use aqar_ports::{render_with_timeout, AmountWords, DocRenderer, DEFAULT_RENDER_TIMEOUT};
use aqar_state::{Deal, ReservationForm, Unit};

/// Buyer details printed on the form and the contract. Collected by the
/// financial admin; not part of the workflow entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

pub struct DocumentService {
    renderer: Arc<dyn DocRenderer>,
    words: Arc<dyn AmountWords>,
    timeout: Duration,
}

impl DocumentService {
    pub fn new(renderer: Arc<dyn DocRenderer>, words: Arc<dyn AmountWords>) -> Self {
        Self {
            renderer,
            words,
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Render the reservation form in the deal's language.
    pub async fn render_reservation_form(
        &self,
        deal: &Deal,
        form: &ReservationForm,
        unit: &Unit,
        client: &ClientInfo,
    ) -> DomainResult<Vec<u8>> {
        let bindings = self.reservation_bindings(deal, form, unit, client).await?;
        let key = template_key(Template::ReservationForm, form.language);
        render_with_timeout(self.renderer.as_ref(), key, &bindings, self.timeout).await
    }

    /// Render the contract in the deal's language.
    pub async fn render_contract(
        &self,
        deal: &Deal,
        form: &ReservationForm,
        unit: &Unit,
        client: &ClientInfo,
    ) -> DomainResult<Vec<u8>> {
        let mut bindings = self.reservation_bindings(deal, form, unit, client).await?;
        // The contract adds the composed remaining-DP clause.
        bindings["details"]["dp"]["remainingClause"] =
            json!(self.remaining_clause(form).await?);
        let key = template_key(Template::Contract, form.language);
        render_with_timeout(self.renderer.as_ref(), key, &bindings, self.timeout).await
    }

    /// The binding tree shared by both documents.
    pub async fn reservation_bindings(
        &self,
        deal: &Deal,
        form: &ReservationForm,
        unit: &Unit,
        client: &ClientInfo,
    ) -> DomainResult<serde_json::Value> {
        let snapshot = deal.calculator_snapshot.as_ref().ok_or_else(|| {
            DomainError::validation(
                "calculator_snapshot",
                "documents require a deal with a generated plan",
            )
        })?;
        let language = form.language;

        // Schedule rows carry their written amounts in the document
        // language, filled here if plan generation left them empty.
        let mut schedule = snapshot.result.schedule.clone();
        for entry in schedule.iter_mut() {
            if entry.written_amount.is_none() && !entry.amount.is_zero() {
                entry.written_amount = Some(self.written(entry.amount, language).await?);
            }
        }

        Ok(json!({
            "language": language,
            "details": {
                "clientInfo": client,
                "unitInfo": {
                    "id": unit.id.as_i64(),
                    "code": unit.code,
                    "status": unit.status,
                },
                "calculator": {
                    "generatedPlan": {
                        "schedule": schedule,
                        "totals": snapshot.result.totals,
                        "computedPv": snapshot.result.computed_pv,
                    },
                    "mode": snapshot.inputs.mode,
                },
                "dp": {
                    "total": form.dp.total,
                    "totalWords": self.written(form.dp.total, language).await?,
                    "preliminaryAmount": form.dp.preliminary_amount,
                    "preliminaryDate": form.dp.preliminary_date,
                    "paidAmount": form.dp.paid_amount,
                    "paidDate": form.dp.paid_date,
                    "remaining": form.dp.remaining,
                    "remainingWords": self.written(form.dp.remaining, language).await?,
                },
                "reservation": {
                    "id": form.id.as_i64(),
                    "date": form.reservation_date,
                    "preliminaryPayment": form.preliminary_payment,
                },
                "deal": {
                    "id": deal.id.as_i64(),
                    "amount": deal.amount,
                    "amountWords": self.written(deal.amount, language).await?,
                },
            },
        }))
    }

    async fn remaining_clause(&self, form: &ReservationForm) -> DomainResult<String> {
        let remaining = self.written(form.dp.remaining, form.language).await?;
        Ok(match form.language {
            Language::Ar => format!(
                "والمتبقي من دفعة التعاقد مبلغ وقدره {} يسدد عند توقيع هذا العقد",
                remaining
            ),
            Language::En => format!(
                "The remaining down payment of {} is due upon signing this contract",
                remaining
            ),
        })
    }

    async fn written(&self, amount: Money, language: Language) -> DomainResult<String> {
        self.words.to_words(amount, language).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Template {
    ReservationForm,
    Contract,
}

fn template_key(template: Template, language: Language) -> &'static str {
    match (template, language) {
        (Template::ReservationForm, Language::En) => "reservation_form_en",
        (Template::ReservationForm, Language::Ar) => "reservation_form_ar",
        (Template::Contract, Language::En) => "contract_en",
        (Template::Contract, Language::Ar) => "contract_ar",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqar_core::{DealId, PaymentPlanId, ReservationFormId, Role, Timestamp, UnitId, UserId};
    use aqar_ports::{DigitWords, JsonEchoRenderer};
    use aqar_pricing::{
        build_plan, AcceptanceThresholds, CustomPlanInputs, DpType, Frequency, Mode, StandardPlan,
    };
    use aqar_state::{CalculatorSnapshot, DpBreakdown};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(secs).unwrap()
    }

    fn fixture(language: Language) -> (Deal, ReservationForm, Unit, ClientInfo) {
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

        let mut deal = Deal::draft(DealId::new(1), UserId::new(10), language, ts(0));
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

        let form = ReservationForm::create(
            ReservationFormId::new(1),
            &deal,
            PaymentPlanId::new(7),
            NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
            DpBreakdown::new(
                Money::from_major(200_000),
                Money::from_major(20_000),
                None,
                Money::from_major(20_000),
                None,
            )
            .unwrap(),
            UserId::new(30),
            Role::FinancialAdmin,
            ts(3),
        )
        .unwrap();

        let unit = Unit::new(UnitId::new(5), "B3-204");
        let client = ClientInfo {
            name: "Omar Fathy".into(),
            national_id: Some("29001010112345".into()),
            phone: None,
            address: None,
        };
        (deal, form, unit, client)
    }

    fn service() -> DocumentService {
        DocumentService::new(Arc::new(JsonEchoRenderer), Arc::new(DigitWords))
    }

    #[tokio::test]
    async fn test_bindings_carry_schedule_and_dp() {
        let (deal, form, unit, client) = fixture(Language::En);
        let bindings = service()
            .reservation_bindings(&deal, &form, &unit, &client)
            .await
            .unwrap();

        let details = &bindings["details"];
        assert_eq!(details["unitInfo"]["code"], "B3-204");
        assert_eq!(details["clientInfo"]["name"], "Omar Fathy");
        let remaining: Money = serde_json::from_value(details["dp"]["remaining"].clone()).unwrap();
        assert_eq!(remaining, Money::from_major(180_000));
        assert!(details["dp"]["remainingWords"].as_str().unwrap().len() > 1);

        let schedule = details["calculator"]["generatedPlan"]["schedule"]
            .as_array()
            .unwrap();
        assert!(!schedule.is_empty());
        // Nonzero rows carry their written amounts.
        for row in schedule {
            let amount: Money = serde_json::from_value(row["amount"].clone()).unwrap();
            if !amount.is_zero() {
                assert!(row["writtenAmount"].is_string());
            }
        }
    }

    #[tokio::test]
    async fn test_arabic_contract_carries_remaining_clause() {
        let (deal, form, unit, client) = fixture(Language::Ar);
        let rendered = service()
            .render_contract(&deal, &form, &unit, &client)
            .await
            .unwrap();
        let echoed: serde_json::Value = serde_json::from_slice(&rendered).unwrap();
        assert_eq!(echoed["template"], "contract_ar");
        let clause = echoed["bindings"]["details"]["dp"]["remainingClause"]
            .as_str()
            .unwrap();
        assert!(clause.contains("المتبقي"));
    }

    #[test]
    fn test_template_key_maps_each_document_and_language() {
        assert_eq!(
            template_key(Template::ReservationForm, Language::En),
            "reservation_form_en"
        );
        assert_eq!(
            template_key(Template::ReservationForm, Language::Ar),
            "reservation_form_ar"
        );
        assert_eq!(template_key(Template::Contract, Language::En), "contract_en");
        assert_eq!(template_key(Template::Contract, Language::Ar), "contract_ar");
    }

    #[tokio::test]
    async fn test_documents_require_a_plan() {
        let (_, form, unit, client) = fixture(Language::En);
        let bare = Deal::draft(DealId::new(2), UserId::new(10), Language::En, ts(0));
        let err = service()
            .reservation_bindings(&bare, &form, &unit, &client)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), aqar_core::ErrorKind::Validation);
    }
}
