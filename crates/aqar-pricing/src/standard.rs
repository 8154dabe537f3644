//! # Standard-Plan Evaluator
//!
//! The standard plan is the policy-approved benchmark: equal installments
//! of the list price over the full tenure, discounted at the effective
//! monthly rate derived from the annual financial rate. Every custom offer
//! is accepted or rejected against this present value.

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use aqar_core::{DomainError, DomainResult, Money};

/// Installment frequency of a plan or a subsequent-year block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "monthly")]
    Monthly,
    #[default]
    #[serde(rename = "quarterly")]
    Quarterly,
    #[serde(rename = "bi-annually")]
    BiAnnually,
    #[serde(rename = "annually")]
    Annually,
}

impl Frequency {
    /// Periods per year.
    pub fn per_year(&self) -> u32 {
        match self {
            Self::Monthly => 12,
            Self::Quarterly => 4,
            Self::BiAnnually => 2,
            Self::Annually => 1,
        }
    }

    /// Period step in months.
    pub fn step_months(&self) -> u32 {
        12 / self.per_year()
    }
}

/// The reference installment plan for a unit.
///
/// When sourced from the server for a selected unit the plan is
/// *server-locked*: `computed_pv` is authoritative and the engine must not
/// recompute it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardPlan {
    /// Unit list price before any sales discount.
    pub list_price: Money,
    /// Annual financial rate in percent (12 means 12%).
    pub annual_rate_percent: Decimal,
    /// Plan tenure in years.
    pub duration_years: u32,
    /// Installment frequency.
    pub frequency: Frequency,
    /// Benchmark present value. `None` until evaluated; fixed when the
    /// plan arrived server-locked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_pv: Option<Money>,
}

impl StandardPlan {
    /// Validate and wrap the plan parameters.
    pub fn new(
        list_price: Money,
        annual_rate_percent: Decimal,
        duration_years: u32,
        frequency: Frequency,
    ) -> DomainResult<Self> {
        if list_price.is_negative() || list_price.is_zero() {
            return Err(DomainError::validation(
                "list_price",
                "list price must be positive",
            ));
        }
        if annual_rate_percent < Decimal::ZERO {
            return Err(DomainError::validation(
                "annual_rate_percent",
                "annual rate must be non-negative",
            ));
        }
        if duration_years == 0 {
            return Err(DomainError::validation(
                "duration_years",
                "duration must be at least one year",
            ));
        }
        Ok(Self {
            list_price,
            annual_rate_percent,
            duration_years,
            frequency,
            computed_pv: None,
        })
    }

    /// Effective monthly rate `m = (1 + r/100)^(1/12) - 1`, zero when the
    /// annual rate is zero.
    pub fn effective_monthly_rate(&self) -> Decimal {
        effective_monthly_rate(self.annual_rate_percent)
    }

    /// Total number of periods over the tenure.
    pub fn period_count(&self) -> u32 {
        self.duration_years * self.frequency.per_year()
    }

    /// The equal installment amount `P / n`.
    pub fn installment(&self) -> DomainResult<Money> {
        self.list_price.divided_by(self.period_count())
    }

    /// Benchmark present value of the standard schedule.
    ///
    /// `PV = sum over k of (P/n) / (1+m)^(k*step)`; when the rate is zero
    /// the PV equals the list price. Idempotent: the server-locked value,
    /// when present, is returned unchanged.
    pub fn standard_pv(&self) -> DomainResult<Money> {
        if let Some(locked) = self.computed_pv {
            return Ok(locked);
        }
        let m = self.effective_monthly_rate();
        if m.is_zero() {
            return Ok(self.list_price);
        }
        let n = self.period_count();
        let step = self.frequency.step_months();
        let installment = self.list_price.amount() / Decimal::from(n);
        let mut pv = Decimal::ZERO;
        for k in 1..=n {
            pv += installment / discount_factor(m, k * step);
        }
        Ok(Money::new(pv))
    }

    /// Evaluate and cache the benchmark PV.
    pub fn evaluated(mut self) -> DomainResult<Self> {
        let pv = self.standard_pv()?;
        self.computed_pv = Some(pv);
        Ok(self)
    }
}

/// `m = (1 + r/100)^(1/12) - 1` for `r > 0`, else zero.
pub fn effective_monthly_rate(annual_rate_percent: Decimal) -> Decimal {
    if annual_rate_percent <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let base = Decimal::ONE + annual_rate_percent / dec!(100);
    base.powd(Decimal::ONE / dec!(12)) - Decimal::ONE
}

/// `(1 + m)^months`, the discount factor at a month offset.
pub fn discount_factor(monthly_rate: Decimal, months: u32) -> Decimal {
    if monthly_rate.is_zero() || months == 0 {
        return Decimal::ONE;
    }
    (Decimal::ONE + monthly_rate).powi(months as i64)
}
