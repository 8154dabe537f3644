//! # Schedule Entries
//!
//! The common shape every calculation mode produces: a flat list of dated
//! nominal payments, each tagged with the kind of cash position it
//! represents. Maintenance and garage payments ride along in the schedule
//! but are excluded from PV and from acceptance ratios.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aqar_core::{add_months, DomainResult, Money};

use crate::standard::discount_factor;

/// Cash-position tag of a schedule entry.
///
/// The declaration order is the tie-break order for entries sharing a
/// month offset: dp < first-year < subsequent-year < equal < handover <
/// maintenance < garage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum PaymentKind {
    Dp,
    FirstYear,
    SubsequentYear,
    Equal,
    Handover,
    Maintenance,
    Garage,
}

impl PaymentKind {
    /// Whether this kind participates in PV and acceptance ratios.
    pub fn counts_toward_pv(&self) -> bool {
        !matches!(self, Self::Maintenance | Self::Garage)
    }
}

/// One nominal payment in a plan schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// Position after the canonical sort; assigned by the builder.
    pub sequence_index: u32,
    /// Human-readable label printed on documents.
    pub label: String,
    /// Months after the plan base date.
    pub month_offset: u32,
    /// Calendar due date, present when a base date is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Nominal amount, rounded half-even to two decimals.
    pub amount: Money,
    /// Cash-position tag.
    pub kind: PaymentKind,
    /// Words-for-amount in the requested language, filled by the
    /// GeneratePlan use case through the words port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_amount: Option<String>,
}

impl ScheduleEntry {
    /// Bare entry before sorting and date resolution.
    pub fn unsequenced(label: impl Into<String>, month_offset: u32, amount: Money, kind: PaymentKind) -> Self {
        Self {
            sequence_index: 0,
            label: label.into(),
            month_offset,
            due_date: None,
            amount: amount.rounded(),
            kind,
            written_amount: None,
        }
    }
}

/// Sort entries by (month offset, kind rank) and assign sequence indices.
pub fn finalize_order(entries: &mut [ScheduleEntry]) {
    entries.sort_by(|a, b| {
        a.month_offset
            .cmp(&b.month_offset)
            .then(a.kind.cmp(&b.kind))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.sequence_index = i as u32;
    }
}

/// Resolve due dates from a base date: `due = base + month_offset months`.
/// Entries that already carry an explicit date keep it.
pub fn resolve_dates(entries: &mut [ScheduleEntry], base: NaiveDate) -> DomainResult<()> {
    for entry in entries.iter_mut() {
        if entry.due_date.is_none() {
            entry.due_date = Some(add_months(base, entry.month_offset)?);
        }
    }
    Ok(())
}

/// Present value of the PV-relevant entries at the given monthly rate.
pub fn present_value(entries: &[ScheduleEntry], monthly_rate: Decimal) -> Money {
    let mut pv = Decimal::ZERO;
    for entry in entries.iter().filter(|e| e.kind.counts_toward_pv()) {
        pv += entry.amount.amount() / discount_factor(monthly_rate, entry.month_offset);
    }
    Money::new(pv)
}

/// Sum of PV-relevant nominal amounts.
pub fn nominal_excl_maintenance(entries: &[ScheduleEntry]) -> Money {
    entries
        .iter()
        .filter(|e| e.kind.counts_toward_pv())
        .map(|e| e.amount)
        .sum()
}

/// Sum of all nominal amounts, maintenance and garage included.
pub fn nominal_incl_maintenance(entries: &[ScheduleEntry]) -> Money {
    entries.iter().map(|e| e.amount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::MathematicalOps;
    use rust_decimal_macros::dec;

    fn entry(offset: u32, amount: i64, kind: PaymentKind) -> ScheduleEntry {
        ScheduleEntry::unsequenced("x", offset, Money::from_major(amount), kind)
    }

    #[test]
    fn test_tie_break_order_at_same_offset() {
        let mut entries = vec![
            entry(12, 10, PaymentKind::Maintenance),
            entry(12, 10, PaymentKind::Handover),
            entry(12, 10, PaymentKind::Equal),
            entry(12, 10, PaymentKind::Dp),
            entry(12, 10, PaymentKind::Garage),
            entry(12, 10, PaymentKind::SubsequentYear),
            entry(12, 10, PaymentKind::FirstYear),
        ];
        finalize_order(&mut entries);
        let kinds: Vec<PaymentKind> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PaymentKind::Dp,
                PaymentKind::FirstYear,
                PaymentKind::SubsequentYear,
                PaymentKind::Equal,
                PaymentKind::Handover,
                PaymentKind::Maintenance,
                PaymentKind::Garage,
            ]
        );
    }

    #[test]
    fn test_sequence_indices_follow_month_order() {
        let mut entries = vec![entry(6, 1, PaymentKind::Equal), entry(0, 1, PaymentKind::Dp)];
        finalize_order(&mut entries);
        assert_eq!(entries[0].month_offset, 0);
        assert_eq!(entries[0].sequence_index, 0);
        assert_eq!(entries[1].sequence_index, 1);
    }

    #[test]
    fn test_maintenance_excluded_from_pv_and_nominal() {
        let entries = vec![
            entry(0, 100, PaymentKind::Dp),
            entry(12, 50, PaymentKind::Maintenance),
            entry(12, 30, PaymentKind::Garage),
        ];
        assert_eq!(nominal_excl_maintenance(&entries), Money::from_major(100));
        assert_eq!(nominal_incl_maintenance(&entries), Money::from_major(180));
        // Zero rate: PV equals nominal of PV-relevant entries.
        assert_eq!(present_value(&entries, Decimal::ZERO), Money::from_major(100));
    }

    #[test]
    fn test_present_value_discounts_by_month_offset() {
        let entries = vec![entry(12, 112, PaymentKind::Equal)];
        // Monthly rate such that (1+m)^12 = 1.12 exactly is irrational;
        // use 1% monthly and check against direct computation.
        let m = dec!(0.01);
        let expected = Money::new(dec!(112) / (Decimal::ONE + m).powi(12));
        assert_eq!(present_value(&entries, m), expected);
    }

    #[test]
    fn test_resolve_dates_from_base() {
        let base = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let mut entries = vec![entry(1, 10, PaymentKind::Equal)];
        resolve_dates(&mut entries, base).unwrap();
        assert_eq!(
            entries[0].due_date.unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
    }
}
