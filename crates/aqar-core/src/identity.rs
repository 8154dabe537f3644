//! # Entity Identifier Newtypes
//!
//! Integer identifiers allocated by the `IdAllocator` port, one monotonic
//! sequence per entity family. Newtypes prevent cross-family confusion:
//! a `DealId` cannot be passed where a `ContractId` is expected.

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw allocated identifier.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// The raw integer value.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a deal (a consultant's committed offer on a unit).
    DealId,
    "deal"
);
entity_id!(
    /// Identifier of a reservation form bound to an approved deal.
    ReservationFormId,
    "reservation"
);
entity_id!(
    /// Identifier of a contract generated from an approved reservation.
    ContractId,
    "contract"
);
entity_id!(
    /// Identifier of a sellable unit in the compound inventory.
    UnitId,
    "unit"
);
entity_id!(
    /// Identifier of a time-bounded block on a unit.
    UnitBlockId,
    "block"
);
entity_id!(
    /// Identifier of a back-office user (consultant, manager, admin).
    UserId,
    "user"
);
entity_id!(
    /// Identifier of a persisted payment plan snapshot.
    PaymentPlanId,
    "plan"
);

/// Entity families known to the `IdAllocator` and `SnapshotStore` ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityFamily {
    Deal,
    ReservationForm,
    Contract,
    Unit,
    UnitBlock,
    PaymentPlan,
    AuditRecord,
}

impl EntityFamily {
    /// Canonical lowercase name, as stored in audit rows.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deal => "deal",
            Self::ReservationForm => "reservation_form",
            Self::Contract => "contract",
            Self::Unit => "unit",
            Self::UnitBlock => "unit_block",
            Self::PaymentPlan => "payment_plan",
            Self::AuditRecord => "audit_record",
        }
    }
}

impl std::fmt::Display for EntityFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_family_prefix() {
        assert_eq!(DealId::new(17).to_string(), "deal:17");
        assert_eq!(UnitBlockId::new(3).to_string(), "block:3");
    }

    #[test]
    fn test_ids_are_distinct_types() {
        // Compile-time property; the assertion just keeps the test body real.
        let deal = DealId::new(1);
        let unit = UnitId::new(1);
        assert_eq!(deal.as_i64(), unit.as_i64());
    }

    #[test]
    fn test_family_names() {
        assert_eq!(EntityFamily::ReservationForm.name(), "reservation_form");
        assert_eq!(EntityFamily::UnitBlock.to_string(), "unit_block");
    }
}
