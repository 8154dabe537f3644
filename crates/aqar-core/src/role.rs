//! # Actor Roles and Document Language
//!
//! Roles gate workflow transitions. RBAC middleware lives outside the
//! core; by the time a request reaches a state machine the actor's role is
//! already authenticated, and the core only checks that the role is
//! allowed to fire the event.

use serde::{Deserialize, Serialize};

/// Back-office actor roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Property consultant; creates deals and requests overrides.
    Consultant,
    /// Back-office administrator; may act for a consultant.
    Admin,
    /// Sales manager; first approval gate on deals and overrides.
    SalesManager,
    /// Financial manager; approves reservations and override step two.
    FinancialManager,
    /// Financial administrator; prepares reservation forms.
    FinancialAdmin,
    /// Contract administrator; drafts and executes contracts.
    ContractAdmin,
    /// Contract manager; first contract approval gate.
    ContractManager,
    Ceo,
    Chairman,
    ViceChairman,
    /// Generic top-management seat.
    TopManagement,
    /// Internal actor for automatic transitions (block-approval hooks,
    /// expiry sweeps, reconciliation).
    System,
}

impl Role {
    /// Whether this role sits at the top-management approval tier.
    pub fn is_top_management(&self) -> bool {
        matches!(
            self,
            Self::Ceo | Self::Chairman | Self::ViceChairman | Self::TopManagement
        )
    }

    /// Canonical snake_case name as written into audit rows.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Consultant => "consultant",
            Self::Admin => "admin",
            Self::SalesManager => "sales_manager",
            Self::FinancialManager => "financial_manager",
            Self::FinancialAdmin => "financial_admin",
            Self::ContractAdmin => "contract_admin",
            Self::ContractManager => "contract_manager",
            Self::Ceo => "ceo",
            Self::Chairman => "chairman",
            Self::ViceChairman => "vice_chairman",
            Self::TopManagement => "top_management",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Document language for rendered bindings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "ar")]
    Ar,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
