//! # Audit History
//!
//! Every accepted workflow event appends one immutable record to the
//! entity's history. Records are never edited or deleted; the background
//! reconciler may append rows flagged `reconciled` when it detects a state
//! write whose history row was lost to a crash.

use serde::{Deserialize, Serialize};

use aqar_core::{EntityFamily, Role, Timestamp, UserId};

/// One append-only history row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Which entity family the row belongs to.
    pub entity: EntityFamily,
    /// Raw identifier within the family.
    pub entity_id: i64,
    /// The event that was accepted, e.g. `"submit"`, `"approve_sm"`.
    pub action: String,
    /// Who fired the event.
    pub actor_id: UserId,
    /// The role the actor held at the time.
    pub actor_role: Role,
    /// When the event was accepted (UTC).
    pub at: Timestamp,
    /// Optional structured context (old/new values, reasons).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<serde_json::Value>,
    /// Set only on rows the reconciler back-filled.
    #[serde(default)]
    pub reconciled: bool,
}

impl AuditRecord {
    /// A regular row for an accepted event.
    pub fn event(
        entity: EntityFamily,
        entity_id: i64,
        action: impl Into<String>,
        actor_id: UserId,
        actor_role: Role,
        at: Timestamp,
    ) -> Self {
        Self {
            entity,
            entity_id,
            action: action.into(),
            actor_id,
            actor_role,
            at,
            notes: None,
            reconciled: false,
        }
    }

    /// Attach structured context to the row.
    pub fn with_notes(mut self, notes: serde_json::Value) -> Self {
        self.notes = Some(notes);
        self
    }

    /// A back-filled row written by the reconciler.
    pub fn reconciled(
        entity: EntityFamily,
        entity_id: i64,
        action: impl Into<String>,
        at: Timestamp,
    ) -> Self {
        Self {
            entity,
            entity_id,
            action: action.into(),
            actor_id: UserId::new(0),
            actor_role: Role::System,
            at,
            notes: None,
            reconciled: true,
        }
    }
}

/// Verify the monotonic-history invariant: `at` never decreases across
/// consecutive rows of one entity.
pub fn is_monotonic(history: &[AuditRecord]) -> bool {
    history.windows(2).all(|w| w[0].at <= w[1].at)
}
