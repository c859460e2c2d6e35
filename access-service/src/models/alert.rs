//! Alert model - principals that need administrative attention.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Why a principal appears on the alert list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttentionReason {
    NewUserMissingRoleAndScope,
    NewUserMissingRole,
    NewUserMissingScope,
    MissingRole,
    MissingScope,
    MissingRoleAndScope,
    Inactive,
    Acknowledged,
}

impl AttentionReason {
    pub fn label(self) -> &'static str {
        match self {
            Self::NewUserMissingRoleAndScope => "New user - no role and website assigned",
            Self::NewUserMissingRole => "New user - no role assigned",
            Self::NewUserMissingScope => "New user - no website assigned",
            Self::MissingRole => "No role assigned",
            Self::MissingScope => "No website assigned",
            Self::MissingRoleAndScope => "No role and website assigned",
            Self::Inactive => "User inactive for 30+ days",
            Self::Acknowledged => "Admin acknowledged",
        }
    }

    /// Label for a flagged principal given its assignment gaps.
    /// Returns `None` when nothing is missing.
    pub fn for_gaps(is_new_user: bool, missing_role: bool, missing_scope: bool) -> Option<Self> {
        let reason = match (is_new_user, missing_role, missing_scope) {
            (_, false, false) => return None,
            (true, true, true) => Self::NewUserMissingRoleAndScope,
            (true, true, false) => Self::NewUserMissingRole,
            (true, false, true) => Self::NewUserMissingScope,
            (false, true, true) => Self::MissingRoleAndScope,
            (false, true, false) => Self::MissingRole,
            (false, false, true) => Self::MissingScope,
        };
        Some(reason)
    }
}

impl fmt::Display for AttentionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the attention summary.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AlertItem {
    pub principal_id: Uuid,
    pub email: String,
    /// Attention start, last login or acknowledgement time, depending on the list.
    pub reference_utc: Option<DateTime<Utc>>,
    pub reason: AttentionReason,
    #[schema(example = "User inactive for 30+ days")]
    pub reason_label: String,
    pub days_since: Option<i64>,
}

impl AlertItem {
    pub fn new(
        principal_id: Uuid,
        email: impl Into<String>,
        reference_utc: Option<DateTime<Utc>>,
        reason: AttentionReason,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            principal_id,
            email: email.into(),
            reference_utc,
            reason,
            reason_label: reason.label().to_string(),
            days_since: reference_utc.map(|at| (now - at).num_days()),
        }
    }
}

/// Administrative attention summary.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct AlertSummary {
    pub attention_needed: Vec<AlertItem>,
    pub inactive: Vec<AlertItem>,
    pub acknowledged: Vec<AlertItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gap_labels() {
        assert_eq!(
            AttentionReason::for_gaps(true, true, true).map(AttentionReason::label),
            Some("New user - no role and website assigned")
        );
        assert_eq!(
            AttentionReason::for_gaps(false, false, true).map(AttentionReason::label),
            Some("No website assigned")
        );
        assert_eq!(
            AttentionReason::for_gaps(false, true, true).map(AttentionReason::label),
            Some("No role and website assigned")
        );
        assert_eq!(AttentionReason::for_gaps(true, false, false), None);
    }

    #[test]
    fn test_days_since_is_whole_days() {
        let now = Utc::now();
        let item = AlertItem::new(
            Uuid::new_v4(),
            "a@example.com",
            Some(now - chrono::Duration::hours(49)),
            AttentionReason::Inactive,
            now,
        );
        assert_eq!(item.days_since, Some(2));
        assert_eq!(item.reason_label, "User inactive for 30+ days");
    }
}
