//! Allow-list model - network origins permitted to reach the platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Allow-list entry: a single address or a CIDR range.
///
/// An entry without `principal_id` is an office (global) entry and admits any
/// principal. An entry bound to a principal only authorizes that principal's
/// sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AllowListEntry {
    pub entry_id: Uuid,
    #[schema(example = "192.168.1.0/24")]
    pub ip_address: String,
    pub principal_id: Option<Uuid>,
    #[schema(example = "London office")]
    pub label: Option<String>,
    pub expires_utc: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl AllowListEntry {
    /// Create an office entry that admits every principal.
    pub fn office(ip_address: impl Into<String>, label: Option<String>) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            ip_address: ip_address.into(),
            principal_id: None,
            label,
            expires_utc: None,
            is_active: true,
            created_utc: Utc::now(),
            created_by: None,
        }
    }

    /// Create an entry bound to a single principal.
    pub fn bound_to(ip_address: impl Into<String>, principal_id: Uuid) -> Self {
        Self {
            principal_id: Some(principal_id),
            ..Self::office(ip_address, None)
        }
    }

    pub fn with_expiry(mut self, expires_utc: DateTime<Utc>) -> Self {
        self.expires_utc = Some(expires_utc);
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Office entries are not bound to any principal.
    pub fn is_global(&self) -> bool {
        self.principal_id.is_none()
    }

    /// Active and not yet expired at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_utc.map_or(true, |expiry| expiry > now)
    }
}
