//! Session capability model - what an authenticated session may do.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;
use uuid::Uuid;

/// Permission tag held by superadmin sessions.
pub const WILDCARD_PERMISSION: &str = "*";

/// Capability set derived at sign-in and carried unchanged for the
/// session's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionCapabilities {
    pub principal_id: Uuid,
    #[schema(example = "Underwriter")]
    pub role: Option<String>,
    pub permissions: BTreeSet<String>,
    pub resource_scopes: BTreeSet<String>,
}

impl SessionCapabilities {
    /// Capability set that grants nothing.
    pub fn empty(principal_id: Uuid) -> Self {
        Self {
            principal_id,
            ..Default::default()
        }
    }

    pub fn is_superadmin(&self) -> bool {
        self.permissions.contains(WILDCARD_PERMISSION)
    }

    /// Wildcard or exact tag match. Prefixes do not match.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_superadmin() || self.permissions.contains(permission)
    }

    pub fn has_resource_scope(&self, resource_id: &str) -> bool {
        self.resource_scopes.contains(resource_id)
    }

    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.permissions.is_empty() && self.resource_scopes.is_empty()
    }
}
