//! Role model - roles with permission grants.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;
use utoipa::ToSchema;
use uuid::Uuid;

/// Role entity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Role {
    pub role_id: Uuid,
    #[schema(example = "Underwriter")]
    pub role_name: String,
    pub is_superadmin: bool,
    pub is_active: bool,
}

impl Role {
    /// Create a new active, non-superadmin role.
    pub fn new(role_name: impl Into<String>) -> Self {
        Self {
            role_id: Uuid::new_v4(),
            role_name: role_name.into(),
            is_superadmin: false,
            is_active: true,
        }
    }

    pub fn superadmin(role_name: impl Into<String>) -> Self {
        Self {
            is_superadmin: true,
            ..Self::new(role_name)
        }
    }
}

/// Role to permission mapping, joined with the permission definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RolePermissionGrant {
    pub role_id: Uuid,
    pub permission_name: String,
    pub is_granted: bool,
    pub is_active: bool,
    pub permission_is_active: bool,
}

impl RolePermissionGrant {
    pub fn new(role_id: Uuid, permission_name: impl Into<String>) -> Self {
        Self {
            role_id,
            permission_name: permission_name.into(),
            is_granted: true,
            is_active: true,
            permission_is_active: true,
        }
    }

    pub fn is_effective(&self) -> bool {
        self.is_granted && self.is_active && self.permission_is_active
    }
}

/// Role with its permission grants.
#[derive(Debug, Clone)]
pub struct RoleWithGrants {
    pub role: Role,
    pub grants: Vec<RolePermissionGrant>,
}

impl RoleWithGrants {
    /// Names of grants that are granted, active and whose permission is active.
    pub fn effective_permissions(&self) -> BTreeSet<String> {
        self.grants
            .iter()
            .filter(|g| g.is_effective())
            .map(|g| g.permission_name.clone())
            .collect()
    }
}
