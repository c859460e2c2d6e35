//! Projection of a principal's role and scope grants into session capabilities.

use std::sync::Arc;

use super::store::RoleStore;
use super::ServiceError;
use crate::models::capability::WILDCARD_PERMISSION;
use crate::models::{Principal, RoleWithGrants, SessionCapabilities};

/// Pure projection over an already loaded role.
pub fn project(principal: &Principal, role: Option<&RoleWithGrants>) -> SessionCapabilities {
    let mut caps = SessionCapabilities::empty(principal.principal_id);
    if !principal.is_enabled() {
        return caps;
    }

    if let Some(role) = role {
        caps.role = Some(role.role.role_name.clone());
        if role.role.is_superadmin {
            caps.permissions.insert(WILDCARD_PERMISSION.to_string());
        } else {
            caps.permissions = role.effective_permissions();
        }
    }

    caps.resource_scopes = principal.effective_scopes().map(|id| id.to_string()).collect();
    caps
}

#[derive(Clone)]
pub struct SessionClaimsProjector {
    roles: Arc<dyn RoleStore>,
}

impl SessionClaimsProjector {
    pub fn new(roles: Arc<dyn RoleStore>) -> Self {
        Self { roles }
    }

    pub async fn project(&self, principal: &Principal) -> Result<SessionCapabilities, ServiceError> {
        if !principal.is_enabled() {
            return Ok(SessionCapabilities::empty(principal.principal_id));
        }

        let role = match principal.role_id {
            Some(role_id) => {
                let role = self.roles.find_role_with_grants(role_id).await?;
                if role.is_none() {
                    tracing::warn!(
                        principal_id = %principal.principal_id,
                        role_id = %role_id,
                        "Principal references a missing role"
                    );
                }
                role
            }
            None => None,
        };

        Ok(project(principal, role.as_ref()))
    }
}
