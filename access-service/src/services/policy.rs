//! Dynamic authorization policies.
//!
//! Any dotted name longer than three characters is a permission policy and
//! needs no registration. Other names resolve to a small set of named
//! policies; unknown names deny.

use crate::models::SessionCapabilities;

pub const AUTHENTICATED_POLICY: &str = "authenticated";
pub const SUPERADMIN_POLICY: &str = "superadmin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    /// Requires the exact permission tag, or the wildcard.
    Permission(String),
    /// Any authenticated session.
    Authenticated,
    Superadmin,
    /// Unknown name.
    DenyAll(String),
}

impl Policy {
    pub fn evaluate(&self, caps: &SessionCapabilities) -> bool {
        match self {
            Policy::Permission(permission) => caps.has_permission(permission),
            Policy::Authenticated => true,
            Policy::Superadmin => caps.is_superadmin(),
            Policy::DenyAll(_) => false,
        }
    }

    /// Policy check plus an optional resource-scope requirement. The
    /// wildcard does not stand in for a scope.
    pub fn permits(&self, caps: &SessionCapabilities, resource_id: Option<&str>) -> bool {
        self.evaluate(caps) && resource_id.map_or(true, |id| caps.has_resource_scope(id))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Policy::Permission(_) => "permission",
            Policy::Authenticated => "authenticated",
            Policy::Superadmin => "superadmin",
            Policy::DenyAll(_) => "deny_all",
        }
    }
}

/// True for names handled as permission policies.
pub fn is_permission_policy(name: &str) -> bool {
    name.contains('.') && name.chars().count() > 3
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionPolicyResolver;

impl PermissionPolicyResolver {
    pub fn resolve(&self, name: &str) -> Policy {
        if is_permission_policy(name) {
            return Policy::Permission(name.to_string());
        }
        match name {
            AUTHENTICATED_POLICY => Policy::Authenticated,
            SUPERADMIN_POLICY => Policy::Superadmin,
            _ => {
                tracing::warn!(policy = %name, "Unknown authorization policy; denying");
                Policy::DenyAll(name.to_string())
            }
        }
    }

    /// Evaluate a policy name and an optional resource-scope requirement.
    pub fn authorize(&self, caps: &SessionCapabilities, policy_name: &str, resource_id: Option<&str>) -> bool {
        self.resolve(policy_name).permits(caps, resource_id)
    }
}
