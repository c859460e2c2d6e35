//! Principal model - administrative accounts as seen by the access core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Attention flags embedded in a principal.
///
/// `version` is bumped on every write and guards concurrent reconciliations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttentionState {
    pub is_new_user: bool,
    pub needs_attention: bool,
    pub attention_created_utc: Option<DateTime<Utc>>,
    pub attention_ignored_utc: Option<DateTime<Utc>>,
    pub attention_ignored_by: Option<String>,
    #[sqlx(rename = "attention_version")]
    pub version: i64,
}

impl AttentionState {
    pub fn is_acknowledged(&self) -> bool {
        self.attention_ignored_utc.is_some()
    }

    /// Raise the flag unless an episode is already open.
    /// Returns true when the state changed.
    pub fn raise(&mut self, now: DateTime<Utc>) -> bool {
        if self.needs_attention {
            return false;
        }
        self.needs_attention = true;
        self.attention_created_utc = Some(now);
        true
    }

    /// Clear every attention field, including an acknowledgement.
    /// Returns true when the state changed.
    pub fn reset(&mut self) -> bool {
        if !self.is_new_user && !self.needs_attention {
            return false;
        }
        self.is_new_user = false;
        self.needs_attention = false;
        self.attention_created_utc = None;
        self.attention_ignored_utc = None;
        self.attention_ignored_by = None;
        true
    }
}

/// Grant of a resource (website) scope to a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ResourceScopeGrant {
    pub principal_id: Uuid,
    pub resource_id: Uuid,
    pub is_granted: bool,
    pub is_active: bool,
}

impl ResourceScopeGrant {
    pub fn new(principal_id: Uuid, resource_id: Uuid) -> Self {
        Self {
            principal_id,
            resource_id,
            is_granted: true,
            is_active: true,
        }
    }

    /// Only active, granted rows confer access.
    pub fn is_effective(&self) -> bool {
        self.is_granted && self.is_active
    }
}

/// Principal entity, owned by the identity store.
#[derive(Debug, Clone, FromRow)]
pub struct Principal {
    pub principal_id: Uuid,
    pub user_name: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: Option<Uuid>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub last_login_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    #[sqlx(flatten)]
    pub attention: AttentionState,
    #[sqlx(skip)]
    pub scope_grants: Vec<ResourceScopeGrant>,
}

impl Principal {
    /// Create an active principal with no role and no scope grants.
    pub fn new(user_name: impl Into<String>, email: impl Into<String>, password_hash: String) -> Self {
        Self {
            principal_id: Uuid::new_v4(),
            user_name: user_name.into(),
            email: email.into(),
            password_hash,
            role_id: None,
            is_active: true,
            is_deleted: false,
            last_login_utc: None,
            created_utc: Utc::now(),
            attention: AttentionState::default(),
            scope_grants: Vec::new(),
        }
    }

    /// Active and not soft-deleted.
    pub fn is_enabled(&self) -> bool {
        self.is_active && !self.is_deleted
    }

    pub fn has_effective_scope(&self) -> bool {
        self.scope_grants.iter().any(ResourceScopeGrant::is_effective)
    }

    /// Resource ids of the effective scope grants.
    pub fn effective_scopes(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.scope_grants
            .iter()
            .filter(|g| g.is_effective())
            .map(|g| g.resource_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_does_not_overwrite_open_episode() {
        let t0 = Utc::now();
        let mut state = AttentionState::default();
        assert!(state.raise(t0));
        assert!(!state.raise(t0 + chrono::Duration::hours(1)));
        assert_eq!(state.attention_created_utc, Some(t0));
    }

    #[test]
    fn test_reset_clears_acknowledgement() {
        let mut state = AttentionState {
            is_new_user: true,
            needs_attention: true,
            attention_created_utc: Some(Utc::now()),
            attention_ignored_utc: Some(Utc::now()),
            attention_ignored_by: Some("admin@example.com".to_string()),
            version: 3,
        };
        assert!(state.reset());
        assert!(!state.is_new_user && !state.needs_attention);
        assert!(state.attention_ignored_utc.is_none());
        assert!(state.attention_ignored_by.is_none());
        assert_eq!(state.version, 3);
        assert!(!state.reset());
    }

    #[test]
    fn test_only_effective_grants_count() {
        let mut principal = Principal::new("jdoe", "jdoe@example.com", String::new());
        let site = Uuid::new_v4();
        let mut revoked = ResourceScopeGrant::new(principal.principal_id, site);
        revoked.is_active = false;
        principal.scope_grants.push(revoked);
        assert!(!principal.has_effective_scope());

        principal
            .scope_grants
            .push(ResourceScopeGrant::new(principal.principal_id, site));
        assert!(principal.has_effective_scope());
        assert_eq!(principal.effective_scopes().collect::<Vec<_>>(), vec![site]);
    }
}
