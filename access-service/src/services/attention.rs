//! Attention engine: derives and resets "needs attention" flags on principals.
//!
//! All writes go through the store's version check. A lost race re-reads the
//! principal and re-applies the transition.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::store::{PrincipalStore, RoleStore};
use super::ServiceError;
use crate::models::{AlertItem, AlertSummary, AttentionReason, AttentionState, Principal};

pub const DEFAULT_INACTIVE_DAYS: i64 = 30;

const MAX_SAVE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
enum Transition {
    MarkNew,
    ResetIfComplete,
    Reconcile,
    Acknowledge(String),
    Unacknowledge,
}

impl Transition {
    fn name(&self) -> &'static str {
        match self {
            Transition::MarkNew => "mark_new",
            Transition::ResetIfComplete => "reset_if_complete",
            Transition::Reconcile => "reconcile",
            Transition::Acknowledge(_) => "acknowledge",
            Transition::Unacknowledge => "unacknowledge",
        }
    }
}

/// Assignment completeness of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub has_role: bool,
    pub has_scope: bool,
}

impl Assignment {
    pub fn is_complete(&self) -> bool {
        self.has_role && self.has_scope
    }
}

/// Clear every attention field once role and scope are both assigned.
pub fn reset_if_complete(state: &mut AttentionState, assignment: Assignment) -> bool {
    if !assignment.is_complete() {
        return false;
    }
    state.reset()
}

/// Flag missing assignments and inactivity; reset when complete.
///
/// An inactivity-only flag is cleared by a later completeness reset. For a
/// complete but inactive principal each reconcile therefore resets and raises
/// again: `attention_created_utc` moves to `now` and any acknowledgement is
/// dropped. Inactivity stays coupled to the completeness rule.
pub fn reconcile_state(
    state: &mut AttentionState,
    assignment: Assignment,
    inactive: bool,
    now: DateTime<Utc>,
) -> bool {
    let mut changed = if assignment.is_complete() {
        state.reset()
    } else {
        state.raise(now)
    };
    if inactive {
        changed |= state.raise(now);
    }
    changed
}

/// Last login older than the threshold. Principals that never logged in are
/// not inactive.
pub fn is_inactive(last_login_utc: Option<DateTime<Utc>>, now: DateTime<Utc>, threshold: Duration) -> bool {
    last_login_utc.is_some_and(|at| at < now - threshold)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub examined: usize,
    pub reset: usize,
}

#[derive(Clone)]
pub struct AttentionEngine {
    principals: Arc<dyn PrincipalStore>,
    roles: Arc<dyn RoleStore>,
    inactive_after: Duration,
}

impl AttentionEngine {
    pub fn new(principals: Arc<dyn PrincipalStore>, roles: Arc<dyn RoleStore>, inactive_days: i64) -> Self {
        Self {
            principals,
            roles,
            inactive_after: Duration::days(inactive_days),
        }
    }

    /// Registration event: open a new-user episode.
    pub async fn mark_new_user(&self, principal_id: Uuid) -> Result<AttentionState, ServiceError> {
        self.transition(principal_id, Transition::MarkNew).await
    }

    /// Login event: stamp last login, then reset flags if assignments are complete.
    pub async fn record_login(&self, principal_id: Uuid) -> Result<AttentionState, ServiceError> {
        self.principals.record_login(principal_id, Utc::now()).await?;
        self.transition(principal_id, Transition::ResetIfComplete).await
    }

    pub async fn reconcile(&self, principal_id: Uuid) -> Result<AttentionState, ServiceError> {
        self.transition(principal_id, Transition::Reconcile).await
    }

    /// Reset-if-complete over every active, non-deleted principal.
    pub async fn reconcile_all(&self) -> Result<ReconcileReport, ServiceError> {
        let principals = self.principals.list_principals().await?;
        let mut report = ReconcileReport::default();

        for principal in principals.iter().filter(|p| p.is_enabled()) {
            report.examined += 1;
            let before = principal.attention.version;
            match self
                .transition(principal.principal_id, Transition::ResetIfComplete)
                .await
            {
                Ok(state) if state.version != before => report.reset += 1,
                Ok(_) => {}
                Err(e) => tracing::error!(
                    principal_id = %principal.principal_id,
                    error = %e,
                    "Failed to reconcile attention flags"
                ),
            }
        }

        tracing::info!(examined = report.examined, reset = report.reset, "Attention reconciliation completed");
        Ok(report)
    }

    pub async fn acknowledge(&self, principal_id: Uuid, acknowledged_by: &str) -> Result<AttentionState, ServiceError> {
        self.transition(principal_id, Transition::Acknowledge(acknowledged_by.to_string()))
            .await
    }

    pub async fn unacknowledge(&self, principal_id: Uuid) -> Result<AttentionState, ServiceError> {
        self.transition(principal_id, Transition::Unacknowledge).await
    }

    pub async fn summary(&self) -> Result<AlertSummary, ServiceError> {
        let now = Utc::now();
        let principals = self.principals.list_principals().await?;
        let mut role_exists: HashMap<Uuid, bool> = HashMap::new();
        let mut summary = AlertSummary::default();

        for principal in principals.iter().filter(|p| p.is_enabled()) {
            let state = &principal.attention;

            if state.is_acknowledged() {
                summary.acknowledged.push(AlertItem::new(
                    principal.principal_id,
                    &principal.email,
                    state.attention_ignored_utc,
                    AttentionReason::Acknowledged,
                    now,
                ));
                continue;
            }

            let inactive = is_inactive(principal.last_login_utc, now, self.inactive_after);

            if state.needs_attention {
                let has_role = match principal.role_id {
                    Some(role_id) => match role_exists.get(&role_id) {
                        Some(exists) => *exists,
                        None => {
                            let exists = self.roles.find_role_with_grants(role_id).await?.is_some();
                            role_exists.insert(role_id, exists);
                            exists
                        }
                    },
                    None => false,
                };
                let reason = AttentionReason::for_gaps(state.is_new_user, !has_role, !principal.has_effective_scope())
                    .unwrap_or(AttentionReason::Inactive);
                summary.attention_needed.push(AlertItem::new(
                    principal.principal_id,
                    &principal.email,
                    state.attention_created_utc,
                    reason,
                    now,
                ));
            }

            if inactive {
                summary.inactive.push(AlertItem::new(
                    principal.principal_id,
                    &principal.email,
                    principal.last_login_utc,
                    AttentionReason::Inactive,
                    now,
                ));
            }
        }

        Ok(summary)
    }

    async fn assignment(&self, principal: &Principal) -> Result<Assignment, ServiceError> {
        let has_role = match principal.role_id {
            Some(role_id) => self.roles.find_role_with_grants(role_id).await?.is_some(),
            None => false,
        };
        Ok(Assignment {
            has_role,
            has_scope: principal.has_effective_scope(),
        })
    }

    async fn apply(
        &self,
        principal: &Principal,
        state: &mut AttentionState,
        transition: &Transition,
        now: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        let changed = match transition {
            Transition::MarkNew => {
                state.is_new_user = true;
                state.needs_attention = true;
                state.attention_created_utc = Some(now);
                true
            }
            Transition::ResetIfComplete => reset_if_complete(state, self.assignment(principal).await?),
            Transition::Reconcile => {
                let assignment = self.assignment(principal).await?;
                let inactive = is_inactive(principal.last_login_utc, now, self.inactive_after);
                reconcile_state(state, assignment, inactive, now)
            }
            Transition::Acknowledge(by) => {
                state.attention_ignored_utc = Some(now);
                state.attention_ignored_by = Some(by.clone());
                true
            }
            Transition::Unacknowledge => {
                let was_acknowledged = state.is_acknowledged() || state.attention_ignored_by.is_some();
                state.attention_ignored_utc = None;
                state.attention_ignored_by = None;
                was_acknowledged
            }
        };
        Ok(changed)
    }

    async fn transition(&self, principal_id: Uuid, transition: Transition) -> Result<AttentionState, ServiceError> {
        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let principal = self
                .principals
                .find_principal(principal_id)
                .await?
                .ok_or(ServiceError::PrincipalNotFound(principal_id))?;

            let expected = principal.attention.version;
            let mut state = principal.attention.clone();
            if !self.apply(&principal, &mut state, &transition, Utc::now()).await? {
                return Ok(principal.attention);
            }

            if self.principals.save_attention(principal_id, expected, &state).await? {
                state.version = expected + 1;
                tracing::info!(
                    principal_id = %principal_id,
                    transition = transition.name(),
                    needs_attention = state.needs_attention,
                    is_new_user = state.is_new_user,
                    "Attention state updated"
                );
                return Ok(state);
            }

            tracing::debug!(
                principal_id = %principal_id,
                transition = transition.name(),
                attempt,
                "Attention state changed concurrently; retrying"
            );
        }

        tracing::warn!(principal_id = %principal_id, transition = transition.name(), "Attention update gave up after retries");
        Err(ServiceError::ConcurrentUpdate(principal_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Assignment {
        Assignment {
            has_role: true,
            has_scope: true,
        }
    }

    fn missing_role() -> Assignment {
        Assignment {
            has_role: false,
            has_scope: true,
        }
    }

    #[test]
    fn test_reconcile_keeps_open_episode_timestamp() {
        let t0 = Utc::now() - Duration::days(3);
        let mut state = AttentionState {
            needs_attention: true,
            attention_created_utc: Some(t0),
            ..Default::default()
        };
        assert!(!reconcile_state(&mut state, missing_role(), false, Utc::now()));
        assert_eq!(state.attention_created_utc, Some(t0));
    }

    #[test]
    fn test_reconcile_complete_resets_acknowledged_state() {
        let mut state = AttentionState {
            is_new_user: true,
            needs_attention: true,
            attention_created_utc: Some(Utc::now()),
            attention_ignored_utc: Some(Utc::now()),
            attention_ignored_by: Some("admin".to_string()),
            version: 0,
        };
        assert!(reconcile_state(&mut state, complete(), false, Utc::now()));
        assert_eq!(
            state,
            AttentionState {
                version: 0,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_complete_but_inactive_is_flagged() {
        let now = Utc::now();
        let mut state = AttentionState::default();
        assert!(reconcile_state(&mut state, complete(), true, now));
        assert!(state.needs_attention);
        assert_eq!(state.attention_created_utc, Some(now));
    }

    #[test]
    fn test_complete_but_inactive_reraises_on_every_reconcile() {
        let earlier = Utc::now() - Duration::days(2);
        let now = Utc::now();
        let mut state = AttentionState {
            needs_attention: true,
            attention_created_utc: Some(earlier),
            attention_ignored_utc: Some(earlier),
            attention_ignored_by: Some("admin".to_string()),
            ..Default::default()
        };
        assert!(reconcile_state(&mut state, complete(), true, now));
        assert!(state.needs_attention);
        assert_eq!(state.attention_created_utc, Some(now));
        assert!(!state.is_acknowledged());
        assert!(state.attention_ignored_by.is_none());
    }

    #[test]
    fn test_complete_clean_state_is_not_rewritten() {
        let mut state = AttentionState::default();
        assert!(!reset_if_complete(&mut state, complete()));
        assert!(!reconcile_state(&mut state, complete(), false, Utc::now()));
    }

    #[test]
    fn test_inactivity_threshold() {
        let now = Utc::now();
        let threshold = Duration::days(DEFAULT_INACTIVE_DAYS);
        assert!(!is_inactive(None, now, threshold));
        assert!(!is_inactive(Some(now - Duration::days(29)), now, threshold));
        assert!(is_inactive(Some(now - Duration::days(31)), now, threshold));
    }
}
