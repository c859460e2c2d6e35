//! In-process store used by tests and local runs without PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::store::{AccessAttemptStore, AccessStore, AllowListStore, PrincipalStore, RoleStore};
use super::ServiceError;
use crate::models::{
    AccessAttemptRecord, AllowListEntry, AttemptContext, AttentionState, Principal, RoleWithGrants,
};

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<AllowListEntry>>,
    principals: Mutex<HashMap<Uuid, Principal>>,
    roles: Mutex<HashMap<Uuid, RoleWithGrants>>,
    attempts: Mutex<HashMap<String, AccessAttemptRecord>>,
    unavailable: AtomicBool,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, ServiceError> {
    mutex
        .lock()
        .map_err(|e| ServiceError::Store(anyhow::anyhow!("Memory store {} mutex poisoned: {}", name, e)))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every store call fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), ServiceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ServiceError::Store(anyhow::anyhow!("Memory store unavailable")));
        }
        Ok(())
    }

    pub fn insert_allow_list_entry(&self, entry: AllowListEntry) -> Result<(), ServiceError> {
        lock(&self.entries, "allow-list")?.push(entry);
        Ok(())
    }

    pub fn insert_principal(&self, principal: Principal) -> Result<(), ServiceError> {
        lock(&self.principals, "principal")?.insert(principal.principal_id, principal);
        Ok(())
    }

    pub fn insert_role(&self, role: RoleWithGrants) -> Result<(), ServiceError> {
        lock(&self.roles, "role")?.insert(role.role.role_id, role);
        Ok(())
    }

    /// Apply an out-of-band change to a principal, as an admin screen would.
    pub fn update_principal<F>(&self, principal_id: Uuid, change: F) -> Result<bool, ServiceError>
    where
        F: FnOnce(&mut Principal),
    {
        let mut principals = lock(&self.principals, "principal")?;
        match principals.get_mut(&principal_id) {
            Some(principal) => {
                change(principal);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AllowListStore for MemoryStore {
    async fn active_entries(&self, now: DateTime<Utc>) -> Result<Vec<AllowListEntry>, ServiceError> {
        self.check_available()?;
        let entries = lock(&self.entries, "allow-list")?;
        Ok(entries.iter().filter(|e| e.is_live(now)).cloned().collect())
    }
}

#[async_trait]
impl PrincipalStore for MemoryStore {
    async fn find_principal(&self, principal_id: Uuid) -> Result<Option<Principal>, ServiceError> {
        self.check_available()?;
        Ok(lock(&self.principals, "principal")?.get(&principal_id).cloned())
    }

    async fn find_principal_by_login(&self, login: &str) -> Result<Option<Principal>, ServiceError> {
        self.check_available()?;
        let principals = lock(&self.principals, "principal")?;
        // Deleted principals are still returned so sign-in can refuse them;
        // a live account sharing the login wins.
        let lookup = |by_email: bool| {
            principals
                .values()
                .filter(move |p| {
                    let field = if by_email { &p.email } else { &p.user_name };
                    field.eq_ignore_ascii_case(login)
                })
                .min_by_key(|p| p.is_deleted)
        };
        let found = lookup(true).or_else(|| lookup(false));
        Ok(found.cloned())
    }

    async fn list_principals(&self) -> Result<Vec<Principal>, ServiceError> {
        self.check_available()?;
        let principals = lock(&self.principals, "principal")?;
        let mut list: Vec<Principal> = principals.values().filter(|p| !p.is_deleted).cloned().collect();
        list.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(list)
    }

    async fn record_login(&self, principal_id: Uuid, at: DateTime<Utc>) -> Result<(), ServiceError> {
        self.check_available()?;
        let mut principals = lock(&self.principals, "principal")?;
        let principal = principals
            .get_mut(&principal_id)
            .ok_or(ServiceError::PrincipalNotFound(principal_id))?;
        principal.last_login_utc = Some(at);
        Ok(())
    }

    async fn save_attention(
        &self,
        principal_id: Uuid,
        expected_version: i64,
        state: &AttentionState,
    ) -> Result<bool, ServiceError> {
        self.check_available()?;
        let mut principals = lock(&self.principals, "principal")?;
        let Some(principal) = principals.get_mut(&principal_id) else {
            return Ok(false);
        };
        if principal.attention.version != expected_version {
            return Ok(false);
        }
        principal.attention = AttentionState {
            version: expected_version + 1,
            ..state.clone()
        };
        Ok(true)
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_role_with_grants(&self, role_id: Uuid) -> Result<Option<RoleWithGrants>, ServiceError> {
        self.check_available()?;
        Ok(lock(&self.roles, "role")?.get(&role_id).cloned())
    }
}

#[async_trait]
impl AccessAttemptStore for MemoryStore {
    async fn record_attempt(
        &self,
        attempt: &AttemptContext,
        at: DateTime<Utc>,
    ) -> Result<AccessAttemptRecord, ServiceError> {
        self.check_available()?;
        let mut attempts = lock(&self.attempts, "attempt")?;
        let record = attempts
            .entry(attempt.ip_address.clone())
            .and_modify(|r| r.refresh(attempt, at))
            .or_insert_with(|| AccessAttemptRecord::first(attempt, at));
        Ok(record.clone())
    }

    async fn find_active_attempt(&self, ip_address: &str) -> Result<Option<AccessAttemptRecord>, ServiceError> {
        self.check_available()?;
        Ok(lock(&self.attempts, "attempt")?
            .get(ip_address)
            .filter(|r| r.is_active)
            .cloned())
    }

    async fn list_active_attempts(&self) -> Result<Vec<AccessAttemptRecord>, ServiceError> {
        self.check_available()?;
        let attempts = lock(&self.attempts, "attempt")?;
        let mut list: Vec<AccessAttemptRecord> = attempts.values().filter(|r| r.is_active).cloned().collect();
        list.sort_by(|a, b| b.last_attempt_utc.cmp(&a.last_attempt_utc));
        Ok(list)
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn health_check(&self) -> Result<(), ServiceError> {
        self.check_available()
    }
}
