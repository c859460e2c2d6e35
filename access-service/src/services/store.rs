//! Store boundaries consumed by the access core.
//!
//! Allow-list entries, principals and roles are owned by the administrative
//! screens; the core only reads them, and writes attempt records and
//! attention state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::ServiceError;
use crate::models::{
    AccessAttemptRecord, AllowListEntry, AttemptContext, AttentionState, Principal, RoleWithGrants,
};

#[async_trait]
pub trait AllowListStore: Send + Sync {
    /// Active entries not expired at `now`, global and bound together.
    async fn active_entries(&self, now: DateTime<Utc>) -> Result<Vec<AllowListEntry>, ServiceError>;
}

#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Principal with its resource-scope grants loaded.
    async fn find_principal(&self, principal_id: Uuid) -> Result<Option<Principal>, ServiceError>;

    /// Case-insensitive lookup by email first, then by user name.
    async fn find_principal_by_login(&self, login: &str) -> Result<Option<Principal>, ServiceError>;

    /// Every principal that is not soft-deleted, grants loaded.
    async fn list_principals(&self) -> Result<Vec<Principal>, ServiceError>;

    async fn record_login(&self, principal_id: Uuid, at: DateTime<Utc>) -> Result<(), ServiceError>;

    /// Compare-and-swap on the attention version.
    ///
    /// Writes `state` with version `expected_version + 1` only when the stored
    /// version still equals `expected_version`. Returns false on a lost race or
    /// a missing principal.
    async fn save_attention(
        &self,
        principal_id: Uuid,
        expected_version: i64,
        state: &AttentionState,
    ) -> Result<bool, ServiceError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_role_with_grants(&self, role_id: Uuid) -> Result<Option<RoleWithGrants>, ServiceError>;
}

#[async_trait]
pub trait AccessAttemptStore: Send + Sync {
    /// Atomic upsert keyed by source address: a new record with count 1, or
    /// the active record with its count incremented and context refreshed.
    async fn record_attempt(
        &self,
        attempt: &AttemptContext,
        at: DateTime<Utc>,
    ) -> Result<AccessAttemptRecord, ServiceError>;

    async fn find_active_attempt(&self, ip_address: &str) -> Result<Option<AccessAttemptRecord>, ServiceError>;

    /// Active records, most recent attempt first.
    async fn list_active_attempts(&self) -> Result<Vec<AccessAttemptRecord>, ServiceError>;
}

/// Everything the service needs from persistence.
#[async_trait]
pub trait AccessStore: AllowListStore + PrincipalStore + RoleStore + AccessAttemptStore {
    async fn health_check(&self) -> Result<(), ServiceError>;
}
