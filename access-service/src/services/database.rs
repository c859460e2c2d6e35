//! PostgreSQL store for the access core.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::store::{AccessAttemptStore, AccessStore, AllowListStore, PrincipalStore, RoleStore};
use super::ServiceError;
use crate::models::access_attempt::SYSTEM_ACTOR;
use crate::models::{
    AccessAttemptRecord, AllowListEntry, AttemptContext, AttentionState, Principal, ResourceScopeGrant, Role,
    RolePermissionGrant, RoleWithGrants,
};

const PRINCIPAL_COLUMNS: &str = r#"
    principal_id, user_name, email, password_hash, role_id, is_active, is_deleted,
    last_login_utc, created_utc, is_new_user, needs_attention, attention_created_utc,
    attention_ignored_utc, attention_ignored_by, attention_version
"#;

const ATTEMPT_COLUMNS: &str = r#"
    attempt_id, ip_address, user_agent, request_path, referer, access_attempts,
    first_attempt_utc, last_attempt_utc, created_utc, updated_utc, created_by, updated_by, is_active
"#;

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_scope_grants(&self, principal_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<ResourceScopeGrant>>, ServiceError> {
        let grants = sqlx::query_as::<_, ResourceScopeGrant>(
            r#"
            SELECT principal_id, resource_id, is_granted, is_active
            FROM principal_scope_grants
            WHERE principal_id = ANY($1)
            "#,
        )
        .bind(principal_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_principal: HashMap<Uuid, Vec<ResourceScopeGrant>> = HashMap::new();
        for grant in grants {
            by_principal.entry(grant.principal_id).or_default().push(grant);
        }
        Ok(by_principal)
    }

    async fn with_grants(&self, principal: Option<Principal>) -> Result<Option<Principal>, ServiceError> {
        let Some(mut principal) = principal else {
            return Ok(None);
        };
        let mut grants = self.load_scope_grants(&[principal.principal_id]).await?;
        principal.scope_grants = grants.remove(&principal.principal_id).unwrap_or_default();
        Ok(Some(principal))
    }

    async fn find_principal_where(&self, predicate: &str, value: &str) -> Result<Option<Principal>, ServiceError> {
        let sql = format!(
            "SELECT {} FROM principals WHERE {} ORDER BY is_deleted ASC LIMIT 1",
            PRINCIPAL_COLUMNS, predicate
        );
        let principal = sqlx::query_as::<_, Principal>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        self.with_grants(principal).await
    }
}

#[async_trait]
impl AllowListStore for Database {
    async fn active_entries(&self, now: DateTime<Utc>) -> Result<Vec<AllowListEntry>, ServiceError> {
        let entries = sqlx::query_as::<_, AllowListEntry>(
            r#"
            SELECT entry_id, ip_address, principal_id, label, expires_utc, is_active, created_utc, created_by
            FROM allow_list_entries
            WHERE is_active AND (expires_utc IS NULL OR expires_utc > $1)
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}

#[async_trait]
impl PrincipalStore for Database {
    async fn find_principal(&self, principal_id: Uuid) -> Result<Option<Principal>, ServiceError> {
        let sql = format!("SELECT {} FROM principals WHERE principal_id = $1", PRINCIPAL_COLUMNS);
        let principal = sqlx::query_as::<_, Principal>(&sql)
            .bind(principal_id)
            .fetch_optional(&self.pool)
            .await?;
        self.with_grants(principal).await
    }

    async fn find_principal_by_login(&self, login: &str) -> Result<Option<Principal>, ServiceError> {
        if let Some(principal) = self.find_principal_where("lower(email) = lower($1)", login).await? {
            return Ok(Some(principal));
        }
        self.find_principal_where("lower(user_name) = lower($1)", login).await
    }

    async fn list_principals(&self) -> Result<Vec<Principal>, ServiceError> {
        let sql = format!(
            "SELECT {} FROM principals WHERE NOT is_deleted ORDER BY email",
            PRINCIPAL_COLUMNS
        );
        let mut principals = sqlx::query_as::<_, Principal>(&sql).fetch_all(&self.pool).await?;

        let ids: Vec<Uuid> = principals.iter().map(|p| p.principal_id).collect();
        let mut grants = self.load_scope_grants(&ids).await?;
        for principal in &mut principals {
            principal.scope_grants = grants.remove(&principal.principal_id).unwrap_or_default();
        }
        Ok(principals)
    }

    async fn record_login(&self, principal_id: Uuid, at: DateTime<Utc>) -> Result<(), ServiceError> {
        let result = sqlx::query("UPDATE principals SET last_login_utc = $2 WHERE principal_id = $1")
            .bind(principal_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::PrincipalNotFound(principal_id));
        }
        Ok(())
    }

    async fn save_attention(
        &self,
        principal_id: Uuid,
        expected_version: i64,
        state: &AttentionState,
    ) -> Result<bool, ServiceError> {
        let result = sqlx::query(
            r#"
            UPDATE principals
            SET is_new_user = $3,
                needs_attention = $4,
                attention_created_utc = $5,
                attention_ignored_utc = $6,
                attention_ignored_by = $7,
                attention_version = attention_version + 1
            WHERE principal_id = $1 AND attention_version = $2
            "#,
        )
        .bind(principal_id)
        .bind(expected_version)
        .bind(state.is_new_user)
        .bind(state.needs_attention)
        .bind(state.attention_created_utc)
        .bind(state.attention_ignored_utc)
        .bind(&state.attention_ignored_by)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl RoleStore for Database {
    async fn find_role_with_grants(&self, role_id: Uuid) -> Result<Option<RoleWithGrants>, ServiceError> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT role_id, role_name, is_superadmin, is_active FROM roles WHERE role_id = $1",
        )
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(role) = role else {
            return Ok(None);
        };

        let grants = sqlx::query_as::<_, RolePermissionGrant>(
            r#"
            SELECT rp.role_id, p.permission_name, rp.is_granted, rp.is_active,
                   p.is_active AS permission_is_active
            FROM role_permissions rp
            JOIN permissions p ON p.permission_id = rp.permission_id
            WHERE rp.role_id = $1
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(RoleWithGrants { role, grants }))
    }
}

#[async_trait]
impl AccessAttemptStore for Database {
    async fn record_attempt(
        &self,
        attempt: &AttemptContext,
        at: DateTime<Utc>,
    ) -> Result<AccessAttemptRecord, ServiceError> {
        let sql = format!(
            r#"
            INSERT INTO access_attempt_log (
                attempt_id, ip_address, user_agent, request_path, referer, access_attempts,
                first_attempt_utc, last_attempt_utc, created_utc, created_by, is_active
            )
            VALUES ($1, $2, $3, $4, $5, 1, $6, $6, $6, $7, TRUE)
            ON CONFLICT (ip_address) WHERE is_active DO UPDATE SET
                access_attempts = access_attempt_log.access_attempts + 1,
                last_attempt_utc = EXCLUDED.last_attempt_utc,
                updated_utc = EXCLUDED.last_attempt_utc,
                updated_by = EXCLUDED.created_by,
                user_agent = COALESCE(EXCLUDED.user_agent, access_attempt_log.user_agent),
                request_path = COALESCE(EXCLUDED.request_path, access_attempt_log.request_path),
                referer = COALESCE(EXCLUDED.referer, access_attempt_log.referer)
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );

        let record = sqlx::query_as::<_, AccessAttemptRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&attempt.ip_address)
            .bind(&attempt.user_agent)
            .bind(&attempt.request_path)
            .bind(&attempt.referer)
            .bind(at)
            .bind(SYSTEM_ACTOR)
            .fetch_one(&self.pool)
            .await?;
        Ok(record)
    }

    async fn find_active_attempt(&self, ip_address: &str) -> Result<Option<AccessAttemptRecord>, ServiceError> {
        let sql = format!(
            "SELECT {} FROM access_attempt_log WHERE ip_address = $1 AND is_active",
            ATTEMPT_COLUMNS
        );
        let record = sqlx::query_as::<_, AccessAttemptRecord>(&sql)
            .bind(ip_address)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn list_active_attempts(&self) -> Result<Vec<AccessAttemptRecord>, ServiceError> {
        let sql = format!(
            "SELECT {} FROM access_attempt_log WHERE is_active ORDER BY last_attempt_utc DESC",
            ATTEMPT_COLUMNS
        );
        let records = sqlx::query_as::<_, AccessAttemptRecord>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }
}

#[async_trait]
impl AccessStore for Database {
    /// Health check - ping the database.
    async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(|e| {
            tracing::error!("Database health check failed: {}", e);
            ServiceError::from(e)
        })?;
        Ok(())
    }
}
