//! Access attempt model - audit trail of denied network origins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

pub const MAX_USER_AGENT_LEN: usize = 200;
pub const MAX_REQUEST_PATH_LEN: usize = 500;
pub const MAX_REFERER_LEN: usize = 100;

/// Actor recorded on attempt rows written by the admission gate.
pub const SYSTEM_ACTOR: &str = "System";

/// One row per denied source address while active.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AccessAttemptRecord {
    pub attempt_id: Uuid,
    #[schema(example = "203.0.113.7")]
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub request_path: Option<String>,
    pub referer: Option<String>,
    pub access_attempts: i32,
    pub first_attempt_utc: DateTime<Utc>,
    pub last_attempt_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub is_active: bool,
}

impl AccessAttemptRecord {
    /// First denial from an address.
    pub fn first(attempt: &AttemptContext, at: DateTime<Utc>) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            ip_address: attempt.ip_address.clone(),
            user_agent: attempt.user_agent.clone(),
            request_path: attempt.request_path.clone(),
            referer: attempt.referer.clone(),
            access_attempts: 1,
            first_attempt_utc: at,
            last_attempt_utc: at,
            created_utc: at,
            updated_utc: None,
            created_by: Some(SYSTEM_ACTOR.to_string()),
            updated_by: None,
            is_active: true,
        }
    }

    /// Fold a repeated denial into this record.
    pub fn refresh(&mut self, attempt: &AttemptContext, at: DateTime<Utc>) {
        self.access_attempts = self.access_attempts.saturating_add(1);
        self.last_attempt_utc = at;
        self.updated_utc = Some(at);
        self.updated_by = Some(SYSTEM_ACTOR.to_string());
        if attempt.user_agent.is_some() {
            self.user_agent = attempt.user_agent.clone();
        }
        if attempt.request_path.is_some() {
            self.request_path = attempt.request_path.clone();
        }
        if attempt.referer.is_some() {
            self.referer = attempt.referer.clone();
        }
    }
}

/// Request context captured for a denied request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptContext {
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub request_path: Option<String>,
    pub referer: Option<String>,
}

impl AttemptContext {
    /// Empty values are dropped and long values are cut to the column limits.
    pub fn new(
        ip_address: impl Into<String>,
        user_agent: Option<&str>,
        request_path: Option<&str>,
        referer: Option<&str>,
    ) -> Self {
        Self {
            ip_address: ip_address.into(),
            user_agent: clip(user_agent, MAX_USER_AGENT_LEN),
            request_path: clip(request_path, MAX_REQUEST_PATH_LEN),
            referer: clip(referer, MAX_REFERER_LEN),
        }
    }
}

fn clip(value: Option<&str>, max_chars: usize) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.chars().take(max_chars).collect())
}
