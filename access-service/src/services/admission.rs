//! Network admission gate.
//!
//! Every request is checked against the live allow-list before any
//! authentication happens. The gate fails closed: store faults deny.

use chrono::{DateTime, Utc};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use uuid::Uuid;

use super::metrics;
use super::range_matcher;
use super::store::{AccessAttemptStore, AllowListStore, PrincipalStore};
use crate::models::{AllowListEntry, AttemptContext};

/// Where denied requests are sent. Denied parties get no further detail.
pub const DENIAL_REDIRECT_URL: &str = "https://www.InsureDaily.co.uk";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    AddressUnresolved,
    NotAllowListed,
    PrincipalInactiveOrDeleted,
    BindingConflict,
    StoreFailure,
}

impl DenialReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddressUnresolved => "address_unresolved",
            Self::NotAllowListed => "not_allow_listed",
            Self::PrincipalInactiveOrDeleted => "principal_inactive_or_deleted",
            Self::BindingConflict => "binding_conflict",
            Self::StoreFailure => "store_failure",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admit,
    Deny(DenialReason),
}

impl AdmissionDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit)
    }
}

/// The parts of an inbound request the gate looks at.
#[derive(Debug, Clone, Default)]
pub struct AdmissionRequest {
    pub client_addr: Option<IpAddr>,
    /// Principal of a valid session token, if the request carries one.
    pub principal_id: Option<Uuid>,
    pub user_agent: Option<String>,
    pub request_path: Option<String>,
    pub referer: Option<String>,
}

/// Entries whose pattern covers `address`.
pub fn matching_entries<'a>(address: &str, entries: &'a [AllowListEntry]) -> Vec<&'a AllowListEntry> {
    entries
        .iter()
        .filter(|entry| range_matcher::matches(address, &entry.ip_address))
        .collect()
}

#[derive(Clone)]
pub struct AdmissionGate {
    allow_list: Arc<dyn AllowListStore>,
    principals: Arc<dyn PrincipalStore>,
    attempts: Arc<dyn AccessAttemptStore>,
}

impl AdmissionGate {
    pub fn new(
        allow_list: Arc<dyn AllowListStore>,
        principals: Arc<dyn PrincipalStore>,
        attempts: Arc<dyn AccessAttemptStore>,
    ) -> Self {
        Self {
            allow_list,
            principals,
            attempts,
        }
    }

    /// Decide admission and record the attempt when denied.
    pub async fn evaluate(&self, request: &AdmissionRequest) -> AdmissionDecision {
        let now = Utc::now();
        match self.decide(request, now).await {
            Ok(()) => AdmissionDecision::Admit,
            Err(reason) => {
                self.record_denial(request, reason, now).await;
                AdmissionDecision::Deny(reason)
            }
        }
    }

    async fn decide(&self, request: &AdmissionRequest, now: DateTime<Utc>) -> Result<(), DenialReason> {
        let address = request
            .client_addr
            .ok_or(DenialReason::AddressUnresolved)?
            .to_string();

        let entries = self.allow_list.active_entries(now).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to load allow-list entries");
            DenialReason::StoreFailure
        })?;

        if matching_entries(&address, &entries).is_empty() {
            return Err(DenialReason::NotAllowListed);
        }

        if let Some(principal_id) = request.principal_id {
            let principal = self.principals.find_principal(principal_id).await.map_err(|e| {
                tracing::error!(error = %e, principal_id = %principal_id, "Failed to load session principal");
                DenialReason::StoreFailure
            })?;
            match principal {
                Some(p) if p.is_enabled() => {}
                _ => return Err(DenialReason::PrincipalInactiveOrDeleted),
            }
        }

        Ok(())
    }

    async fn record_denial(&self, request: &AdmissionRequest, reason: DenialReason, now: DateTime<Utc>) {
        metrics::record_admission_denial(reason.as_str());

        let Some(addr) = request.client_addr else {
            tracing::warn!(
                reason = %reason,
                path = request.request_path.as_deref().unwrap_or(""),
                "Request denied without a resolvable client address"
            );
            return;
        };

        let attempt = AttemptContext::new(
            addr.to_string(),
            request.user_agent.as_deref(),
            request.request_path.as_deref(),
            request.referer.as_deref(),
        );

        match self.attempts.record_attempt(&attempt, now).await {
            Ok(record) => tracing::warn!(
                ip = %record.ip_address,
                reason = %reason,
                attempts = record.access_attempts,
                path = record.request_path.as_deref().unwrap_or(""),
                "Request denied by admission gate"
            ),
            Err(e) => tracing::error!(
                ip = %attempt.ip_address,
                reason = %reason,
                error = %e,
                "Request denied; failed to record access attempt"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Principal;
    use crate::services::memory::MemoryStore;
    use crate::services::store::AccessAttemptStore;

    fn gate(store: &Arc<MemoryStore>) -> AdmissionGate {
        AdmissionGate::new(store.clone(), store.clone(), store.clone())
    }

    fn from(addr: &str) -> AdmissionRequest {
        AdmissionRequest {
            client_addr: addr.parse().ok(),
            request_path: Some("/auth/login".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_admits_address_in_range() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_allow_list_entry(AllowListEntry::office("10.0.0.0/8", None))
            .unwrap();
        let decision = gate(&store).evaluate(&from("10.20.30.40")).await;
        assert_eq!(decision, AdmissionDecision::Admit);
        assert!(store.list_active_attempts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bound_entries_admit_anonymous_requests() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_allow_list_entry(AllowListEntry::bound_to("10.0.0.9", Uuid::new_v4()))
            .unwrap();
        assert!(gate(&store).evaluate(&from("10.0.0.9")).await.is_admitted());
    }

    #[tokio::test]
    async fn test_denial_is_recorded_per_address() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(&store);
        for _ in 0..3 {
            let decision = gate.evaluate(&from("203.0.113.5")).await;
            assert_eq!(decision, AdmissionDecision::Deny(DenialReason::NotAllowListed));
        }
        let record = store.find_active_attempt("203.0.113.5").await.unwrap().unwrap();
        assert_eq!(record.access_attempts, 3);
        assert_eq!(record.request_path.as_deref(), Some("/auth/login"));
    }

    #[tokio::test]
    async fn test_expired_entry_denies() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_allow_list_entry(
                AllowListEntry::office("10.0.0.1", None).with_expiry(Utc::now() - chrono::Duration::seconds(1)),
            )
            .unwrap();
        let decision = gate(&store).evaluate(&from("10.0.0.1")).await;
        assert_eq!(decision, AdmissionDecision::Deny(DenialReason::NotAllowListed));
    }

    #[tokio::test]
    async fn test_unresolved_address_denies_without_record() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_allow_list_entry(AllowListEntry::office("0.0.0.0/0", None))
            .unwrap();
        let decision = gate(&store).evaluate(&AdmissionRequest::default()).await;
        assert_eq!(decision, AdmissionDecision::Deny(DenialReason::AddressUnresolved));
        assert!(store.list_active_attempts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_session_principal_denies() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_allow_list_entry(AllowListEntry::office("10.0.0.0/8", None))
            .unwrap();
        let mut principal = Principal::new("gone", "gone@example.com", String::new());
        principal.is_deleted = true;
        let principal_id = principal.principal_id;
        store.insert_principal(principal).unwrap();

        let request = AdmissionRequest {
            principal_id: Some(principal_id),
            ..from("10.1.1.1")
        };
        let decision = gate(&store).evaluate(&request).await;
        assert_eq!(decision, AdmissionDecision::Deny(DenialReason::PrincipalInactiveOrDeleted));

        let unknown = AdmissionRequest {
            principal_id: Some(Uuid::new_v4()),
            ..from("10.1.1.1")
        };
        let decision = gate(&store).evaluate(&unknown).await;
        assert_eq!(decision, AdmissionDecision::Deny(DenialReason::PrincipalInactiveOrDeleted));
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_allow_list_entry(AllowListEntry::office("0.0.0.0/0", None))
            .unwrap();
        store.set_unavailable(true);
        let decision = gate(&store).evaluate(&from("10.0.0.1")).await;
        assert_eq!(decision, AdmissionDecision::Deny(DenialReason::StoreFailure));
    }
}
