//! Sign-in gate: origin binding check composed ahead of credential verification.

use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use uuid::Uuid;

use super::admission::{matching_entries, DenialReason};
use super::metrics;
use super::store::{AllowListStore, PrincipalStore};
use crate::models::{AllowListEntry, Principal};
use crate::utils::{CredentialVerifier, Password};

#[derive(Debug, Clone)]
pub enum SignInOutcome {
    Success(Principal),
    NotAllowed(DenialReason),
    Failed,
    BindingConflict { owners: Vec<Uuid> },
}

impl SignInOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::NotAllowed(_) => "not_allowed",
            Self::Failed => "failed",
            Self::BindingConflict { .. } => "binding_conflict",
        }
    }
}

/// Result of checking a sign-in origin against the live allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginCheck {
    /// A global entry matched.
    Office,
    /// An entry bound to this principal matched.
    Individual,
    /// Only entries bound to other principals matched.
    Conflict(Vec<Uuid>),
    NotListed,
}

/// Decide whether `principal_id` may sign in from `address`.
///
/// Global entries win over bound ones. Among bound entries only the
/// principal's own binding authorizes.
pub fn authorize_origin(principal_id: Uuid, address: &str, entries: &[AllowListEntry]) -> OriginCheck {
    let matching = matching_entries(address, entries);
    if matching.is_empty() {
        return OriginCheck::NotListed;
    }
    if matching.iter().any(|e| e.is_global()) {
        return OriginCheck::Office;
    }
    if matching.iter().any(|e| e.principal_id == Some(principal_id)) {
        return OriginCheck::Individual;
    }

    let mut owners: Vec<Uuid> = matching.iter().filter_map(|e| e.principal_id).collect();
    owners.sort();
    owners.dedup();
    OriginCheck::Conflict(owners)
}

#[derive(Clone)]
pub struct SignInGate {
    principals: Arc<dyn PrincipalStore>,
    allow_list: Arc<dyn AllowListStore>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl SignInGate {
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        allow_list: Arc<dyn AllowListStore>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            principals,
            allow_list,
            verifier,
        }
    }

    /// Sign in by email or user name.
    pub async fn sign_in(&self, login: &str, password: &Password, client_addr: Option<IpAddr>) -> SignInOutcome {
        let principal = match self.principals.find_principal_by_login(login.trim()).await {
            Ok(Some(principal)) => principal,
            Ok(None) => {
                tracing::info!("Sign-in failed: unknown login");
                return finish(SignInOutcome::Failed);
            }
            Err(e) => {
                tracing::error!(error = %e, "Sign-in principal lookup failed");
                return finish(SignInOutcome::NotAllowed(DenialReason::StoreFailure));
            }
        };
        self.sign_in_principal(principal, password, client_addr).await
    }

    /// Sign in an already resolved principal.
    pub async fn sign_in_principal(
        &self,
        principal: Principal,
        password: &Password,
        client_addr: Option<IpAddr>,
    ) -> SignInOutcome {
        let outcome = self.check(principal, password, client_addr).await;
        finish(outcome)
    }

    async fn check(&self, principal: Principal, password: &Password, client_addr: Option<IpAddr>) -> SignInOutcome {
        let principal_id = principal.principal_id;
        if !principal.is_enabled() {
            tracing::warn!(principal_id = %principal_id, "Sign-in refused for inactive or deleted principal");
            return SignInOutcome::NotAllowed(DenialReason::PrincipalInactiveOrDeleted);
        }

        let Some(addr) = client_addr else {
            tracing::warn!(principal_id = %principal_id, "Sign-in refused: client address unresolved");
            return SignInOutcome::NotAllowed(DenialReason::AddressUnresolved);
        };
        let address = addr.to_string();

        let entries = match self.allow_list.active_entries(Utc::now()).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %e, principal_id = %principal_id, "Failed to load allow-list for sign-in");
                return SignInOutcome::NotAllowed(DenialReason::StoreFailure);
            }
        };

        match authorize_origin(principal_id, &address, &entries) {
            OriginCheck::Office | OriginCheck::Individual => {}
            OriginCheck::NotListed => {
                tracing::warn!(principal_id = %principal_id, ip = %address, "Sign-in refused: origin not allow-listed");
                return SignInOutcome::NotAllowed(DenialReason::NotAllowListed);
            }
            OriginCheck::Conflict(owners) => {
                let owner_list = owners.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
                tracing::warn!(
                    principal_id = %principal_id,
                    ip = %address,
                    owners = %owner_list,
                    "Sign-in refused: origin is bound to other principals"
                );
                return SignInOutcome::BindingConflict { owners };
            }
        }

        match self.verifier.verify(&principal, password).await {
            Ok(true) => SignInOutcome::Success(principal),
            Ok(false) => {
                tracing::info!(principal_id = %principal_id, "Sign-in failed: invalid credentials");
                SignInOutcome::Failed
            }
            Err(e) => {
                tracing::error!(principal_id = %principal_id, error = %e, "Credential verification error");
                SignInOutcome::Failed
            }
        }
    }
}

fn finish(outcome: SignInOutcome) -> SignInOutcome {
    metrics::record_sign_in_outcome(outcome.label());
    outcome
}
