//! Services layer for access-service.
//!
//! Admission and sign-in gates, capability projection, policy resolution,
//! attention tracking and their store boundaries.

pub mod admission;
pub mod attention;
pub mod claims;
mod database;
pub mod error;
pub mod jwt;
pub mod memory;
pub mod metrics;
pub mod policy;
pub mod range_matcher;
pub mod sign_in;
pub mod store;

pub use admission::{AdmissionDecision, AdmissionGate, AdmissionRequest, DenialReason, DENIAL_REDIRECT_URL};
pub use attention::{AttentionEngine, ReconcileReport};
pub use claims::SessionClaimsProjector;
pub use database::Database;
pub use error::ServiceError;
pub use jwt::{JwtService, SessionClaims, SessionToken};
pub use memory::MemoryStore;
pub use policy::{PermissionPolicyResolver, Policy};
pub use sign_in::{SignInGate, SignInOutcome};
pub use store::{AccessAttemptStore, AccessStore, AllowListStore, PrincipalStore, RoleStore};
