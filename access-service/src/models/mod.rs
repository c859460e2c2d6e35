pub mod access_attempt;
pub mod alert;
pub mod allow_list;
pub mod capability;
pub mod principal;
pub mod role;

pub use access_attempt::{AccessAttemptRecord, AttemptContext};
pub use alert::{AlertItem, AlertSummary, AttentionReason};
pub use allow_list::AllowListEntry;
pub use capability::SessionCapabilities;
pub use principal::{AttentionState, Principal, ResourceScopeGrant};
pub use role::{Role, RolePermissionGrant, RoleWithGrants};
