use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AuthzCheckRequest {
    /// Permission name (e.g. `User.Read`) or named policy
    #[validate(length(min = 1, max = 200, message = "Policy name is required"))]
    #[schema(example = "User.Read")]
    pub policy: String,

    /// Resource that must be in the session's scope
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "7d2f0c1e-4b0a-4c4e-9d8c-3f2b6a1e9a10")]
    pub resource_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthzCheckResponse {
    pub allowed: bool,
    #[schema(example = "permission")]
    pub policy_kind: String,
}
