use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::SessionCapabilities;
use crate::services::SessionToken;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Email address or user name
    #[validate(length(min = 1, max = 256, message = "Login is required"))]
    #[schema(example = "user@example.com")]
    pub login: String,

    #[validate(length(min = 1, max = 256, message = "Password is required"))]
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: SessionToken,
    pub capabilities: SessionCapabilities,
}
