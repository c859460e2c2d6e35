pub mod admission;
pub mod auth;
pub mod metrics;
pub mod permission;

pub use admission::admission_middleware;
pub use auth::{session_middleware, AuthSession};
pub use metrics::metrics_middleware;
pub use permission::{require_policy, RequiredPolicy};
