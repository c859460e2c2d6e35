//! HTTP handlers for access-service.

pub mod access_attempts;
pub mod alerts;
pub mod authz;
pub mod metrics;
pub mod session;

pub use access_attempts::*;
pub use alerts::*;
pub use authz::*;
pub use session::*;
