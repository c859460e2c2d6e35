use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Store error: {0}")]
    Store(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Principal not found: {0}")]
    PrincipalNotFound(Uuid),

    #[error("Concurrent update on principal {0}")]
    ConcurrentUpdate(Uuid),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Access denied")]
    AccessDenied,
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Store(anyhow::Error::new(err))
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Store(e) => AppError::DatabaseError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::PrincipalNotFound(id) => {
                AppError::NotFound(anyhow::anyhow!("Principal {} not found", id))
            }
            ServiceError::ConcurrentUpdate(id) => {
                AppError::Conflict(anyhow::anyhow!("Principal {} was modified concurrently", id))
            }
            ServiceError::InvalidCredentials => AppError::AuthError(anyhow::anyhow!("Invalid credentials")),
            ServiceError::AccessDenied => AppError::Forbidden(anyhow::anyhow!("Access denied")),
        }
    }
}
