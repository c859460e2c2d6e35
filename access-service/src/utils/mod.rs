pub mod password;
pub mod validation;

pub use password::{hash_password, verify_password, Argon2Verifier, CredentialVerifier, Password};
pub use validation::ValidatedJson;
