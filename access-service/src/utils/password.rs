use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;

use crate::models::Principal;

/// Newtype for password to prevent accidental logging
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Hash a password using Argon2id with a generated salt.
pub fn hash_password(password: &Password) -> Result<String, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(password_hash)
}

/// Verify a password against a PHC-format hash.
///
/// Returns Ok(false) on mismatch and Err only when the hash is unreadable.
pub fn verify_password(password: &Password, password_hash: &str) -> Result<bool, anyhow::Error> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .is_ok())
}

/// Credential check run by the sign-in gate once the origin is authorized.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, principal: &Principal, password: &Password) -> Result<bool, anyhow::Error>;
}

/// Argon2 verification against the principal's stored hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Verifier;

#[async_trait]
impl CredentialVerifier for Argon2Verifier {
    async fn verify(&self, principal: &Principal, password: &Password) -> Result<bool, anyhow::Error> {
        let password = password.clone();
        let hash = principal.password_hash.clone();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let password = Password::new("mySecurePassword123".to_string());
        let hash = hash_password(&password).expect("Failed to hash password");
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_verify_password() {
        let password = Password::new("mySecurePassword123".to_string());
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(verify_password(&password, &hash).unwrap());
        let wrong = Password::new("wrongPassword".to_string());
        assert!(!verify_password(&wrong, &hash).unwrap());
    }

    #[test]
    fn test_unreadable_hash_is_an_error() {
        let password = Password::new("mySecurePassword123".to_string());
        assert!(verify_password(&password, "not-a-phc-string").is_err());
    }

    #[test]
    fn test_password_is_not_logged() {
        let password = Password::new("hunter2".to_string());
        assert_eq!(format!("{:?}", password), "Password(***)");
    }

    #[tokio::test]
    async fn test_argon2_verifier() {
        let password = Password::new("mySecurePassword123".to_string());
        let principal = Principal::new("jdoe", "jdoe@example.com", hash_password(&password).unwrap());
        assert!(Argon2Verifier.verify(&principal, &password).await.unwrap());
    }
}
