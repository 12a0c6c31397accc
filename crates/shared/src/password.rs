//! Password hashing with Argon2id.
//!
//! Callers depend on the [`PasswordHasher`] capability rather than on argon2
//! directly, so the identity layer only ever sees `hash` and `verify`.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

/// Error type for password operations.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Opaque hash/verify capability.
pub trait PasswordHasher: Send + Sync {
    /// Hashes `plain` into a self-describing PHC string.
    fn hash(&self, plain: &str) -> Result<String, PasswordError>;

    /// Returns `Ok(false)` on mismatch; errors only on malformed hashes.
    fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError>;
}

/// OWASP (2024) baseline: 19 MiB, 2 passes, 1 lane.
const MEMORY_COST: u32 = 19456;
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;
const OUTPUT_LEN: usize = 32;

/// Argon2id implementation of [`PasswordHasher`].
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    memory_cost: u32,
    time_cost: u32,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self {
            memory_cost: MEMORY_COST,
            time_cost: TIME_COST,
        }
    }

    /// Cheaper parameters, for tests and local fixtures.
    pub fn with_cost(memory_cost: u32, time_cost: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(self.memory_cost, self.time_cost, PARALLELISM, Some(OUTPUT_LEN))
            .map_err(|e| PasswordError::HashError(format!("invalid Argon2 params: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()?
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashError(e.to_string()))
    }

    fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

        // Parameters are read back from the PHC string.
        match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerifyError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> Argon2Hasher {
        Argon2Hasher::with_cost(1024, 1)
    }

    #[test]
    fn test_default_hash_uses_owasp_params() {
        let hash = Argon2Hasher::new().hash("test_password").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=19456,t=2,p=1$"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = fast();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_verify_roundtrip() {
        let hasher = fast();
        let hash = hasher.hash("correct horse").unwrap();
        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(!hasher.verify("battery staple", &hash).unwrap());
    }

    #[test]
    fn test_verify_across_cost_settings() {
        let hash = fast().hash("portable").unwrap();
        assert!(Argon2Hasher::new().verify("portable", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        let result = fast().verify("password", "not-a-phc-string");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[test]
    fn test_unicode_password() {
        let hasher = fast();
        let hash = hasher.hash("pallone⚽calcetto").unwrap();
        assert!(hasher.verify("pallone⚽calcetto", &hash).unwrap());
    }

    #[test]
    fn test_usable_as_trait_object() {
        let hasher: Box<dyn PasswordHasher> = Box::new(fast());
        let hash = hasher.hash("dyn").unwrap();
        assert!(hasher.verify("dyn", &hash).unwrap());
    }
}
