//! Password service - one-way salted hashing for stored secrets
//!
//! Argon2id with a fresh random salt per hash, encoded as a PHC string so
//! the parameters travel with the hash.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

use crate::domain::result::{Error, Result};
use crate::domain::Argon2Params;

/// Salt length in bytes
const SALT_LEN: usize = 16;

/// Hashes and verifies passwords
#[derive(Debug, Clone)]
pub struct PasswordService {
    params: Argon2Params,
}

impl PasswordService {
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.params.memory_cost,
            self.params.time_cost,
            self.params.parallelism,
            Some(self.params.hash_len as usize),
        )
        .map_err(|e| Error::hashing(format!("Invalid argon2 params: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a clear-text password into a PHC string
    pub fn hash(&self, password: &str) -> Result<String> {
        let mut salt_bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::hashing(format!("Failed to encode salt: {}", e)))?;

        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::hashing(format!("Failed to hash password: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Check a clear-text password against a stored PHC string
    ///
    /// Verification uses the parameters embedded in the hash, not the
    /// service's current ones, so old hashes keep verifying after a cost change.
    pub fn verify(&self, password: &str, phc: &str) -> Result<bool> {
        let parsed = PasswordHash::new(phc)
            .map_err(|e| Error::hashing(format!("Malformed password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordService {
        PasswordService::new(Argon2Params {
            time_cost: 1,
            memory_cost: 1024,
            parallelism: 1,
            hash_len: 32,
        })
    }

    #[test]
    fn test_hash_is_not_clear_text() {
        let hash = cheap().hash("s3cret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("s3cret"));
    }

    #[test]
    fn test_hash_is_salted() {
        let service = cheap();
        assert_ne!(service.hash("same").unwrap(), service.hash("same").unwrap());
    }

    #[test]
    fn test_verify() {
        let service = cheap();
        let hash = service.hash("correct horse").unwrap();
        assert!(service.verify("correct horse", &hash).unwrap());
        assert!(!service.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn test_verify_malformed_hash() {
        assert!(matches!(cheap().verify("x", "not-a-hash"), Err(Error::Hashing(_))));
    }

    #[test]
    fn test_invalid_params() {
        let service = PasswordService::new(Argon2Params {
            time_cost: 0,
            ..Argon2Params::default()
        });
        assert!(matches!(service.hash("x"), Err(Error::Hashing(_))));
    }
}
