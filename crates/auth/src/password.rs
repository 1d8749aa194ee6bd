//! One-way password hashing (Argon2id, PHC string format).

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use argon2::{PasswordHasher as _, PasswordVerifier as _};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("invalid password hasher parameters: {0}")]
    InvalidParams(String),

    #[error("password hashing failed: {0}")]
    Fatal(String),
}

/// Hashes secrets and verifies them against stored hashes.
///
/// `verify` never reports *why* a check failed: a wrong secret and an
/// unparsable hash both yield `false`.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, PasswordError>;
    fn verify(&self, secret: &str, hash: &str) -> bool;
}

/// Argon2 work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHasherConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordHasherConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl PasswordHasherConfig {
    /// Cheapest accepted parameters. Only meant for tests.
    pub fn low_cost() -> Self {
        Self {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Argon2id hasher with a random per-hash salt.
#[derive(Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    pub fn new(config: PasswordHasherConfig) -> Result<Self, PasswordError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, secret: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::Fatal(e.to_string()))
    }

    fn verify(&self, secret: &str, hash: &str) -> bool {
        // Parameters come from the PHC string, so hashes made under an older
        // work factor still verify.
        PasswordHash::new(hash)
            .map(|parsed| self.argon2.verify_password(secret.as_bytes(), &parsed).is_ok())
            .unwrap_or(false)
    }
}

impl core::fmt::Debug for Argon2PasswordHasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Argon2PasswordHasher").finish_non_exhaustive()
    }
}
