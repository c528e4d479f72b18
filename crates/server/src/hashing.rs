//! Bounded worker pool for password hashing.
//!
//! Argon2 is deliberately CPU and memory heavy. Every hash or verify runs on
//! the blocking pool behind a semaphore, so a burst of logins cannot starve
//! the async workers serving unrelated requests.

use crate::credentials::CredentialError;
use aifriend_core::config::HashingConfig;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Password hashing pool with a fixed concurrency bound.
#[derive(Clone)]
pub struct PasswordHasherPool {
    permits: Arc<Semaphore>,
    params: Params,
}

impl PasswordHasherPool {
    pub fn new(config: &HashingConfig) -> Result<Self, CredentialError> {
        let params = Params::new(config.memory_kib, config.iterations, 1, None)
            .map_err(|e| CredentialError::Hashing(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self {
            permits: Arc::new(Semaphore::new(config.workers())),
            params,
        })
    }

    /// Hash a password into a PHC string embedding salt and parameters.
    pub async fn hash(&self, password: String) -> Result<String, CredentialError> {
        let params = self.params.clone();
        self.run(move || hash_blocking(&password, params)).await?
    }

    /// Check a password against a stored PHC string.
    ///
    /// Parameters are read from the PHC string, not from this pool's config,
    /// so hashes created under older settings still verify.
    pub async fn verify(
        &self,
        password: String,
        password_hash: String,
    ) -> Result<bool, CredentialError> {
        self.run(move || verify_blocking(&password, &password_hash))
            .await?
    }

    async fn run<T, F>(&self, job: F) -> Result<T, CredentialError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        // The permit moves into the job: dropping this future (a client
        // disconnect) must not free the slot while Argon2 is still running.
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| CredentialError::Hashing("hashing pool closed".to_string()))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
            .map_err(|e| CredentialError::Hashing(format!("hashing task failed: {e}")))
    }
}

impl std::fmt::Debug for PasswordHasherPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasherPool")
            .field("available", &self.permits.available_permits())
            .field("memory_kib", &self.params.m_cost())
            .field("iterations", &self.params.t_cost())
            .finish()
    }
}

fn hash_blocking(password: &str, params: Params) -> Result<String, CredentialError> {
    let mut salt_bytes = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|e| CredentialError::Hashing(format!("random source unavailable: {e}")))?;
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| CredentialError::Hashing(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CredentialError::Hashing(e.to_string()))?
        .to_string();
    Ok(phc)
}

fn verify_blocking(password: &str, password_hash: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| CredentialError::Hashing(format!("stored hash unreadable: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
