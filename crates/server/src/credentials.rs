//! Credential store: registration, login verification and password change.

use crate::hashing::PasswordHasherPool;
use aifriend_core::Subject;
use aifriend_metadata::{MetadataError, MetadataStore, NewUser, UserRow};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

/// Credential operation errors.
///
/// `InvalidCredentials`, `IdentityNotFound` and `PasswordMismatch` all render
/// as "invalid credentials" so callers cannot tell which check failed.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("username already exists: {0}")]
    Conflict(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid credentials")]
    IdentityNotFound(i64),

    #[error("invalid credentials")]
    PasswordMismatch,

    #[error("hashing error: {0}")]
    Hashing(String),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

/// Password storage and verification against user records.
pub struct CredentialStore {
    metadata: Arc<dyn MetadataStore>,
    hasher: PasswordHasherPool,
    /// Verified against when the username does not exist, so both failure
    /// paths spend the same hashing work.
    decoy_hash: OnceCell<String>,
}

impl CredentialStore {
    pub fn new(metadata: Arc<dyn MetadataStore>, hasher: PasswordHasherPool) -> Self {
        Self {
            metadata,
            hasher,
            decoy_hash: OnceCell::new(),
        }
    }

    /// Create a new identity. The username is matched exactly (case-sensitive).
    #[instrument(skip(self, password, email))]
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<String>,
    ) -> Result<UserRow, CredentialError> {
        if self.metadata.get_user_by_username(username).await?.is_some() {
            return Err(CredentialError::Conflict(username.to_string()));
        }

        let password_hash = self.hasher.hash(password.to_string()).await?;
        let user = NewUser {
            username: username.to_string(),
            password_hash,
            email,
        };

        // The unique index catches a concurrent registration that won the race.
        let row = self.metadata.create_user(&user).await.map_err(|e| match e {
            MetadataError::AlreadyExists(name) => CredentialError::Conflict(name),
            other => other.into(),
        })?;

        info!(user_id = row.id, "user registered");
        Ok(row)
    }

    /// Check a username/password pair.
    #[instrument(skip(self, password))]
    pub async fn verify(&self, username: &str, password: &str) -> Result<UserRow, CredentialError> {
        let Some(user) = self.metadata.get_user_by_username(username).await? else {
            let decoy = self.decoy_hash().await?;
            let _ = self.hasher.verify(password.to_string(), decoy).await?;
            debug!("login for unknown username");
            return Err(CredentialError::InvalidCredentials);
        };

        let matches = self
            .hasher
            .verify(password.to_string(), user.password_hash.clone())
            .await?;
        if !matches {
            debug!(user_id = user.id, "login with wrong password");
            return Err(CredentialError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Replace the password after re-verifying the old one.
    #[instrument(skip(self, old_password, new_password), fields(user_id = %subject.id))]
    pub async fn change_password(
        &self,
        subject: &Subject,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), CredentialError> {
        let user_id = subject.id.get();
        let user = self
            .metadata
            .get_user(user_id)
            .await?
            .ok_or(CredentialError::IdentityNotFound(user_id))?;

        let matches = self
            .hasher
            .verify(old_password.to_string(), user.password_hash)
            .await?;
        if !matches {
            return Err(CredentialError::PasswordMismatch);
        }

        let password_hash = self.hasher.hash(new_password.to_string()).await?;
        self.metadata
            .update_password_hash(user_id, &password_hash)
            .await
            .map_err(|e| match e {
                MetadataError::NotFound(_) => CredentialError::IdentityNotFound(user_id),
                other => other.into(),
            })?;

        info!("password changed");
        Ok(())
    }

    async fn decoy_hash(&self) -> Result<String, CredentialError> {
        self.decoy_hash
            .get_or_try_init(|| self.hasher.hash("decoy-password".to_string()))
            .await
            .cloned()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("hasher", &self.hasher)
            .finish()
    }
}
