//! Application state shared across handlers.

use crate::credentials::{CredentialError, CredentialStore};
use crate::hashing::PasswordHasherPool;
use crate::ingest::IngestionCoordinator;
use aifriend_core::UploadValidator;
use aifriend_core::config::AppConfig;
use aifriend_metadata::MetadataStore;
use aifriend_storage::AssetStore;
use aifriend_token::{TokenError, TokenService};
use std::sync::Arc;

/// Errors building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid configuration: {0}")]
    Config(#[from] aifriend_core::Error),

    #[error("token service: {0}")]
    Token(#[from] TokenError),

    #[error("credential store: {0}")]
    Credentials(#[from] CredentialError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Record store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Asset persistence.
    pub assets: AssetStore,
    pub tokens: Arc<TokenService>,
    pub credentials: Arc<CredentialStore>,
    pub ingest: Arc<IngestionCoordinator>,
}

impl AppState {
    /// Create the application state.
    ///
    /// Every component receives its slice of `config` here; nothing reads
    /// configuration afterwards.
    pub fn new(
        config: AppConfig,
        metadata: Arc<dyn MetadataStore>,
        assets: AssetStore,
    ) -> Result<Self, StateError> {
        config.validate()?;

        let tokens = TokenService::from_config(&config.auth)?;
        let hasher = PasswordHasherPool::new(&config.hashing)?;
        let credentials = CredentialStore::new(metadata.clone(), hasher);
        let ingest = IngestionCoordinator::new(
            metadata.clone(),
            assets.clone(),
            UploadValidator::from_config(&config.upload),
        );

        Ok(Self {
            config: Arc::new(config),
            metadata,
            assets,
            tokens: Arc::new(tokens),
            credentials: Arc::new(credentials),
            ingest: Arc::new(ingest),
        })
    }

    /// Effective avatar size limit in bytes.
    pub fn avatar_limit(&self) -> u64 {
        self.ingest
            .validator()
            .limit_for(aifriend_core::AssetClass::Avatar)
    }

    /// Effective character image size limit in bytes.
    pub fn character_limit(&self) -> u64 {
        self.ingest
            .validator()
            .limit_for(aifriend_core::AssetClass::CharacterImage)
    }
}
