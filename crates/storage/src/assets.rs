//! Asset persistence with collision-resistant naming.

use crate::error::{StorageError, StorageResult};
use crate::traits::ObjectStore;
use aifriend_core::{AssetCategory, AssetPath, AssetPurpose, ImageType};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Random bytes in every generated filename.
pub const NAME_ENTROPY_BYTES: usize = 8;

/// Attempts before giving up on finding a free filename.
const MAX_NAME_ATTEMPTS: usize = 3;

/// What a new asset is for and who owns it.
#[derive(Clone, Copy, Debug)]
pub struct NamingContext {
    pub purpose: AssetPurpose,
    pub owner_id: i64,
    pub image: ImageType,
}

impl NamingContext {
    pub fn new(purpose: AssetPurpose, owner_id: i64, image: ImageType) -> Self {
        Self {
            purpose,
            owner_id,
            image,
        }
    }

    /// `{purpose}_{owner_id}_{random_hex}.{ext}`
    fn filename(&self, random: &[u8]) -> String {
        format!(
            "{}_{}_{}.{}",
            self.purpose.prefix(),
            self.owner_id,
            hex::encode(random),
            self.image.extension()
        )
    }
}

/// A freshly persisted asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedAsset {
    pub path: AssetPath,
    /// Public reference stored in rows and returned to clients.
    pub public_path: String,
}

/// Durable asset persistence over one object store per category.
#[derive(Clone)]
pub struct AssetStore {
    avatars: Arc<dyn ObjectStore>,
    characters: Arc<dyn ObjectStore>,
    api_prefix: String,
}

impl AssetStore {
    pub fn new(
        avatars: Arc<dyn ObjectStore>,
        characters: Arc<dyn ObjectStore>,
        api_prefix: impl Into<String>,
    ) -> Self {
        Self {
            avatars,
            characters,
            api_prefix: api_prefix.into(),
        }
    }

    fn backend(&self, category: AssetCategory) -> &Arc<dyn ObjectStore> {
        match category {
            AssetCategory::Avatars => &self.avatars,
            AssetCategory::Characters => &self.characters,
        }
    }

    /// Write `data` under a fresh random name.
    ///
    /// Never overwrites: a name collision draws a new suffix.
    #[instrument(skip(self, data), fields(purpose = %naming.purpose, owner_id = naming.owner_id, size = data.len()))]
    pub async fn persist(
        &self,
        data: Bytes,
        naming: &NamingContext,
    ) -> StorageResult<PersistedAsset> {
        let category = naming.purpose.category();
        let backend = self.backend(category);

        for _ in 0..MAX_NAME_ATTEMPTS {
            let mut random = [0u8; NAME_ENTROPY_BYTES];
            getrandom::getrandom(&mut random).map_err(|e| {
                StorageError::Io(std::io::Error::other(format!(
                    "random source unavailable: {e}"
                )))
            })?;

            let path = AssetPath::new(category, naming.filename(&random))?;
            if backend
                .put_if_not_exists(path.filename(), data.clone())
                .await?
            {
                debug!(path = %path, "asset persisted");
                let public_path = path.to_public(&self.api_prefix);
                return Ok(PersistedAsset { path, public_path });
            }
        }

        Err(StorageError::NameExhausted(MAX_NAME_ATTEMPTS))
    }

    /// Delete an asset. Deleting a missing asset succeeds.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn remove(&self, path: &AssetPath) -> StorageResult<()> {
        match self.backend(path.category()).delete(path.filename()).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!("asset already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Delete an asset by its public reference.
    pub async fn remove_public(&self, public_path: &str) -> StorageResult<()> {
        let path = self.parse_public(public_path)?;
        self.remove(&path).await
    }

    pub fn parse_public(&self, public_path: &str) -> StorageResult<AssetPath> {
        Ok(AssetPath::parse_public(public_path, &self.api_prefix)?)
    }

    pub async fn read(&self, path: &AssetPath) -> StorageResult<Bytes> {
        self.backend(path.category()).get(path.filename()).await
    }

    /// Check every backend.
    pub async fn health_check(&self) -> StorageResult<()> {
        self.avatars.health_check().await?;
        self.characters.health_check().await
    }
}

impl std::fmt::Debug for AssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetStore")
            .field("avatars", &self.avatars.backend_name())
            .field("characters", &self.characters.backend_name())
            .field("api_prefix", &self.api_prefix)
            .finish()
    }
}
