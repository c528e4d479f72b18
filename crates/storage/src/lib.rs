//! Asset storage for aifriend.
//!
//! This crate provides:
//! - A flat `ObjectStore` abstraction with atomic single-object writes
//! - A local filesystem backend with traversal and symlink protection
//! - `AssetStore`: collision-resistant naming, public paths, idempotent removal

pub mod assets;
pub mod backends;
pub mod error;
pub mod traits;

pub use assets::{AssetStore, NAME_ENTROPY_BYTES, NamingContext, PersistedAsset};
pub use backends::filesystem::FilesystemBackend;
pub use error::{StorageError, StorageResult};
pub use traits::ObjectStore;

use aifriend_core::config::UploadConfig;
use std::sync::Arc;

/// Create the asset store from configuration.
pub async fn from_config(config: &UploadConfig, api_prefix: &str) -> StorageResult<AssetStore> {
    if config.avatar_dir.as_os_str().is_empty() || config.character_dir.as_os_str().is_empty() {
        return Err(StorageError::Config(
            "upload directories cannot be empty".to_string(),
        ));
    }

    let avatars = FilesystemBackend::new(&config.avatar_dir).await?;
    let characters = FilesystemBackend::new(&config.character_dir).await?;
    Ok(AssetStore::new(
        Arc::new(avatars),
        Arc::new(characters),
        api_prefix,
    ))
}
