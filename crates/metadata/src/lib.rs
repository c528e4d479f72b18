//! Record storage for aifriend.
//!
//! This crate provides the persisted data model:
//! - Users with unique usernames and PHC password hashes
//! - Character profiles owned by users, with asset references
//! - Tombstones: rows with `deleted_at` set are invisible to all lookups

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use models::{CharacterChanges, CharacterRow, NewCharacter, NewUser, UserRow};
pub use repos::{CharacterRepo, UserRepo};
pub use store::{MetadataStore, SqliteStore};

use aifriend_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            if path.as_os_str().is_empty() {
                return Err(MetadataError::Config(
                    "metadata.path cannot be empty".to_string(),
                ));
            }
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
