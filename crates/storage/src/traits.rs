//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Flat key/value object store.
///
/// Keys are single path segments. Implementations provide atomic
/// create and delete of one named object, and nothing more: there
/// is no multi-object transaction.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object in full.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Write an object only if the key is free. Returns `false` when taken.
    async fn put_if_not_exists(&self, key: &str, data: Bytes) -> StorageResult<bool>;

    /// Delete an object. Missing objects fail with `NotFound`.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is usable.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
