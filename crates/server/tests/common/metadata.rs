//! Metadata store test utilities.

use aifriend_metadata::{
    CharacterChanges, CharacterRepo, CharacterRow, MetadataError, MetadataResult, MetadataStore,
    NewCharacter, NewUser, SqliteStore, UserRepo, UserRow,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;
use time::OffsetDateTime;

/// A test metadata store wrapper that cleans up on drop.
#[allow(dead_code)]
pub struct TestMetadata {
    pub store: Arc<dyn MetadataStore>,
    pub sqlite_store: Arc<SqliteStore>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestMetadata {
    pub async fn new() -> MetadataResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let store = Arc::new(SqliteStore::new(temp_dir.path().join("test.db")).await?);

        Ok(Self {
            store: store.clone(),
            sqlite_store: store,
            _temp_dir: temp_dir,
        })
    }
}

/// SQLite store whose writes can be made to fail on demand.
#[allow(dead_code)]
#[derive(Default)]
pub struct FailureSwitches {
    pub create_character: AtomicBool,
    pub update_character: AtomicBool,
    pub update_avatar: AtomicBool,
}

#[allow(dead_code)]
pub struct FailingMetadata {
    inner: SqliteStore,
    pub fail: FailureSwitches,
}

#[allow(dead_code)]
impl FailingMetadata {
    pub fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            fail: FailureSwitches::default(),
        }
    }

    fn check(switch: &AtomicBool) -> MetadataResult<()> {
        if switch.load(Ordering::SeqCst) {
            return Err(MetadataError::Io(std::io::Error::other(
                "injected database failure",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepo for FailingMetadata {
    async fn create_user(&self, user: &NewUser) -> MetadataResult<UserRow> {
        self.inner.create_user(user).await
    }

    async fn get_user(&self, user_id: i64) -> MetadataResult<Option<UserRow>> {
        self.inner.get_user(user_id).await
    }

    async fn get_user_by_username(&self, username: &str) -> MetadataResult<Option<UserRow>> {
        self.inner.get_user_by_username(username).await
    }

    async fn update_password_hash(
        &self,
        user_id: i64,
        password_hash: &str,
    ) -> MetadataResult<()> {
        self.inner.update_password_hash(user_id, password_hash).await
    }

    async fn update_email(&self, user_id: i64, email: Option<&str>) -> MetadataResult<UserRow> {
        self.inner.update_email(user_id, email).await
    }

    async fn update_avatar(&self, user_id: i64, avatar: &str) -> MetadataResult<UserRow> {
        Self::check(&self.fail.update_avatar)?;
        self.inner.update_avatar(user_id, avatar).await
    }
}

#[async_trait]
impl CharacterRepo for FailingMetadata {
    async fn create_character(&self, character: &NewCharacter) -> MetadataResult<CharacterRow> {
        Self::check(&self.fail.create_character)?;
        self.inner.create_character(character).await
    }

    async fn get_character(&self, character_id: i64) -> MetadataResult<Option<CharacterRow>> {
        self.inner.get_character(character_id).await
    }

    async fn list_characters_for_user(&self, user_id: i64) -> MetadataResult<Vec<CharacterRow>> {
        self.inner.list_characters_for_user(user_id).await
    }

    async fn update_character(
        &self,
        character_id: i64,
        changes: &CharacterChanges,
    ) -> MetadataResult<CharacterRow> {
        Self::check(&self.fail.update_character)?;
        self.inner.update_character(character_id, changes).await
    }

    async fn tombstone_character(
        &self,
        character_id: i64,
        deleted_at: OffsetDateTime,
    ) -> MetadataResult<CharacterRow> {
        self.inner.tombstone_character(character_id, deleted_at).await
    }
}

#[async_trait]
impl MetadataStore for FailingMetadata {
    async fn migrate(&self) -> MetadataResult<()> {
        self.inner.migrate().await
    }

    async fn health_check(&self) -> MetadataResult<()> {
        self.inner.health_check().await
    }
}
