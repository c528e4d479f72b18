//! Character repository.

use crate::error::MetadataResult;
use crate::models::{CharacterChanges, CharacterRow, NewCharacter};
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for character records.
///
/// Ownership is not checked here; callers compare `user_id` themselves.
#[async_trait]
pub trait CharacterRepo: Send + Sync {
    /// Insert a character.
    async fn create_character(&self, character: &NewCharacter) -> MetadataResult<CharacterRow>;

    /// Get a live character by ID.
    async fn get_character(&self, character_id: i64) -> MetadataResult<Option<CharacterRow>>;

    /// List a user's live characters, newest first.
    async fn list_characters_for_user(&self, user_id: i64) -> MetadataResult<Vec<CharacterRow>>;

    /// Apply a non-empty partial update. Missing or tombstoned rows fail with `NotFound`.
    async fn update_character(
        &self,
        character_id: i64,
        changes: &CharacterChanges,
    ) -> MetadataResult<CharacterRow>;

    /// Set the tombstone. Returns the row as it was tombstoned.
    async fn tombstone_character(
        &self,
        character_id: i64,
        deleted_at: OffsetDateTime,
    ) -> MetadataResult<CharacterRow>;
}
