//! User repository.

use crate::error::MetadataResult;
use crate::models::{NewUser, UserRow};
use async_trait::async_trait;

/// Repository for user records.
///
/// Lookups never return tombstoned users.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a user. A taken username fails with `AlreadyExists`.
    async fn create_user(&self, user: &NewUser) -> MetadataResult<UserRow>;

    /// Get a user by ID.
    async fn get_user(&self, user_id: i64) -> MetadataResult<Option<UserRow>>;

    /// Get a user by exact (case-sensitive) username.
    async fn get_user_by_username(&self, username: &str) -> MetadataResult<Option<UserRow>>;

    /// Replace the stored password hash.
    async fn update_password_hash(&self, user_id: i64, password_hash: &str)
    -> MetadataResult<()>;

    /// Set or clear the email address.
    async fn update_email(&self, user_id: i64, email: Option<&str>) -> MetadataResult<UserRow>;

    /// Point the avatar at a new public asset path.
    async fn update_avatar(&self, user_id: i64, avatar: &str) -> MetadataResult<UserRow>;
}
