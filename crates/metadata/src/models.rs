//! Database models mapping to the metadata schema.
//!
//! `deleted_at` is a tombstone: once set, the row is invisible to every
//! lookup, listing and update.

use sqlx::FromRow;
use std::fmt;
use time::OffsetDateTime;

// =============================================================================
// Users
// =============================================================================

/// User record.
#[derive(Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    /// PHC string: algorithm, parameters, salt and digest.
    pub password_hash: String,
    pub email: Option<String>,
    /// Public asset path, only ever written by the avatar upload.
    pub avatar: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl fmt::Debug for UserRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRow")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .field("email", &self.email)
            .field("avatar", &self.avatar)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("deleted_at", &self.deleted_at)
            .finish()
    }
}

/// Fields for a new user.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
}

// =============================================================================
// Characters
// =============================================================================

/// Character profile record.
#[derive(Debug, Clone, FromRow)]
pub struct CharacterRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub photo: Option<String>,
    pub profile: String,
    pub background_image: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl CharacterRow {
    /// Asset paths the row references.
    pub fn asset_paths(&self) -> impl Iterator<Item = &str> {
        self.photo
            .as_deref()
            .into_iter()
            .chain(self.background_image.as_deref())
    }
}

/// Fields for a new character.
#[derive(Clone, Debug, Default)]
pub struct NewCharacter {
    pub user_id: i64,
    pub name: String,
    pub profile: String,
    pub photo: Option<String>,
    pub background_image: Option<String>,
}

/// Partial update of a character. `None` leaves the column unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CharacterChanges {
    pub name: Option<String>,
    pub profile: Option<String>,
    pub photo: Option<String>,
    pub background_image: Option<String>,
}

impl CharacterChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.profile.is_none()
            && self.photo.is_none()
            && self.background_image.is_none()
    }
}
