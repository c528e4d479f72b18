//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{CharacterRepo, UserRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: UserRepo + CharacterRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) a database file and apply the schema.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // One writer avoids persistent "database is locked" under axum concurrency.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::debug!(path = %path.display(), "sqlite metadata store ready");

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use time::OffsetDateTime;

    #[async_trait]
    impl UserRepo for SqliteStore {
        async fn create_user(&self, user: &NewUser) -> MetadataResult<UserRow> {
            let now = OffsetDateTime::now_utc();
            let result = sqlx::query_as::<_, UserRow>(
                r#"
                INSERT INTO users (username, password_hash, email, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                RETURNING *
                "#,
            )
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.email)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok(row) => Ok(row),
                Err(e) if is_unique_violation(&e) => {
                    Err(MetadataError::AlreadyExists(user.username.clone()))
                }
                Err(e) => Err(e.into()),
            }
        }

        async fn get_user(&self, user_id: i64) -> MetadataResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>(
                "SELECT * FROM users WHERE id = ? AND deleted_at IS NULL",
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn get_user_by_username(&self, username: &str) -> MetadataResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>(
                "SELECT * FROM users WHERE username = ? AND deleted_at IS NULL",
            )
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn update_password_hash(
            &self,
            user_id: i64,
            password_hash: &str,
        ) -> MetadataResult<()> {
            let result = sqlx::query(
                "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            )
            .bind(password_hash)
            .bind(OffsetDateTime::now_utc())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("user {user_id}")));
            }
            Ok(())
        }

        async fn update_email(
            &self,
            user_id: i64,
            email: Option<&str>,
        ) -> MetadataResult<UserRow> {
            sqlx::query_as::<_, UserRow>(
                "UPDATE users SET email = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL RETURNING *",
            )
            .bind(email)
            .bind(OffsetDateTime::now_utc())
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MetadataError::NotFound(format!("user {user_id}")))
        }

        async fn update_avatar(&self, user_id: i64, avatar: &str) -> MetadataResult<UserRow> {
            sqlx::query_as::<_, UserRow>(
                "UPDATE users SET avatar = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL RETURNING *",
            )
            .bind(avatar)
            .bind(OffsetDateTime::now_utc())
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MetadataError::NotFound(format!("user {user_id}")))
        }
    }

    #[async_trait]
    impl CharacterRepo for SqliteStore {
        async fn create_character(
            &self,
            character: &NewCharacter,
        ) -> MetadataResult<CharacterRow> {
            let now = OffsetDateTime::now_utc();
            let row = sqlx::query_as::<_, CharacterRow>(
                r#"
                INSERT INTO characters (
                    user_id, name, photo, profile, background_image, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                RETURNING *
                "#,
            )
            .bind(character.user_id)
            .bind(&character.name)
            .bind(&character.photo)
            .bind(&character.profile)
            .bind(&character.background_image)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
            Ok(row)
        }

        async fn get_character(&self, character_id: i64) -> MetadataResult<Option<CharacterRow>> {
            let row = sqlx::query_as::<_, CharacterRow>(
                "SELECT * FROM characters WHERE id = ? AND deleted_at IS NULL",
            )
            .bind(character_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn list_characters_for_user(
            &self,
            user_id: i64,
        ) -> MetadataResult<Vec<CharacterRow>> {
            let rows = sqlx::query_as::<_, CharacterRow>(
                r#"
                SELECT * FROM characters
                WHERE user_id = ? AND deleted_at IS NULL
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn update_character(
            &self,
            character_id: i64,
            changes: &CharacterChanges,
        ) -> MetadataResult<CharacterRow> {
            if changes.is_empty() {
                return Err(MetadataError::InvalidInput("nothing to update".to_string()));
            }

            sqlx::query_as::<_, CharacterRow>(
                r#"
                UPDATE characters SET
                    name = COALESCE(?, name),
                    profile = COALESCE(?, profile),
                    photo = COALESCE(?, photo),
                    background_image = COALESCE(?, background_image),
                    updated_at = ?
                WHERE id = ? AND deleted_at IS NULL
                RETURNING *
                "#,
            )
            .bind(&changes.name)
            .bind(&changes.profile)
            .bind(&changes.photo)
            .bind(&changes.background_image)
            .bind(OffsetDateTime::now_utc())
            .bind(character_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MetadataError::NotFound(format!("character {character_id}")))
        }

        async fn tombstone_character(
            &self,
            character_id: i64,
            deleted_at: OffsetDateTime,
        ) -> MetadataResult<CharacterRow> {
            sqlx::query_as::<_, CharacterRow>(
                r#"
                UPDATE characters SET deleted_at = ?, updated_at = ?
                WHERE id = ? AND deleted_at IS NULL
                RETURNING *
                "#,
            )
            .bind(deleted_at)
            .bind(deleted_at)
            .bind(character_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MetadataError::NotFound(format!("character {character_id}")))
        }
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    email TEXT,
    avatar TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS characters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    name TEXT NOT NULL,
    photo TEXT,
    profile TEXT NOT NULL DEFAULT '',
    background_image TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_characters_owner ON characters(user_id, deleted_at);
"#;
