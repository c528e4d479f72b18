//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8888").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Prefix for every API route and for public asset paths.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Allowed CORS origins. `["*"]` allows any origin.
    #[serde(default = "default_cors_allow_origins")]
    pub cors_allow_origins: Vec<String>,
    /// Whether CORS responses allow credentials.
    /// Ignored when origins is the wildcard.
    #[serde(default)]
    pub cors_allow_credentials: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8888".to_string()
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_cors_allow_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            api_prefix: default_api_prefix(),
            cors_allow_origins: default_cors_allow_origins(),
            cors_allow_credentials: false,
        }
    }
}

/// Token signing configuration.
///
/// Access and refresh tokens are signed with different secrets so that a
/// leaked refresh secret cannot mint access tokens and vice versa.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret for access tokens.
    pub access_secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_access_expire_secs")]
    pub access_expire_secs: i64,
    /// Secret for refresh tokens.
    pub refresh_secret: String,
    /// Refresh token lifetime in seconds.
    #[serde(default = "default_refresh_expire_secs")]
    pub refresh_expire_secs: i64,
}

fn default_access_expire_secs() -> i64 {
    7200 // 2 hours
}

fn default_refresh_expire_secs() -> i64 {
    604800 // 7 days
}

impl AuthConfig {
    /// Create a test configuration with fixed, distinct secrets.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            access_secret: "test-access-secret".to_string(),
            access_expire_secs: default_access_expire_secs(),
            refresh_secret: "test-refresh-secret".to_string(),
            refresh_expire_secs: default_refresh_expire_secs(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            return Err("auth.access_secret and auth.refresh_secret must be set".to_string());
        }
        if self.access_secret == self.refresh_secret {
            return Err("auth.access_secret and auth.refresh_secret must differ".to_string());
        }
        if self.access_expire_secs <= 0 || self.refresh_expire_secs <= 0 {
            return Err("auth token lifetimes must be positive".to_string());
        }
        Ok(())
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"[REDACTED]")
            .field("access_expire_secs", &self.access_expire_secs)
            .field("refresh_secret", &"[REDACTED]")
            .field("refresh_expire_secs", &self.refresh_expire_secs)
            .finish()
    }
}

/// Upload directories and limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory holding user avatars.
    #[serde(default = "default_avatar_dir")]
    pub avatar_dir: PathBuf,
    /// Directory holding character photos and backgrounds.
    #[serde(default = "default_character_dir")]
    pub character_dir: PathBuf,
    /// Avatar size limit in bytes (non-positive = 2 MiB).
    #[serde(default)]
    pub max_avatar_size: i64,
    /// Character image size limit in bytes (non-positive = 5 MiB).
    #[serde(default)]
    pub max_character_size: i64,
}

fn default_avatar_dir() -> PathBuf {
    PathBuf::from("uploads/avatars")
}

fn default_character_dir() -> PathBuf {
    PathBuf::from("uploads/characters")
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            avatar_dir: default_avatar_dir(),
            character_dir: default_character_dir(),
            max_avatar_size: 0,
            max_character_size: 0,
        }
    }
}

/// Password hashing pool configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HashingConfig {
    /// Maximum concurrent hash/verify jobs (0 = available parallelism).
    #[serde(default)]
    pub max_concurrent: usize,
    /// Argon2 memory cost in KiB.
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    /// Argon2 iteration count.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

fn default_memory_kib() -> u32 {
    19 * 1024
}

fn default_iterations() -> u32 {
    2
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
        }
    }
}

impl HashingConfig {
    /// Cheap parameters so tests do not spend seconds hashing.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            max_concurrent: 2,
            memory_kib: 1024,
            iterations: 1,
        }
    }

    /// Effective worker count.
    pub fn workers(&self) -> usize {
        if self.max_concurrent > 0 {
            self.max_concurrent
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        // Argon2 requires at least 8 KiB per lane; we always use one lane.
        if self.memory_kib < 8 {
            return Err(format!(
                "hashing.memory_kib {} is below the minimum of 8",
                self.memory_kib
            ));
        }
        if self.iterations == 0 {
            return Err("hashing.iterations cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database file.
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/aifriend.db"),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Token configuration (required).
    pub auth: AuthConfig,
    /// Upload configuration.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Password hashing configuration.
    #[serde(default)]
    pub hashing: HashingConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Create a configuration for tests.
    ///
    /// **For testing only.** Directories point at relative defaults and are
    /// expected to be overridden with temporary paths.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::for_testing(),
            upload: UploadConfig::default(),
            hashing: HashingConfig::for_testing(),
            metadata: MetadataConfig::default(),
        }
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> crate::Result<()> {
        self.auth.validate().map_err(crate::Error::Config)?;
        self.hashing.validate().map_err(crate::Error::Config)?;
        let prefix = &self.server.api_prefix;
        if !prefix.is_empty() && !prefix.starts_with('/') {
            return Err(crate::Error::Config(format!(
                "server.api_prefix must be empty or start with '/': {}",
                self.server.api_prefix
            )));
        }
        Ok(())
    }
}
