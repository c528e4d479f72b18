//! Server test utilities.

use super::metadata::FailingMetadata;
use aifriend_core::config::AppConfig;
use aifriend_metadata::{MetadataStore, SqliteStore};
use aifriend_server::{AppState, create_router};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    /// Present when built with [`TestServer::failing`].
    pub failing: Option<Arc<FailingMetadata>>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary storage.
    pub async fn new() -> Self {
        Self::build(|_| {}, false).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        Self::build(modifier, false).await
    }

    /// Create a test server whose metadata writes can be forced to fail.
    pub async fn failing() -> Self {
        Self::build(|_| {}, true).await
    }

    async fn build<F>(modifier: F, failing: bool) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let mut config = AppConfig::for_testing();
        config.upload.avatar_dir = temp_dir.path().join("avatars");
        config.upload.character_dir = temp_dir.path().join("characters");
        modifier(&mut config);

        let sqlite = SqliteStore::new(temp_dir.path().join("metadata.db"))
            .await
            .expect("Failed to create metadata store");
        let (metadata, failing) = if failing {
            let store = Arc::new(FailingMetadata::new(sqlite));
            let metadata: Arc<dyn MetadataStore> = store.clone();
            (metadata, Some(store))
        } else {
            let metadata: Arc<dyn MetadataStore> = Arc::new(sqlite);
            (metadata, None)
        };

        let assets = aifriend_storage::from_config(&config.upload, &config.server.api_prefix)
            .await
            .expect("Failed to create asset store");

        let state = AppState::new(config, metadata, assets).expect("Failed to build state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            failing,
            _temp_dir: temp_dir,
        }
    }

    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }

    pub fn avatar_dir(&self) -> PathBuf {
        self.state.config.upload.avatar_dir.clone()
    }

    pub fn character_dir(&self) -> PathBuf {
        self.state.config.upload.character_dir.clone()
    }

    /// Register a user and log in, returning `(user_id, access_token, refresh_token)`.
    pub async fn signup(&self, username: &str, password: &str) -> (i64, String, String) {
        self.signup_at("/api/v1", username, password).await
    }

    /// [`TestServer::signup`] against a non-default API prefix.
    pub async fn signup_at(
        &self,
        prefix: &str,
        username: &str,
        password: &str,
    ) -> (i64, String, String) {
        let (status, body) = super::json_request(
            &self.router,
            "POST",
            &format!("{prefix}/auth/register"),
            Some(serde_json::json!({"username": username, "password": password})),
            None,
        )
        .await;
        assert_eq!(status, axum::http::StatusCode::OK, "register failed: {body}");
        let user_id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = super::json_request(
            &self.router,
            "POST",
            &format!("{prefix}/auth/login"),
            Some(serde_json::json!({"username": username, "password": password})),
            None,
        )
        .await;
        assert_eq!(status, axum::http::StatusCode::OK, "login failed: {body}");

        (
            user_id,
            body["data"]["access_token"].as_str().unwrap().to_string(),
            body["data"]["refresh_token"].as_str().unwrap().to_string(),
        )
    }
}
