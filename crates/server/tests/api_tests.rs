//! Integration tests for HTTP API endpoints.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use common::{
    Part, TestServer, gif_bytes, jpeg_bytes, json_request, list_files, multipart_request,
    png_bytes, text_bytes,
};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;
    let (status, body) = json_request(&server.router, "GET", "/api/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_register_login_and_info() {
    let server = TestServer::new().await;
    let (status, body) = json_request(
        &server.router,
        "POST",
        "/api/v1/auth/register",
        Some(json!({"username": "  alice  ", "password": "pw-1", "email": "a@example.com"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"].get("password_hash").is_none());

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/api/v1/auth/login",
        Some(json!({"username": "alice", "password": "pw-1"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["expires_in"], 7200);
    let access = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, body) =
        json_request(&server.router, "GET", "/api/v1/user/info", None, Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["email"], "a@example.com");
    assert!(body["data"]["avatar"].is_null());
}

#[tokio::test]
async fn test_register_validation() {
    let server = TestServer::new().await;

    for payload in [
        json!({"username": "   ", "password": "pw"}),
        json!({"username": "x".repeat(51), "password": "pw"}),
        json!({"username": "bob", "password": ""}),
    ] {
        let (status, body) = json_request(
            &server.router,
            "POST",
            "/api/v1/auth/register",
            Some(payload),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let server = TestServer::new().await;
    server.signup("alice", "pw").await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/api/v1/auth/register",
        Some(json!({"username": "alice", "password": "other"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);

    // Usernames are case-sensitive.
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/api/v1/auth/register",
        Some(json!({"username": "Alice", "password": "other"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let server = TestServer::new().await;
    server.signup("alice", "pw").await;

    let (status_a, body_a) = json_request(
        &server.router,
        "POST",
        "/api/v1/auth/login",
        Some(json!({"username": "alice", "password": "wrong"})),
        None,
    )
    .await;
    let (status_b, body_b) = json_request(
        &server.router,
        "POST",
        "/api/v1/auth/login",
        Some(json!({"username": "nobody", "password": "pw"})),
        None,
    )
    .await;

    assert_eq!(status_a, StatusCode::UNAUTHORIZED);
    assert_eq!(status_b, StatusCode::UNAUTHORIZED);
    assert_eq!(body_a, body_b);
    assert_eq!(body_a["message"], "invalid credentials");
}

#[tokio::test]
async fn test_protected_routes_require_access_token() {
    let server = TestServer::new().await;
    let (_, _access, refresh) = server.signup("alice", "pw").await;

    let (status, body) = json_request(&server.router, "GET", "/api/v1/user/info", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "authentication required");

    let (status, body) =
        json_request(&server.router, "GET", "/api/v1/user/info", None, Some("a.b.c")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid token");

    // A refresh token is not an access token.
    let (status, _) =
        json_request(&server.router, "GET", "/api/v1/user/info", None, Some(&refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_bearer_does_not_block_public_routes() {
    let server = TestServer::new().await;
    let (status, _) = json_request(
        &server.router,
        "GET",
        "/api/v1/health",
        None,
        Some("not-a-token"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let server = TestServer::new().await;
    let (_, access, refresh) = server.signup("alice", "pw").await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/api/v1/auth/refresh",
        Some(json!({"refresh_token": refresh})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let new_access = body["data"]["access_token"].as_str().unwrap();
    let new_refresh = body["data"]["refresh_token"].as_str().unwrap();
    // Refreshing within the same second as signup still mints fresh tokens.
    assert_ne!(new_access, access);
    assert_ne!(new_refresh, refresh);

    let (status, _) =
        json_request(&server.router, "GET", "/api/v1/user/info", None, Some(new_access)).await;
    assert_eq!(status, StatusCode::OK);

    // An access token is rejected by the refresh endpoint.
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/api/v1/auth/refresh",
        Some(json!({"refresh_token": access})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password() {
    let server = TestServer::new().await;
    let (_, access, _) = server.signup("alice", "old-pw").await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/api/v1/user/password",
        Some(json!({"old_password": "nope", "new_password": "new-pw"})),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid credentials");

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/api/v1/user/password",
        Some(json!({"old_password": "old-pw", "new_password": "new-pw"})),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let login = |password: &'static str| {
        let router = server.router.clone();
        async move {
            json_request(
                &router,
                "POST",
                "/api/v1/auth/login",
                Some(json!({"username": "alice", "password": password})),
                None,
            )
            .await
            .0
        }
    };
    assert_eq!(login("old-pw").await, StatusCode::UNAUTHORIZED);
    assert_eq!(login("new-pw").await, StatusCode::OK);
}

#[tokio::test]
async fn test_update_email() {
    let server = TestServer::new().await;
    let (_, access, _) = server.signup("alice", "pw").await;

    let (status, body) = json_request(
        &server.router,
        "PUT",
        "/api/v1/user/info",
        Some(json!({})),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "nothing to update");

    let (status, body) = json_request(
        &server.router,
        "PUT",
        "/api/v1/user/info",
        Some(json!({"email": "new@example.com", "avatar": "/etc/passwd"})),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "new@example.com");
    assert!(body["data"]["avatar"].is_null());

    let (_, body) = json_request(
        &server.router,
        "PUT",
        "/api/v1/user/info",
        Some(json!({"email": ""})),
        Some(&access),
    )
    .await;
    assert!(body["data"]["email"].is_null());
}

#[tokio::test]
async fn test_avatar_upload_replaces_previous_file() {
    let server = TestServer::new().await;
    let (user_id, access, _) = server.signup("alice", "pw").await;

    let (status, body) = multipart_request(
        &server.router,
        "POST",
        "/api/v1/user/avatar",
        vec![Part::File("avatar", "me.png", png_bytes())],
        &access,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let first = body["data"]["avatar"].as_str().unwrap().to_string();
    assert!(first.starts_with(&format!("/api/v1/uploads/avatars/avatar_{user_id}_")));
    assert!(first.ends_with(".png"));

    let (status, body) = multipart_request(
        &server.router,
        "POST",
        "/api/v1/user/avatar",
        vec![Part::File("avatar", "me.gif", gif_bytes())],
        &access,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second = body["data"]["avatar"].as_str().unwrap().to_string();
    assert!(second.ends_with(".gif"));

    let files = list_files(&server.avatar_dir());
    assert_eq!(files.len(), 1);
    assert!(second.ends_with(&files[0]));

    // The stored file is served with a sniffed content type.
    let response = server
        .router
        .clone()
        .oneshot(Request::get(&second).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/gif");
    let served = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(served, gif_bytes());

    let response = server
        .router
        .clone()
        .oneshot(Request::get(&first).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_avatar_rejects_text_disguised_as_image() {
    let server = TestServer::new().await;
    let (_, access, _) = server.signup("alice", "pw").await;

    let (status, body) = multipart_request(
        &server.router,
        "POST",
        "/api/v1/user/avatar",
        vec![Part::File("avatar", "cat.png", text_bytes())],
        &access,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "unsupported type");
    assert!(list_files(&server.avatar_dir()).is_empty());
}

#[tokio::test]
async fn test_avatar_missing_field() {
    let server = TestServer::new().await;
    let (_, access, _) = server.signup("alice", "pw").await;

    let (status, body) = multipart_request(
        &server.router,
        "POST",
        "/api/v1/user/avatar",
        vec![Part::File("photo", "me.png", png_bytes())],
        &access,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "avatar file is required");
}

#[tokio::test]
async fn test_avatar_size_limit() {
    let server = TestServer::with_config(|c| c.upload.max_avatar_size = 16).await;
    let (_, access, _) = server.signup("alice", "pw").await;

    // Over the business limit, under the transport limit.
    let (status, body) = multipart_request(
        &server.router,
        "POST",
        "/api/v1/user/avatar",
        vec![Part::File("avatar", "me.png", png_bytes())],
        &access,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "too large");

    // Over the transport limit.
    let mut big = png_bytes().to_vec();
    big.resize(300 * 1024, 0);
    let (status, body) = multipart_request(
        &server.router,
        "POST",
        "/api/v1/user/avatar",
        vec![Part::File("avatar", "me.png", Bytes::from(big))],
        &access,
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], 413);
    assert!(list_files(&server.avatar_dir()).is_empty());
}

#[tokio::test]
async fn test_character_lifecycle() {
    let server = TestServer::new().await;
    let (user_id, access, _) = server.signup("alice", "pw").await;

    let (status, body) = multipart_request(
        &server.router,
        "POST",
        "/api/v1/characters",
        vec![
            Part::Text("name", "  Mika ".to_string()),
            Part::Text("profile", "A cheerful android.".to_string()),
            Part::File("photo", "p.jpg", jpeg_bytes()),
            Part::File("background_image", "bg.png", png_bytes()),
        ],
        &access,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["name"], "Mika");
    assert_eq!(body["data"]["user_id"], user_id);
    let id = body["data"]["id"].as_i64().unwrap();
    let photo = body["data"]["photo"].as_str().unwrap().to_string();
    assert!(photo.starts_with(&format!("/api/v1/uploads/characters/char_photo_{user_id}_")));
    assert!(photo.ends_with(".jpg"));
    assert!(
        body["data"]["background_image"]
            .as_str()
            .unwrap()
            .contains("/char_bg_")
    );
    assert_eq!(list_files(&server.character_dir()).len(), 2);

    let (status, body) =
        json_request(&server.router, "GET", "/api/v1/characters", None, Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = multipart_request(
        &server.router,
        "PUT",
        &format!("/api/v1/characters/{id}"),
        vec![Part::Text("name", "Mika II".to_string())],
        &access,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Mika II");
    assert_eq!(body["data"]["photo"], photo.as_str());
    assert_eq!(body["data"]["profile"], "A cheerful android.");

    let (status, _) = json_request(
        &server.router,
        "DELETE",
        &format!("/api/v1/characters/{id}"),
        None,
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(list_files(&server.character_dir()).is_empty());

    let (status, _) = json_request(
        &server.router,
        "GET",
        &format!("/api/v1/characters/{id}"),
        None,
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_character_requires_name() {
    let server = TestServer::new().await;
    let (_, access, _) = server.signup("alice", "pw").await;

    let (status, body) = multipart_request(
        &server.router,
        "POST",
        "/api/v1/characters",
        vec![
            Part::Text("name", "   ".to_string()),
            Part::File("photo", "p.png", png_bytes()),
        ],
        &access,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "name is required");
    assert!(list_files(&server.character_dir()).is_empty());
}

#[tokio::test]
async fn test_character_ownership_enforced() {
    let server = TestServer::new().await;
    let (_, alice, _) = server.signup("alice", "pw").await;
    let (_, mallory, _) = server.signup("mallory", "pw").await;

    let (_, body) = multipart_request(
        &server.router,
        "POST",
        "/api/v1/characters",
        vec![Part::Text("name", "Mika".to_string())],
        &alice,
    )
    .await;
    let id = body["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/characters/{id}");

    let (status, body) = json_request(&server.router, "GET", &uri, None, Some(&mallory)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 403);

    let (status, _) = multipart_request(
        &server.router,
        "PUT",
        &uri,
        vec![Part::File("photo", "p.png", png_bytes())],
        &mallory,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(list_files(&server.character_dir()).is_empty());

    let (status, _) = json_request(&server.router, "DELETE", &uri, None, Some(&mallory)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) =
        json_request(&server.router, "GET", "/api/v1/characters", None, Some(&mallory)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = json_request(&server.router, "GET", &uri, None, Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_character_is_not_found() {
    let server = TestServer::new().await;
    let (_, access, _) = server.signup("alice", "pw").await;

    let (status, body) = json_request(
        &server.router,
        "GET",
        "/api/v1/characters/9999",
        None,
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn test_asset_serving_rejects_unknown_paths() {
    let server = TestServer::new().await;

    for uri in [
        "/api/v1/uploads/secrets/a.png",
        "/api/v1/uploads/avatars/missing.png",
        "/api/v1/uploads/avatars/..%2F..%2Fmetadata.db",
    ] {
        let response = server
            .router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_custom_api_prefix() {
    let server = TestServer::with_config(|c| c.server.api_prefix = "/v2".to_string()).await;
    let (_, access, _) = server.signup_at("/v2", "alice", "pw").await;

    let (status, body) = multipart_request(
        &server.router,
        "POST",
        "/v2/user/avatar",
        vec![Part::File("avatar", "me.png", png_bytes())],
        &access,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        body["data"]["avatar"]
            .as_str()
            .unwrap()
            .starts_with("/v2/uploads/avatars/")
    );
}
