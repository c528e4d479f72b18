//! Registration, login and token refresh.

use super::common::{ApiResponse, UserView};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use aifriend_core::Subject;
use aifriend_token::TokenPair;
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

/// Maximum username length in characters.
pub const MAX_USERNAME_LEN: usize = 50;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Tokens handed to a client.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in,
        }
    }
}

fn validate_username(raw: &str) -> ApiResult<&str> {
    let username = raw.trim();
    let len = username.chars().count();
    if len == 0 || len > MAX_USERNAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "username must be 1 to {MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(username)
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<ApiResponse<UserView>>> {
    let username = validate_username(&req.username)?;
    if req.password.is_empty() {
        return Err(ApiError::BadRequest("password is required".to_string()));
    }
    let email = req
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());

    let user = state
        .credentials
        .register(username, &req.password, email)
        .await?;
    Ok(ApiResponse::with_message("registered", user.try_into()?))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let user = state
        .credentials
        .verify(req.username.trim(), &req.password)
        .await?;

    let pair = state.tokens.issue_pair(&Subject::new(user.id, user.username))?;
    Ok(ApiResponse::ok(pair.into()))
}

/// POST /auth/refresh
///
/// Rotates both tokens. The presented refresh token is not revoked.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let (subject, pair) = state.tokens.refresh(req.refresh_token.trim())?;

    if state.metadata.get_user(subject.id.get()).await?.is_none() {
        return Err(ApiError::Unauthorized("invalid token".to_string()));
    }

    Ok(ApiResponse::ok(pair.into()))
}
