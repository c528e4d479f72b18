//! Profile of the authenticated user.

use super::common::{ApiResponse, MultipartForm, UserView};
use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Multipart, State};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct UpdateInfoRequest {
    /// New email. An empty string clears it.
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// GET /user/info
pub async fn get_info(
    State(state): State<AppState>,
    AuthenticatedUser { subject }: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<UserView>>> {
    let user = state
        .metadata
        .get_user(subject.id.get())
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(ApiResponse::ok(user.try_into()?))
}

/// PUT /user/info
///
/// Only the email is editable here; the avatar changes through upload.
pub async fn update_info(
    State(state): State<AppState>,
    AuthenticatedUser { subject }: AuthenticatedUser,
    Json(req): Json<UpdateInfoRequest>,
) -> ApiResult<Json<ApiResponse<UserView>>> {
    let Some(email) = req.email else {
        return Err(ApiError::BadRequest("nothing to update".to_string()));
    };
    let email = email.trim();
    let email = (!email.is_empty()).then_some(email);

    let user = state
        .metadata
        .update_email(subject.id.get(), email)
        .await?;
    Ok(ApiResponse::ok(user.try_into()?))
}

/// POST /user/password
pub async fn change_password(
    State(state): State<AppState>,
    AuthenticatedUser { subject }: AuthenticatedUser,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if req.new_password.is_empty() {
        return Err(ApiError::BadRequest("new password is required".to_string()));
    }

    state
        .credentials
        .change_password(&subject, &req.old_password, &req.new_password)
        .await?;
    Ok(ApiResponse::with_message("password changed", ()))
}

/// POST /user/avatar (multipart field `avatar`)
pub async fn upload_avatar(
    State(state): State<AppState>,
    AuthenticatedUser { subject }: AuthenticatedUser,
    multipart: Multipart,
) -> ApiResult<Json<ApiResponse<UserView>>> {
    let form = MultipartForm::read(multipart).await?;
    let data = form
        .file("avatar")
        .ok_or_else(|| ApiError::BadRequest("avatar file is required".to_string()))?;

    let user = state.ingest.replace_avatar(&subject, data).await?;
    Ok(ApiResponse::ok(user.try_into()?))
}
