//! Character profiles owned by the authenticated user.

use super::common::{ApiResponse, CharacterView, MultipartForm};
use crate::auth::AuthenticatedUser;
use crate::error::ApiResult;
use crate::ingest::{CharacterDraft, CharacterPatch};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Multipart, Path, State};

/// GET /characters
pub async fn list_characters(
    State(state): State<AppState>,
    AuthenticatedUser { subject }: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<Vec<CharacterView>>>> {
    let rows = state
        .metadata
        .list_characters_for_user(subject.id.get())
        .await?;
    let views = rows
        .into_iter()
        .map(CharacterView::try_from)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(ApiResponse::ok(views))
}

/// POST /characters (multipart: name, profile, photo?, background_image?)
pub async fn create_character(
    State(state): State<AppState>,
    AuthenticatedUser { subject }: AuthenticatedUser,
    multipart: Multipart,
) -> ApiResult<Json<ApiResponse<CharacterView>>> {
    let form = MultipartForm::read(multipart).await?;
    let draft = CharacterDraft {
        name: form.text("name")?.unwrap_or_default(),
        profile: form.text("profile")?.unwrap_or_default(),
        photo: form.file("photo"),
        background_image: form.file("background_image"),
    };

    let row = state.ingest.create_character(&subject, draft).await?;
    Ok(ApiResponse::with_message("created", row.try_into()?))
}

/// GET /characters/{id}
pub async fn get_character(
    State(state): State<AppState>,
    AuthenticatedUser { subject }: AuthenticatedUser,
    Path(character_id): Path<i64>,
) -> ApiResult<Json<ApiResponse<CharacterView>>> {
    let row = state
        .ingest
        .get_owned_character(&subject, character_id)
        .await?;
    Ok(ApiResponse::ok(row.try_into()?))
}

/// PUT /characters/{id} (multipart, every field optional)
pub async fn update_character(
    State(state): State<AppState>,
    AuthenticatedUser { subject }: AuthenticatedUser,
    Path(character_id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<ApiResponse<CharacterView>>> {
    let form = MultipartForm::read(multipart).await?;
    let patch = CharacterPatch {
        name: form.text("name")?,
        profile: form.text("profile")?,
        photo: form.file("photo"),
        background_image: form.file("background_image"),
    };

    let row = state
        .ingest
        .update_character(&subject, character_id, patch)
        .await?;
    Ok(ApiResponse::with_message("updated", row.try_into()?))
}

/// DELETE /characters/{id}
pub async fn delete_character(
    State(state): State<AppState>,
    AuthenticatedUser { subject }: AuthenticatedUser,
    Path(character_id): Path<i64>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .ingest
        .remove_character(&subject, character_id)
        .await?;
    Ok(ApiResponse::with_message("deleted", ()))
}
