//! Public asset serving.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use aifriend_core::{AssetCategory, AssetPath, UploadValidator};
use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// GET /uploads/{category}/{filename}
///
/// The content type is sniffed from the stored bytes.
pub async fn get_asset(
    State(state): State<AppState>,
    Path((category, filename)): Path<(String, String)>,
) -> ApiResult<Response> {
    let not_found = || ApiError::NotFound("asset not found".to_string());
    let category = AssetCategory::parse(&category).map_err(|_| not_found())?;
    let path = AssetPath::new(category, filename).map_err(|_| not_found())?;

    let data = state.assets.read(&path).await?;
    let content_type = UploadValidator::sniff(&data);

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            (
                CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=31536000, immutable"),
            ),
        ],
        data,
    )
        .into_response())
}
