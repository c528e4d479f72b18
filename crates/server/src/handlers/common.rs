//! Shared handler helpers.

use crate::error::{ApiError, ApiResult};
use aifriend_metadata::{CharacterRow, UserRow};
use axum::Json;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Success envelope: `{ "code": 0, "message": ..., "data": ... }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Self::with_message("success", data)
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            code: 0,
            message: message.into(),
            data,
        })
    }
}

pub fn format_time(ts: OffsetDateTime) -> ApiResult<String> {
    ts.format(&Rfc3339)
        .map_err(|e| ApiError::Internal(format!("failed to format timestamp: {e}")))
}

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub created_at: String,
}

impl TryFrom<UserRow> for UserView {
    type Error = ApiError;

    fn try_from(row: UserRow) -> ApiResult<Self> {
        Ok(Self {
            created_at: format_time(row.created_at)?,
            id: row.id,
            username: row.username,
            email: row.email,
            avatar: row.avatar,
        })
    }
}

/// Public view of a character.
#[derive(Debug, Serialize)]
pub struct CharacterView {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub profile: String,
    pub photo: Option<String>,
    pub background_image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<CharacterRow> for CharacterView {
    type Error = ApiError;

    fn try_from(row: CharacterRow) -> ApiResult<Self> {
        Ok(Self {
            created_at: format_time(row.created_at)?,
            updated_at: format_time(row.updated_at)?,
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            profile: row.profile,
            photo: row.photo,
            background_image: row.background_image,
        })
    }
}

/// A fully buffered multipart form.
///
/// The route's body limit bounds how much is buffered; the upload validator
/// applies the per-asset limit afterwards.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, Bytes>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut fields = HashMap::new();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let data = field.bytes().await.map_err(multipart_error)?;
            // First occurrence wins.
            fields.entry(name).or_insert(data);
        }
        Ok(Self { fields })
    }

    /// A text field, if present.
    pub fn text(&self, name: &str) -> ApiResult<Option<String>> {
        self.fields
            .get(name)
            .map(|data| {
                String::from_utf8(data.to_vec())
                    .map_err(|_| ApiError::BadRequest(format!("{name} must be valid UTF-8")))
            })
            .transpose()
    }

    /// A file field. Empty parts count as absent.
    pub fn file(&self, name: &str) -> Option<Bytes> {
        self.fields.get(name).filter(|d| !d.is_empty()).cloned()
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("request body too large".to_string())
    } else {
        ApiError::BadRequest(format!("invalid multipart body: {}", e.body_text()))
    }
}
