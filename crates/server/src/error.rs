//! API error types.

use crate::credentials::CredentialError;
use crate::ingest::IngestError;
use aifriend_core::ValidationError;
use aifriend_token::TokenError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Message shown for every server-side fault.
const INTERNAL_MESSAGE: &str = "internal server error";

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Numeric code mirroring the HTTP status.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] aifriend_storage::StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] aifriend_metadata::MetadataError),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Storage(aifriend_storage::StorageError::InvalidKey(_)) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Metadata(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Metadata(aifriend_metadata::MetadataError::AlreadyExists(_)) => {
                StatusCode::CONFLICT
            }
            Self::Metadata(aifriend_metadata::MetadataError::InvalidInput(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Metadata(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Numeric response code.
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    /// Message safe to show the caller.
    ///
    /// Storage and database details never leave the process.
    fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => INTERNAL_MESSAGE.to_string(),
            Self::Storage(_) | Self::Metadata(_) => match self.status_code() {
                StatusCode::NOT_FOUND => "not found".to_string(),
                StatusCode::CONFLICT => "already exists".to_string(),
                StatusCode::BAD_REQUEST => match self {
                    Self::Metadata(aifriend_metadata::MetadataError::InvalidInput(msg)) => {
                        msg.clone()
                    }
                    _ => "bad request".to_string(),
                },
                _ => INTERNAL_MESSAGE.to_string(),
            },
            other => other.to_string(),
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::Conflict(_) => Self::Conflict("username already exists".to_string()),
            CredentialError::InvalidCredentials
            | CredentialError::IdentityNotFound(_)
            | CredentialError::PasswordMismatch => Self::Unauthorized(e.to_string()),
            CredentialError::Hashing(msg) => Self::Internal(msg),
            CredentialError::Metadata(e) => Self::Metadata(e),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Validation(e) => e.into(),
            IngestError::InvalidInput(msg) => Self::BadRequest(msg),
            IngestError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            IngestError::Ownership(what) => Self::Forbidden(format!("not the owner of this {what}")),
            IngestError::Storage(e) => Self::Storage(e),
            IngestError::Metadata(e) => Self::Metadata(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::InvalidKey(_) | TokenError::Encoding(_) | TokenError::Entropy(_) => {
                Self::Internal(e.to_string())
            }
            TokenError::Expired => Self::Unauthorized("token expired".to_string()),
            TokenError::InvalidSignature | TokenError::Malformed(_) => {
                Self::Unauthorized("invalid token".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            code: status.as_u16(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
