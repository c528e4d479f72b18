//! Upload validation: content sniffing, size and type enforcement.
//!
//! Client supplied filenames and `Content-Type` headers are never consulted.
//! The type is decided from at most [`crate::SNIFF_LEN`] leading bytes.

use crate::config::UploadConfig;
use crate::{DEFAULT_MAX_AVATAR_SIZE, DEFAULT_MAX_CHARACTER_SIZE, SNIFF_LEN};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fallback type for binary content nothing recognises.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Fallback type for content without binary control bytes.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Upload rejected for a caller-fixable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("too large")]
    TooLarge { size: u64, limit: u64 },

    #[error("unsupported type")]
    UnsupportedType(String),

    #[error("{0}")]
    InvalidField(String),
}

/// Size class of an upload; each class has its own limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Avatar,
    CharacterImage,
}

/// Accepted image formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageType {
    /// Map a sniffed MIME type to an accepted format.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime_type())
    }
}

/// Business-level upload rules with per-class size limits.
#[derive(Clone, Debug)]
pub struct UploadValidator {
    max_avatar_size: u64,
    max_character_size: u64,
}

impl UploadValidator {
    /// Create a validator. Non-positive limits fall back to the defaults.
    pub fn new(max_avatar_size: i64, max_character_size: i64) -> Self {
        Self {
            max_avatar_size: positive_or(max_avatar_size, DEFAULT_MAX_AVATAR_SIZE),
            max_character_size: positive_or(max_character_size, DEFAULT_MAX_CHARACTER_SIZE),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.max_avatar_size, config.max_character_size)
    }

    /// Effective limit for a size class.
    pub fn limit_for(&self, class: AssetClass) -> u64 {
        match class {
            AssetClass::Avatar => self.max_avatar_size,
            AssetClass::CharacterImage => self.max_character_size,
        }
    }

    /// Best-effort content type from the leading bytes.
    pub fn sniff(first_bytes: &[u8]) -> &'static str {
        let head = &first_bytes[..first_bytes.len().min(SNIFF_LEN)];

        if let Some(kind) = infer::get(head) {
            return kind.mime_type();
        }

        if looks_like_text(head) {
            TEXT_PLAIN
        } else {
            OCTET_STREAM
        }
    }

    /// Check size then type, returning the accepted format.
    pub fn accept(
        mime_type: &str,
        declared_size: u64,
        size_limit: u64,
    ) -> Result<ImageType, ValidationError> {
        if declared_size > size_limit {
            return Err(ValidationError::TooLarge {
                size: declared_size,
                limit: size_limit,
            });
        }

        ImageType::from_mime(mime_type)
            .ok_or_else(|| ValidationError::UnsupportedType(mime_type.to_string()))
    }

    /// Sniff and accept a fully buffered upload of the given class.
    pub fn validate(&self, class: AssetClass, data: &[u8]) -> Result<ImageType, ValidationError> {
        let mime = Self::sniff(data);
        Self::accept(mime, data.len() as u64, self.limit_for(class))
    }
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

fn positive_or(value: i64, default: u64) -> u64 {
    if value > 0 { value as u64 } else { default }
}

fn looks_like_text(data: &[u8]) -> bool {
    !data
        .iter()
        .any(|&b| matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F))
}
