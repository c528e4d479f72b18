//! Asset categories, purposes and the public path scheme.
//!
//! A stored asset is addressed publicly as
//! `{api_prefix}/uploads/{category}/{filename}` where the filename encodes
//! `{purpose}_{owner_id}_{random_hex}.{ext}`. Rows persist the public form;
//! the storage layer only ever sees `category` and `filename`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage category (one directory per category).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Avatars,
    Characters,
}

impl AssetCategory {
    /// Parse from the path segment form.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "avatars" => Ok(Self::Avatars),
            "characters" => Ok(Self::Characters),
            _ => Err(crate::Error::InvalidCategory(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avatars => "avatars",
            Self::Characters => "characters",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The entity field an asset is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetPurpose {
    /// `User.avatar`
    Avatar,
    /// `Character.photo`
    CharacterPhoto,
    /// `Character.background_image`
    CharacterBackground,
}

impl AssetPurpose {
    /// Human-readable filename prefix.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Avatar => "avatar",
            Self::CharacterPhoto => "char_photo",
            Self::CharacterBackground => "char_bg",
        }
    }

    /// Category (directory) the asset is stored under.
    pub fn category(&self) -> AssetCategory {
        match self {
            Self::Avatar => AssetCategory::Avatars,
            Self::CharacterPhoto | Self::CharacterBackground => AssetCategory::Characters,
        }
    }

    /// Name of the owning column / form field.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Avatar => "avatar",
            Self::CharacterPhoto => "photo",
            Self::CharacterBackground => "background_image",
        }
    }

    /// Size class used to pick the upload limit.
    pub fn class(&self) -> crate::AssetClass {
        match self {
            Self::Avatar => crate::AssetClass::Avatar,
            Self::CharacterPhoto | Self::CharacterBackground => crate::AssetClass::CharacterImage,
        }
    }
}

impl fmt::Display for AssetPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field_name())
    }
}

/// Location of a stored asset, independent of the API prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetPath {
    category: AssetCategory,
    filename: String,
}

impl AssetPath {
    /// Create a path, validating the filename is a single safe segment.
    pub fn new(category: AssetCategory, filename: impl Into<String>) -> crate::Result<Self> {
        let filename = filename.into();
        validate_filename(&filename)?;
        Ok(Self { category, filename })
    }

    /// Parse a public path of the form `{api_prefix}/uploads/{category}/{filename}`.
    pub fn parse_public(public: &str, api_prefix: &str) -> crate::Result<Self> {
        let prefix = api_prefix.trim_end_matches('/');
        let rest = public
            .strip_prefix(prefix)
            .and_then(|r| r.strip_prefix("/uploads/"))
            .ok_or_else(|| crate::Error::InvalidAssetPath(public.to_string()))?;

        let (category, filename) = rest
            .split_once('/')
            .ok_or_else(|| crate::Error::InvalidAssetPath(public.to_string()))?;

        Self::new(AssetCategory::parse(category)?, filename)
    }

    pub fn category(&self) -> AssetCategory {
        self.category
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Render the public reference stored in rows and returned to clients.
    pub fn to_public(&self, api_prefix: &str) -> String {
        format!(
            "{}/uploads/{}/{}",
            api_prefix.trim_end_matches('/'),
            self.category,
            self.filename
        )
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.filename)
    }
}

/// An asset attached to one entity field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetReference {
    pub path: AssetPath,
    pub purpose: AssetPurpose,
}

fn validate_filename(filename: &str) -> crate::Result<()> {
    let invalid = filename.is_empty()
        || filename.starts_with('.')
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
        || filename.chars().any(|c| c.is_control());

    if invalid {
        return Err(crate::Error::InvalidAssetPath(filename.to_string()));
    }
    Ok(())
}
