//! Core domain types shared across the aifriend crates.
//!
//! This crate defines the data model every other crate builds on:
//! - Application configuration
//! - Typed caller identity
//! - Asset categories, purposes and public path scheme
//! - Upload content sniffing and acceptance rules

pub mod asset;
pub mod config;
pub mod error;
pub mod identity;
pub mod upload;

pub use asset::{AssetCategory, AssetPath, AssetPurpose, AssetReference};
pub use error::{Error, Result};
pub use identity::{Subject, SubjectId};
pub use upload::{AssetClass, ImageType, UploadValidator, ValidationError};

/// Default avatar size limit: 2 MiB
pub const DEFAULT_MAX_AVATAR_SIZE: u64 = 2 * 1024 * 1024;

/// Default character image size limit: 5 MiB
pub const DEFAULT_MAX_CHARACTER_SIZE: u64 = 5 * 1024 * 1024;

/// Number of leading bytes inspected when sniffing content.
pub const SNIFF_LEN: usize = 512;
