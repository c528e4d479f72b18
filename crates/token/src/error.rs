//! Token error types.

use thiserror::Error;

/// Token operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("entropy error: {0}")]
    Entropy(String),
}

/// Result type for token operations.
pub type TokenResult<T> = std::result::Result<T, TokenError>;
