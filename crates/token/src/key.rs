//! Symmetric signing secrets.

use crate::error::{TokenError, TokenResult};
use std::fmt;

/// A symmetric MAC secret.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSecret {
    bytes: Vec<u8>,
}

impl TokenSecret {
    /// Create a secret from raw bytes. Empty secrets are rejected.
    pub fn new(bytes: impl Into<Vec<u8>>) -> TokenResult<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(TokenError::InvalidKey("secret cannot be empty".to_string()));
        }
        Ok(Self { bytes })
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl TryFrom<&str> for TokenSecret {
    type Error = TokenError;

    fn try_from(s: &str) -> TokenResult<Self> {
        Self::new(s.as_bytes())
    }
}

impl fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenSecret([REDACTED])")
    }
}
