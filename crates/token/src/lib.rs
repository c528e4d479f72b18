//! Signed bearer tokens for the aifriend API.
//!
//! This crate provides:
//! - HMAC-SHA256 token signing over JSON claims (JWS compact, `HS256`)
//! - Verification in a fixed order: signature, validity window, payload shape
//! - Access/refresh pairs with rotation on refresh
//!
//! Verification is pure; nothing here touches storage or global state.

pub mod claims;
pub mod error;
pub mod key;
pub mod service;
pub mod signer;

pub use claims::{TokenClaims, TokenKind};
pub use error::{TokenError, TokenResult};
pub use key::TokenSecret;
pub use service::{TokenPair, TokenService};
pub use signer::TokenSigner;

/// Current time as whole Unix seconds.
pub fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
