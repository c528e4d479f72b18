//! Token claims.

use crate::error::{TokenError, TokenResult};
use aifriend_core::{Subject, SubjectId};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Random bytes in every token id.
pub const TOKEN_ID_BYTES: usize = 16;

/// Which secret a token was verified against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[default]
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// The payload embedded in a signed token.
///
/// Timestamps are whole Unix seconds. `jti` is random per issuance, so two
/// tokens minted in the same second never coincide. `kind` is not part of
/// the payload: it is implied by the secret that verified the token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub jti: String,
    pub user_id: i64,
    pub username: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    #[serde(skip)]
    pub kind: TokenKind,
}

impl TokenClaims {
    /// Claims valid from `now` until `exp` (exclusive), with a fresh `jti`.
    pub fn new(subject: &Subject, kind: TokenKind, now: i64, exp: i64) -> TokenResult<Self> {
        Ok(Self {
            jti: new_token_id()?,
            user_id: subject.id.get(),
            username: subject.username.clone(),
            iat: now,
            nbf: now,
            exp,
            kind,
        })
    }

    /// The identity the token was issued to.
    pub fn subject(&self) -> Subject {
        Subject::new(SubjectId::new(self.user_id), self.username.clone())
    }

    /// Whether `now` falls inside `[nbf, exp)`.
    pub fn is_valid_at(&self, now: i64) -> bool {
        ValidityWindow::from(self).contains(now)
    }
}

fn new_token_id() -> TokenResult<String> {
    let mut bytes = [0u8; TOKEN_ID_BYTES];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| TokenError::Entropy(format!("random source unavailable: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// The time-bound subset of the claims, decoded before the full payload.
#[derive(Clone, Copy, Debug, Deserialize)]
pub(crate) struct ValidityWindow {
    pub nbf: i64,
    pub exp: i64,
}

impl ValidityWindow {
    pub fn contains(&self, now: i64) -> bool {
        now >= self.nbf && now < self.exp
    }
}

impl From<&TokenClaims> for ValidityWindow {
    fn from(claims: &TokenClaims) -> Self {
        Self {
            nbf: claims.nbf,
            exp: claims.exp,
        }
    }
}
