//! Token signing and verification.

use crate::claims::{TokenClaims, TokenKind, ValidityWindow};
use crate::error::{TokenError, TokenResult};
use crate::key::TokenSecret;
use aifriend_core::Subject;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// JOSE header for every token we issue.
const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Deserialize)]
struct Header {
    alg: String,
}

/// Signs and verifies one kind of token with one secret.
#[derive(Clone, Debug)]
pub struct TokenSigner {
    kind: TokenKind,
    secret: TokenSecret,
}

impl TokenSigner {
    pub fn new(kind: TokenKind, secret: TokenSecret) -> Self {
        Self { kind, secret }
    }

    /// Issue a token valid from `now` until `exp`.
    pub fn issue(&self, subject: &Subject, now: i64, exp: i64) -> TokenResult<String> {
        self.sign(&TokenClaims::new(subject, self.kind, now, exp)?)
    }

    /// Sign prepared claims.
    pub fn sign(&self, claims: &TokenClaims) -> TokenResult<String> {
        let payload =
            serde_json::to_vec(claims).map_err(|e| TokenError::Encoding(e.to_string()))?;

        let mut token = String::with_capacity(256);
        token.push_str(&URL_SAFE_NO_PAD.encode(HEADER_JSON));
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(payload));

        let mac = self.mac(token.as_bytes())?.finalize().into_bytes();
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(mac));
        Ok(token)
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> TokenResult<TokenClaims> {
        self.verify_at(token, crate::now_unix())
    }

    /// Verify a token as if the current time were `now`.
    ///
    /// Checks run in a fixed order: the MAC first (constant time), then the
    /// validity window, then the full payload shape. A token that fails the
    /// MAC is reported as `InvalidSignature` whatever its payload says.
    pub fn verify_at(&self, token: &str, now: i64) -> TokenResult<TokenClaims> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed("expected three segments".to_string()));
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| TokenError::Malformed(format!("invalid signature encoding: {e}")))?;

        let signed_len = header.len() + 1 + payload.len();
        self.mac(token[..signed_len].as_bytes())?
            .verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let header: Header = decode_segment(header)?;
        if header.alg != "HS256" {
            return Err(TokenError::Malformed(format!(
                "unsupported algorithm: {}",
                header.alg
            )));
        }

        let window: ValidityWindow = decode_segment(payload)?;
        if !window.contains(now) {
            return Err(TokenError::Expired);
        }

        let mut claims: TokenClaims = decode_segment(payload)?;
        claims.kind = self.kind;
        Ok(claims)
    }

    fn mac(&self, data: &[u8]) -> TokenResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        mac.update(data);
        Ok(mac)
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> TokenResult<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Malformed(format!("invalid segment encoding: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(e.to_string()))
}
