//! Access/refresh token pairs and the refresh protocol.

use crate::claims::{TokenClaims, TokenKind};
use crate::error::{TokenError, TokenResult};
use crate::key::TokenSecret;
use crate::signer::TokenSigner;
use aifriend_core::Subject;
use aifriend_core::config::AuthConfig;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

/// A freshly issued access/refresh pair.
#[derive(Clone, Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Unix time the access token expires.
    pub access_expires_at: i64,
    /// Unix time the refresh token expires.
    pub refresh_expires_at: i64,
}

/// Hands out expiry times that strictly increase across calls.
///
/// Timestamps are whole seconds, so two issuances within one second would
/// otherwise share an `exp`.
#[derive(Clone, Debug)]
struct ExpiryClock {
    last: Arc<AtomicI64>,
}

impl ExpiryClock {
    fn new() -> Self {
        Self {
            last: Arc::new(AtomicI64::new(i64::MIN)),
        }
    }

    /// `candidate`, or one past the previous expiry if that is later.
    fn next(&self, candidate: i64) -> i64 {
        let advance = |last: i64| candidate.max(last.saturating_add(1));
        match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(advance(last)))
        {
            Ok(last) | Err(last) => advance(last),
        }
    }
}

/// Issues and verifies access and refresh tokens.
///
/// Access and refresh tokens are signed with distinct secrets. A token is
/// only ever accepted by the signer of its own kind. Clones share expiry
/// clocks, so every pair issued by one service expires strictly later than
/// the pair before it.
#[derive(Clone, Debug)]
pub struct TokenService {
    access: TokenSigner,
    refresh: TokenSigner,
    access_ttl: i64,
    refresh_ttl: i64,
    access_clock: ExpiryClock,
    refresh_clock: ExpiryClock,
}

impl TokenService {
    pub fn new(
        access_secret: TokenSecret,
        access_ttl: i64,
        refresh_secret: TokenSecret,
        refresh_ttl: i64,
    ) -> TokenResult<Self> {
        if access_secret == refresh_secret {
            return Err(TokenError::InvalidKey(
                "access and refresh secrets must differ".to_string(),
            ));
        }

        Ok(Self {
            access: TokenSigner::new(TokenKind::Access, access_secret),
            refresh: TokenSigner::new(TokenKind::Refresh, refresh_secret),
            access_ttl,
            refresh_ttl,
            access_clock: ExpiryClock::new(),
            refresh_clock: ExpiryClock::new(),
        })
    }

    pub fn from_config(config: &AuthConfig) -> TokenResult<Self> {
        Self::new(
            TokenSecret::try_from(config.access_secret.as_str())?,
            config.access_expire_secs,
            TokenSecret::try_from(config.refresh_secret.as_str())?,
            config.refresh_expire_secs,
        )
    }

    /// Issue a new pair for a subject, stamped with the current time.
    pub fn issue_pair(&self, subject: &Subject) -> TokenResult<TokenPair> {
        self.issue_pair_at(subject, crate::now_unix())
    }

    pub fn issue_pair_at(&self, subject: &Subject, now: i64) -> TokenResult<TokenPair> {
        let access_exp = self.access_clock.next(now.saturating_add(self.access_ttl));
        let refresh_exp = self.refresh_clock.next(now.saturating_add(self.refresh_ttl));

        Ok(TokenPair {
            access_token: self.access.issue(subject, now, access_exp)?,
            refresh_token: self.refresh.issue(subject, now, refresh_exp)?,
            expires_in: access_exp.saturating_sub(now),
            access_expires_at: access_exp,
            refresh_expires_at: refresh_exp,
        })
    }

    pub fn verify_access(&self, token: &str) -> TokenResult<TokenClaims> {
        self.access.verify(token)
    }

    pub fn verify_access_at(&self, token: &str, now: i64) -> TokenResult<TokenClaims> {
        self.access.verify_at(token, now)
    }

    /// Exchange a refresh token for a brand-new pair.
    ///
    /// The presented token is never re-signed or extended. It stays valid
    /// until its own expiry since there is no revocation store; the new
    /// refresh token supersedes it.
    pub fn refresh(&self, refresh_token: &str) -> TokenResult<(Subject, TokenPair)> {
        self.refresh_at(refresh_token, crate::now_unix())
    }

    pub fn refresh_at(&self, refresh_token: &str, now: i64) -> TokenResult<(Subject, TokenPair)> {
        let claims = self.refresh.verify_at(refresh_token, now)?;
        let subject = claims.subject();
        debug!(user_id = claims.user_id, "rotating token pair");
        let pair = self.issue_pair_at(&subject, now)?;
        Ok((subject, pair))
    }
}
