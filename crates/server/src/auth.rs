//! Authentication middleware and the typed caller extractor.

use crate::error::ApiError;
use crate::state::AppState;
use aifriend_core::Subject;
use aifriend_token::TokenError;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to prevent log bloat and potential log injection.
const MAX_TRACE_ID_LEN: usize = 128;

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value.
    ///
    /// Truncated to [`MAX_TRACE_ID_LEN`] characters, non-printable characters
    /// removed.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The caller, as proven by a verified access token.
///
/// Handlers take this as an extractor and pass `subject` explicitly into
/// every core operation.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub subject: Subject,
}

/// Why a presented bearer token was not accepted.
#[derive(Clone, Debug)]
struct RejectedToken(TokenError);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }
        match parts.extensions.get::<RejectedToken>() {
            Some(RejectedToken(e)) => Err(e.clone().into()),
            None => Err(ApiError::Unauthorized(
                "authentication required".to_string(),
            )),
        }
    }
}

/// Extract bearer token from Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
pub fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(v[7..].trim())
            } else {
                None
            }
        })
}

/// Extract trace ID from X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Verify the bearer access token (if any) and set up trace context.
///
/// A missing or rejected token does not fail the request here: public routes
/// ignore it, and protected routes fail in the [`AuthenticatedUser`]
/// extractor with the recorded reason.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let trace_id = extract_or_generate_trace_id(&req);
    let trace_id_str = trace_id.0.clone();
    req.extensions_mut().insert(trace_id);

    let verified = extract_bearer_token(&req).map(|token| state.tokens.verify_access(token));
    match verified {
        Some(Ok(claims)) => {
            req.extensions_mut().insert(AuthenticatedUser {
                subject: claims.subject(),
            });
        }
        Some(Err(e)) => {
            tracing::debug!(error = %e, "bearer token rejected");
            req.extensions_mut().insert(RejectedToken(e));
        }
        None => {}
    }

    next.run(req)
        .instrument(tracing::info_span!("request", trace_id = %trace_id_str))
        .await
}
