//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Multipart overhead allowed on top of the avatar limit.
const AVATAR_OVERHEAD: u64 = 256 * 1024;

/// Multipart overhead allowed on top of two character images.
const CHARACTER_OVERHEAD: u64 = 512 * 1024;

fn body_limit(bytes: u64) -> DefaultBodyLimit {
    DefaultBodyLimit::max(usize::try_from(bytes).unwrap_or(usize::MAX))
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let avatar_limit = body_limit(state.avatar_limit().saturating_add(AVATAR_OVERHEAD));
    let character_limit = body_limit(
        state
            .character_limit()
            .saturating_mul(2)
            .saturating_add(CHARACTER_OVERHEAD),
    );

    let api_routes = Router::new()
        // Health check (unauthenticated for probes)
        .route("/health", get(handlers::health_check))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .route(
            "/user/info",
            get(handlers::get_info).put(handlers::update_info),
        )
        .route("/user/password", post(handlers::change_password))
        .route(
            "/user/avatar",
            post(handlers::upload_avatar).layer(avatar_limit),
        )
        .route(
            "/characters",
            get(handlers::list_characters)
                .post(handlers::create_character)
                .layer(character_limit),
        )
        .route(
            "/characters/{id}",
            get(handlers::get_character)
                .put(handlers::update_character)
                .delete(handlers::delete_character)
                .layer(character_limit),
        )
        // Stored assets are public: filenames carry 64 random bits.
        .route("/uploads/{category}/{filename}", get(handlers::get_asset));

    let prefix = state.config.server.api_prefix.trim_end_matches('/');
    let router = if prefix.is_empty() {
        Router::new().merge(api_routes)
    } else {
        Router::new().nest(prefix, api_routes)
    };

    // Layers run outermost first: Trace -> CORS -> Auth -> Handler
    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(cors_layer(
            &state.config.server.cors_allow_origins,
            state.config.server.cors_allow_credentials,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String], allow_credentials: bool) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_origin(Any);
    }

    // Wildcards are not allowed alongside credentials, so echo the request.
    let layer = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = layer.allow_origin(AllowOrigin::list(origins));
    if allow_credentials {
        layer.allow_credentials(true)
    } else {
        layer
    }
}
