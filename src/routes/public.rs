use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without a credential. The edge guard passes these through
/// without inspecting the token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe. Excluded from the guard entirely.
        .route("/health", get(|| async { "ok" }))
        // GET /login?redirect=...
        .route("/login", get(handlers::login_page))
        // GET /register
        .route("/register", get(handlers::register_page))
        // GET /unauthorized
        // Where non-admins land after trying an admin path.
        .route("/unauthorized", get(handlers::unauthorized_page))
}
