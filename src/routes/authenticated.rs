use crate::{AppState, handlers, proxy};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes that only run once the edge guard has seen an unexpired token. Handlers
/// read the caller through the `Identity` extractor.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /whoami
        .route("/whoami", get(handlers::whoami))
        // GET|POST|PUT|DELETE /api/{*path}
        // Cookie-forwarding proxy to the backend API. `/api/auth/*` is excluded from
        // the guard, so login, logout, register and me go through unconditionally.
        .route(
            "/api/{*path}",
            get(proxy::proxy)
                .post(proxy::proxy)
                .put(proxy::proxy)
                .delete(proxy::proxy),
        )
}
