use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Nested under `/admin`. The edge guard redirects any token whose user type is
/// not ADMIN or SUPERADMIN to `/unauthorized` before these handlers run.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/whoami
        .route("/whoami", get(handlers::admin_whoami))
}
