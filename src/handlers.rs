use axum::{
    Json,
    extract::Query,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::guard::Identity;

/// LoginQuery
///
/// Query parameters the edge guard attaches when it bounces a request to login.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// The path the user originally asked for.
    pub redirect: Option<String>,
}

// --- Handlers ---

/// login_page
///
/// [Public Route] Landing point for unauthenticated users. The real login form is
/// rendered by the web client; the gateway only acknowledges where to return to.
#[utoipa::path(
    get,
    path = "/login",
    params(LoginQuery),
    responses((status = 200, description = "Login required"))
)]
pub async fn login_page(Query(query): Query<LoginQuery>) -> impl IntoResponse {
    match query.redirect {
        Some(redirect) => format!("Login required to continue to {}", redirect),
        None => "Login required".to_string(),
    }
}

/// register_page
///
/// [Public Route] Registration landing point.
#[utoipa::path(
    get,
    path = "/register",
    responses((status = 200, description = "Registration"))
)]
pub async fn register_page() -> impl IntoResponse {
    "Register"
}

/// unauthorized_page
///
/// Target of the edge guard's insufficient-permissions redirect.
#[utoipa::path(
    get,
    path = "/unauthorized",
    responses((status = 403, description = "Insufficient permissions"))
)]
pub async fn unauthorized_page() -> impl IntoResponse {
    (StatusCode::FORBIDDEN, "You do not have access to this page")
}

/// whoami
///
/// [Protected Route] Echoes the identity the edge guard derived from the token.
#[utoipa::path(
    get,
    path = "/whoami",
    responses(
        (status = 200, description = "Identity", body = Identity),
        (status = 401, description = "Not behind the edge guard")
    )
)]
pub async fn whoami(identity: Identity) -> Json<Identity> {
    Json(identity)
}

/// admin_whoami
///
/// [Admin Route] Same as `whoami`, reachable only by ADMIN and SUPERADMIN tokens.
#[utoipa::path(
    get,
    path = "/admin/whoami",
    responses(
        (status = 200, description = "Admin identity", body = Identity),
        (status = 401, description = "Not behind the edge guard")
    )
)]
pub async fn admin_whoami(identity: Identity) -> Json<Identity> {
    Json(identity)
}
