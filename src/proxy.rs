use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Method, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{AppState, error::GateError};

/// cookie_header
///
/// Rebuilds a `cookie` header from every cookie on the incoming request, in the
/// `name=value; name=value` form the backend expects.
pub fn cookie_header(jar: &CookieJar) -> String {
    jar.iter()
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect::<Vec<_>>()
        .join("; ")
}

/// upstream_url
///
/// Maps `/api/{path}?{query}` on the gateway to the same path on the backend.
pub fn upstream_url(base: &str, path: &str, query: Option<&str>) -> String {
    let mut url = format!("{}/api/{}", base.trim_end_matches('/'), path);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// proxy
///
/// [Protected Route] Forwards an API call to the backend, carrying the caller's
/// cookies so the backend sees the same session the browser holds. The upstream
/// status, body text, content type and any `set-cookie` headers are relayed.
pub async fn proxy(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    jar: CookieJar,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GateError> {
    let url = upstream_url(&state.config.api_base_url, &path, query.as_deref());
    tracing::debug!(%method, %url, "proxying to backend");

    let mut upstream = state
        .http
        .request(method.clone(), &url)
        .header(header::COOKIE, cookie_header(&jar));

    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        upstream = upstream.header(header::CONTENT_TYPE, content_type.clone());
    }
    if method != Method::GET && method != Method::HEAD {
        upstream = upstream.body(body);
    }

    let response = upstream.send().await?;
    let status = response.status();

    let mut relayed = HeaderMap::new();
    for cookie in response.headers().get_all(header::SET_COOKIE) {
        relayed.append(header::SET_COOKIE, cookie.clone());
    }
    if let Some(content_type) = response.headers().get(header::CONTENT_TYPE) {
        relayed.insert(header::CONTENT_TYPE, content_type.clone());
    }

    let text = response.text().await?;
    if status.is_server_error() {
        tracing::warn!(%url, status = status.as_u16(), "backend error");
    }
    Ok((status, relayed, text).into_response())
}
