use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use url::form_urlencoded;
use utoipa::ToSchema;

use crate::{
    config::GateConfig,
    models::UserType,
    token::{TokenClaims, decode_claims},
};

pub const HEADER_USER_EMAIL: HeaderName = HeaderName::from_static("x-user-email");
pub const HEADER_USER_TYPE: HeaderName = HeaderName::from_static("x-user-type");
pub const HEADER_USER_AUTHORITIES: HeaderName = HeaderName::from_static("x-user-authorities");
pub const HEADER_AUTHENTICATED: HeaderName = HeaderName::from_static("x-authenticated");

const IDENTITY_HEADERS: [HeaderName; 4] = [
    HEADER_USER_EMAIL,
    HEADER_USER_TYPE,
    HEADER_USER_AUTHORITIES,
    HEADER_AUTHENTICATED,
];

/// RouteClass
///
/// How the edge guard treats a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Reachable without any credential.
    Public,
    /// Requires an unexpired token.
    Protected,
    /// Requires an unexpired token carrying an ADMIN or SUPERADMIN user type.
    AdminRestricted,
}

/// IdentityHeaders
///
/// Best-effort identity derived from the token payload and handed downstream.
/// These values come from an unverified token: they are fine for personalising a
/// page, not for authorising a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityHeaders {
    pub subject: String,
    pub user_type: String,
    pub authorities_json: String,
    pub authenticated: bool,
}

impl IdentityHeaders {
    fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            subject: claims.sub.clone().unwrap_or_default(),
            user_type: claims.user_type.clone().unwrap_or_default(),
            authorities_json: claims.authorities_json(),
            authenticated: true,
        }
    }

    /// Writes the four identity headers, replacing any existing values. A value that
    /// is not a legal header value is skipped.
    pub fn apply(&self, headers: &mut HeaderMap) {
        let authenticated = if self.authenticated { "true" } else { "false" };
        let pairs = [
            (HEADER_USER_EMAIL, self.subject.as_str()),
            (HEADER_USER_TYPE, self.user_type.as_str()),
            (HEADER_USER_AUTHORITIES, self.authorities_json.as_str()),
            (HEADER_AUTHENTICATED, authenticated),
        ];
        for (name, value) in pairs {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.insert(name, value);
                }
                Err(_) => tracing::debug!(header = %name, "identity value is not a valid header"),
            }
        }
    }
}

/// GuardDecision
///
/// The outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Let the request through. `identity` is `None` for public routes.
    Pass { identity: Option<IdentityHeaders> },
    /// Bounce to the login page, remembering where the user was going.
    RedirectToLogin { redirect: String },
    /// Authenticated but not allowed here.
    RedirectToUnauthorized,
}

/// GuardPolicy
///
/// The route tables the edge guard works from. All matching is by prefix.
#[derive(Debug, Clone)]
pub struct GuardPolicy {
    pub public_prefixes: Vec<String>,
    pub admin_prefix: String,
    pub login_path: String,
    pub unauthorized_path: String,
    /// Paths the guard never runs for (auth API, static assets, favicon, health probe).
    pub excluded_prefixes: Vec<String>,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            public_prefixes: ["/login", "/register", "/api/auth/login", "/api/auth/register"]
                .map(String::from)
                .to_vec(),
            admin_prefix: "/admin".to_string(),
            login_path: "/login".to_string(),
            unauthorized_path: "/unauthorized".to_string(),
            excluded_prefixes: [
                "/api/auth",
                "/_next/static",
                "/_next/image",
                "/favicon.ico",
                "/health",
            ]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl GuardPolicy {
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.public_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            RouteClass::Public
        } else if path.starts_with(self.admin_prefix.as_str()) {
            RouteClass::AdminRestricted
        } else {
            RouteClass::Protected
        }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_prefixes
            .iter()
            .any(|p| path.starts_with(p.as_str()))
    }

    /// evaluate
    ///
    /// Decides what happens to a request for `path` given the stored token, if any.
    /// Pure and synchronous: no network, no database, no clock reads (`now_secs` is
    /// supplied by the caller).
    ///
    /// 1. Public routes pass without looking at the token.
    /// 2. A missing, undecodable, `exp`-less or expired token redirects to login.
    /// 3. Admin-restricted routes redirect non-admins to the unauthorized page.
    /// 4. Everything else passes with identity headers.
    pub fn evaluate(&self, path: &str, token: Option<&str>, now_secs: i64) -> GuardDecision {
        let class = self.classify(path);
        if class == RouteClass::Public {
            return GuardDecision::Pass { identity: None };
        }

        let claims = match token.and_then(decode_claims) {
            Some(claims) if !claims.is_expired(now_secs) => claims,
            _ => {
                return GuardDecision::RedirectToLogin {
                    redirect: path.to_string(),
                };
            }
        };

        if class == RouteClass::AdminRestricted && !claims.is_admin() {
            return GuardDecision::RedirectToUnauthorized;
        }

        GuardDecision::Pass {
            identity: Some(IdentityHeaders::from_claims(&claims)),
        }
    }

    /// The login URL with the original path in the `redirect` query parameter.
    pub fn login_location(&self, redirect: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("redirect", redirect)
            .finish();
        format!("{}?{}", self.login_path, query)
    }
}

/// edge_guard
///
/// Middleware wrapping the whole router. Reads the credential token from its cookie,
/// evaluates the policy against wall-clock seconds and either redirects or forwards.
///
/// Identity headers supplied by the client are always stripped before forwarding so a
/// downstream handler only ever sees values this guard derived.
pub async fn edge_guard(
    State(policy): State<GuardPolicy>,
    State(config): State<GateConfig>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    for name in &IDENTITY_HEADERS {
        request.headers_mut().remove(name);
    }

    let path = request.uri().path().to_string();
    if policy.is_excluded(&path) {
        return next.run(request).await;
    }

    let token = jar.get(&config.token_cookie).map(|c| c.value().to_string());
    tracing::debug!(
        path = %path,
        token = if token.is_some() { "present" } else { "missing" },
        "edge guard evaluating"
    );

    let now_secs = chrono::Utc::now().timestamp();
    match policy.evaluate(&path, token.as_deref(), now_secs) {
        GuardDecision::Pass { identity: None } => next.run(request).await,
        GuardDecision::Pass {
            identity: Some(identity),
        } => {
            identity.apply(request.headers_mut());
            let mut response = next.run(request).await;
            identity.apply(response.headers_mut());
            tracing::debug!(path = %path, user_type = %identity.user_type, "edge guard passed");
            response
        }
        GuardDecision::RedirectToLogin { redirect } => {
            tracing::info!(path = %path, "no valid token, redirecting to login");
            Redirect::temporary(&policy.login_location(&redirect)).into_response()
        }
        GuardDecision::RedirectToUnauthorized => {
            tracing::info!(path = %path, "insufficient permissions, redirecting");
            Redirect::temporary(&policy.unauthorized_path).into_response()
        }
    }
}

/// Identity Extractor Result
///
/// The identity the edge guard attached to this request. Handlers behind the guard
/// take it as an argument to read who is asking.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Identity {
    pub email: String,
    pub user_type: Option<UserType>,
    pub authorities: Vec<String>,
}

/// Identity Extractor Implementation
///
/// Rejects with 401 when the request did not come through the guard's pass branch
/// (no `x-authenticated: true` header).
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        if header_str(headers, &HEADER_AUTHENTICATED) != "true" {
            return Err(StatusCode::UNAUTHORIZED);
        }

        Ok(Identity {
            email: header_str(headers, &HEADER_USER_EMAIL).to_string(),
            user_type: header_str(headers, &HEADER_USER_TYPE).parse().ok(),
            authorities: parse_authorities(header_str(headers, &HEADER_USER_AUTHORITIES)),
        })
    }
}

/// Reads the authorities header. Non-string entries are kept as their JSON text.
fn parse_authorities(raw: &str) -> Vec<String> {
    serde_json::from_str::<Vec<serde_json::Value>>(raw)
        .unwrap_or_default()
        .into_iter()
        .map(|entry| match entry {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .collect()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

    const NOW: i64 = 1_700_000_000;

    fn token(payload: serde_json::Value) -> String {
        format!(
            "{}.{}.unsigned",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
            URL_SAFE_NO_PAD.encode(payload.to_string())
        )
    }

    fn user_token(user_type: &str, exp: i64) -> String {
        token(serde_json::json!({
            "sub": "a@b.com",
            "exp": exp,
            "userType": user_type,
            "authorities": ["X"],
        }))
    }

    #[test]
    fn classifies_routes_by_prefix() {
        let policy = GuardPolicy::default();
        assert_eq!(policy.classify("/login"), RouteClass::Public);
        assert_eq!(policy.classify("/register/confirm"), RouteClass::Public);
        assert_eq!(policy.classify("/api/auth/login"), RouteClass::Public);
        assert_eq!(policy.classify("/admin"), RouteClass::AdminRestricted);
        assert_eq!(policy.classify("/admin/users"), RouteClass::AdminRestricted);
        assert_eq!(policy.classify("/workshops"), RouteClass::Protected);
        assert_eq!(policy.classify("/"), RouteClass::Protected);
    }

    #[test]
    fn excluded_paths_match_the_matcher_exclusions() {
        let policy = GuardPolicy::default();
        assert!(policy.is_excluded("/api/auth/me"));
        assert!(policy.is_excluded("/_next/static/chunk.js"));
        assert!(policy.is_excluded("/favicon.ico"));
        assert!(!policy.is_excluded("/api/workshops"));
    }

    #[test]
    fn public_routes_pass_regardless_of_token() {
        let policy = GuardPolicy::default();
        let expired = user_token("NORMAL", NOW - 10);
        for token in [None, Some("garbage"), Some(expired.as_str())] {
            assert_eq!(
                policy.evaluate("/login", token, NOW),
                GuardDecision::Pass { identity: None }
            );
        }
    }

    #[test]
    fn protected_routes_without_valid_token_redirect_to_login() {
        let policy = GuardPolicy::default();
        let expired = user_token("ADMIN", NOW - 1);
        let no_exp = token(serde_json::json!({"sub": "a@b.com", "userType": "ADMIN"}));
        for token in [None, Some("not.a-token"), Some(expired.as_str()), Some(no_exp.as_str())] {
            assert_eq!(
                policy.evaluate("/workshops/3", token, NOW),
                GuardDecision::RedirectToLogin {
                    redirect: "/workshops/3".to_string()
                }
            );
        }
    }

    #[test]
    fn token_expiring_this_second_still_passes() {
        let policy = GuardPolicy::default();
        let token = user_token("NORMAL", NOW);
        assert!(matches!(
            policy.evaluate("/workshops", Some(&token), NOW),
            GuardDecision::Pass { identity: Some(_) }
        ));
    }

    #[test]
    fn non_admins_are_kept_out_of_admin_routes() {
        let policy = GuardPolicy::default();
        for user_type in ["NORMAL", "INSTRUCTOR", "SOMETHING_ELSE"] {
            let token = user_token(user_type, NOW + 60);
            assert_eq!(
                policy.evaluate("/admin/users", Some(&token), NOW),
                GuardDecision::RedirectToUnauthorized
            );
        }
    }

    #[test]
    fn admins_pass_everywhere_with_matching_identity() {
        let policy = GuardPolicy::default();
        for user_type in ["ADMIN", "SUPERADMIN"] {
            let token = user_token(user_type, NOW + 60);
            for path in ["/admin/users", "/workshops"] {
                let expected = IdentityHeaders {
                    subject: "a@b.com".to_string(),
                    user_type: user_type.to_string(),
                    authorities_json: r#"["X"]"#.to_string(),
                    authenticated: true,
                };
                assert_eq!(
                    policy.evaluate(path, Some(&token), NOW),
                    GuardDecision::Pass {
                        identity: Some(expected)
                    }
                );
            }
        }
    }

    #[test]
    fn missing_optional_claims_become_empty_headers() {
        let policy = GuardPolicy::default();
        let token = token(serde_json::json!({"exp": NOW + 60}));
        let GuardDecision::Pass {
            identity: Some(identity),
        } = policy.evaluate("/lessons", Some(&token), NOW)
        else {
            panic!("expected pass");
        };
        assert_eq!(identity.subject, "");
        assert_eq!(identity.user_type, "");
        assert_eq!(identity.authorities_json, "[]");
    }

    #[test]
    fn fractional_expiry_still_passes() {
        let policy = GuardPolicy::default();
        let token = token(serde_json::json!({
            "sub": "a@b.com",
            "exp": 4_102_444_800.5,
            "userType": "ADMIN",
            "authorities": ["X"],
        }));
        assert!(matches!(
            policy.evaluate("/workshops", Some(&token), NOW),
            GuardDecision::Pass { identity: Some(_) }
        ));
    }

    #[test]
    fn non_string_authorities_pass_through_unchanged() {
        let policy = GuardPolicy::default();
        let token = token(serde_json::json!({"exp": NOW + 60, "authorities": [1]}));
        let GuardDecision::Pass {
            identity: Some(identity),
        } = policy.evaluate("/workshops", Some(&token), NOW)
        else {
            panic!("expected pass");
        };
        assert_eq!(identity.authorities_json, "[1]");
        assert_eq!(parse_authorities(&identity.authorities_json), vec!["1"]);
    }

    #[test]
    fn login_location_encodes_the_original_path() {
        let policy = GuardPolicy::default();
        assert_eq!(
            policy.login_location("/workshops/3/edit"),
            "/login?redirect=%2Fworkshops%2F3%2Fedit"
        );
    }
}
