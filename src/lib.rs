use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Edge gate: token inspection and the per-request route guard.
pub mod guard;
pub mod token;

// Client gate: session store, rehydrator, watcher.
pub mod session;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod proxy;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::GateConfig;
pub use guard::{GuardDecision, GuardPolicy, Identity, RouteClass, edge_guard};
pub use session::{AuthStore, Rehydrator, SessionState};

/// ApiDoc
///
/// OpenAPI document for the gateway's own endpoints, served at
/// `/api-docs/openapi.json`. Proxied backend routes are documented by the backend.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login_page, handlers::register_page, handlers::unauthorized_page,
        handlers::whoami, handlers::admin_whoami
    ),
    components(schemas(guard::Identity, models::UserType)),
    tags(
        (name = "makerspace-gate", description = "Makerspace edge gateway")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container handed to every handler and to the edge guard.
#[derive(Clone)]
pub struct AppState {
    /// Configuration: the loaded, immutable environment configuration.
    pub config: GateConfig,
    /// Route tables for the edge guard.
    pub policy: GuardPolicy,
    /// Outbound client used by the API proxy.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            policy: GuardPolicy::default(),
            http: reqwest::Client::new(),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for GateConfig {
    fn from_ref(app_state: &AppState) -> GateConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for GuardPolicy {
    fn from_ref(app_state: &AppState) -> GuardPolicy {
        app_state.policy.clone()
    }
}

/// create_router
///
/// Assembles the gateway: every route sits behind the edge guard, which in turn sits
/// inside the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .nest("/admin", admin::admin_routes())
        // The edge guard decides for every path; excluded paths pass straight through.
        .layer(middleware::from_fn_with_state(state.clone(), edge_guard))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span, tagging it with the `x-request-id` so every log line
/// of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
