use std::sync::Arc;

use axum::{Router, extract::FromRef, http::HeaderName, middleware};

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Gate core: token stage, allow-list policy, route matching, decision.
pub mod auth;
pub mod config;
pub mod gate;
pub mod matcher;
pub mod policy;

// Stand-in pages behind (and in front of) the gate.
pub mod handlers;
pub mod models;
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::{JwtVerifier, Principal, TokenVerifier};
pub use config::AppConfig;
pub use gate::{Gate, GateDecision, GateState, gate_middleware};

/// AppState
///
/// Shared, immutable application state: the loaded configuration and the gate built from it.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub gate: Arc<Gate>,
}

impl AppState {
    /// Builds state with the HS256 gate for `config`.
    pub fn new(config: AppConfig) -> Self {
        let gate = Arc::new(Gate::from_config(&config));
        Self { config, gate }
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for Arc<Gate> {
    fn from_ref(app_state: &AppState) -> Arc<Gate> {
        app_state.gate.clone()
    }
}

/// create_router
///
/// Assembles the routes, wraps them in the gate and the observability layers, and registers
/// the application state.
pub fn create_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    // The gate wraps every route and the fallback; it skips paths the matcher does not cover
    // itself, so unknown paths under a gated prefix are still redirected rather than 404'd.
    let base_router = Router::new()
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .nest("/admin", admin::admin_routes())
        .layer(middleware::from_fn_with_state(
            state.gate.clone(),
            gate_middleware,
        ))
        .with_state(state);

    // Observability layers sit outside the gate so redirects are traced too.
    base_router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(
                x_request_id.clone(),
                MakeRequestUuid,
            ))
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
}

/// trace_span_logger
///
/// Span for `TraceLayer` carrying method, path and the `x-request-id` set above. The query
/// string stays out of logs.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
