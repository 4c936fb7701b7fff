use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Pages reachable without a session. The sign-in page and the denied-access fallback must
/// stay here: gating either one would send a redirected caller straight back to the gate.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Load balancer probe.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // Home, and the default target for denied privileged requests.
        .route("/", get(handlers::get_home))
        // GET /auth/signin?callbackUrl=...
        .route("/auth/signin", get(handlers::get_sign_in))
}
