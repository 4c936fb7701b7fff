use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Pages for any verified principal. Each handler takes a `Principal` argument, which the gate
/// places in the request extensions when it forwards.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /account/settings
        .route("/account/settings", get(handlers::get_account_settings))
}
