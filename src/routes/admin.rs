use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Pages under the privileged prefix. The gate only forwards here when the principal's
/// identity, or its domain, is on the allow-list.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/dashboard
        .route("/dashboard", get(handlers::get_admin_dashboard))
        // GET /admin/client/{id}
        .route("/client/{id}", get(handlers::get_admin_client))
}
