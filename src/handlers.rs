use axum::{
    Json,
    extract::{Path, Query},
};

use crate::{
    auth::Principal,
    models::{PageView, SignInQuery},
};

// --- Public Pages ---

/// get_home
///
/// [Public Route] Landing page, also the default target for callers denied a privileged path.
pub async fn get_home() -> Json<PageView> {
    Json(PageView::new("home"))
}

/// get_sign_in
///
/// [Public Route] Stand-in for the external sign-in page. Echoes the `callbackUrl` the gate
/// attached so the round trip can be observed.
pub async fn get_sign_in(Query(query): Query<SignInQuery>) -> Json<PageView> {
    Json(PageView {
        callback_url: query.callback_url,
        ..PageView::new("signin")
    })
}

// --- Gated Pages ---

/// get_account_settings
///
/// [Authenticated Route] Any verified principal may see its own settings.
pub async fn get_account_settings(principal: Principal) -> Json<PageView> {
    Json(PageView {
        identity: Some(principal.identity),
        ..PageView::new("account-settings")
    })
}

/// get_admin_dashboard
///
/// [Admin Route] Reached only by allow-listed identities.
pub async fn get_admin_dashboard(principal: Principal) -> Json<PageView> {
    Json(PageView {
        identity: Some(principal.identity),
        ..PageView::new("admin-dashboard")
    })
}

/// get_admin_client
///
/// [Admin Route] Detail page for a single client record.
pub async fn get_admin_client(principal: Principal, Path(id): Path<String>) -> Json<PageView> {
    Json(PageView {
        identity: Some(principal.identity),
        resource: Some(id),
        ..PageView::new("admin-client")
    })
}
