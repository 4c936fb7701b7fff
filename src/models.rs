use serde::{Deserialize, Serialize};

// --- Page Payloads ---

/// PageView
///
/// What the stand-in page handlers return. Real rendering lives outside this service; these
/// payloads only show which page was reached and on whose behalf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PageView {
    pub page: String,
    // Identity of the principal the gate forwarded, absent on public pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    // Resource id for detail pages (e.g. the client behind /admin/client/{id}).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    // Sign-in page only: where the caller goes after authenticating.
    #[serde(
        default,
        rename = "callbackUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub callback_url: Option<String>,
}

impl PageView {
    pub fn new(page: &str) -> Self {
        Self {
            page: page.to_string(),
            ..Default::default()
        }
    }
}

/// SignInQuery
///
/// Query parameters accepted by the sign-in page.
#[derive(Debug, Deserialize)]
pub struct SignInQuery {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}
