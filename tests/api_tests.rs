use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use portal_gate::{
    AppConfig, AppState, auth::Claims, config::parse_list, create_router, models::PageView,
    policy::AccessPolicy,
};
use reqwest::{StatusCode, redirect::Policy};
use tokio::net::TcpListener;

const TEST_JWT_SECRET: &str = "api-test-secret-value";

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

async fn spawn_app() -> TestApp {
    let mut config = AppConfig::with_secret(TEST_JWT_SECRET);
    config.access = AccessPolicy::new("/admin", parse_list(""), parse_list("ryanwright.io"));
    let router = create_router(AppState::new(config));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Redirects are the gate's output, so the client must not follow them.
    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap();

    TestApp { address, client }
}

fn create_token(email: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: None,
        email: Some(email.to_string()),
        iat: Some(now as usize),
        exp: (now + 600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_sign_in_round_trip() {
    let app = spawn_app().await;

    // Anonymous: bounced to sign-in with the original target preserved.
    let response = app
        .client
        .get(format!("{}/admin/client/abc?tab=notes", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()["location"].to_str().unwrap().to_string();
    assert_eq!(
        location,
        "/auth/signin?callbackUrl=%2Fadmin%2Fclient%2Fabc%3Ftab%3Dnotes"
    );

    // The sign-in page sees the decoded callback.
    let sign_in: PageView = app
        .client
        .get(format!("{}{}", app.address, location))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    let callback = sign_in.callback_url.expect("callback present");
    assert_eq!(callback, "/admin/client/abc?tab=notes");

    // Back at the callback with a session, the page is served uncached.
    let response = app
        .client
        .get(format!("{}{}", app.address, callback))
        .bearer_auth(create_token("user@ryanwright.io"))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["cache-control"],
        "no-store, no-cache, must-revalidate, proxy-revalidate"
    );
    assert_eq!(response.headers()["pragma"], "no-cache");
    assert_eq!(response.headers()["expires"], "0");

    let view: PageView = response.json().await.unwrap();
    assert_eq!(view.resource.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_forbidden_identity_via_cookie() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/admin/dashboard", app.address))
        .header(
            "cookie",
            format!("session_token={}", create_token("user@example.com")),
        )
        .send()
        .await
        .expect("req fail");

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()["location"], "/");
}
