use portal_gate::{
    AppState,
    config::{AppConfig, Env},
    create_router,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, installs logging, builds the gate and serves it.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail fast)
    // Logging is not installed yet, so a bad configuration is reported on stderr and the
    // process exits before binding anything.
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // 2. Logging
    // RUST_LOG wins; otherwise debug for the gate and info for the HTTP layer.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portal_gate=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gate starting in {:?} mode", config.env);

    if config.access.is_empty() {
        tracing::warn!(
            prefix = config.access.privileged_prefix(),
            "allow-lists are empty; every privileged request will be denied"
        );
    }
    if config.matcher.is_empty() {
        tracing::warn!("GATE_MATCHER has no patterns; no request will be gated");
    }

    // 3. State, router, server
    let bind_addr = config.bind_addr;
    let app = create_router(AppState::new(config));

    let listener = match TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%bind_addr, error = %e, "failed to bind listener");
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on {}", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server exited with error");
        std::process::exit(1);
    }
}
