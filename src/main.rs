use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roomchat::{
    abuse::{ContentFilter, FloodConfig},
    api,
    auth::AdminConfig,
    config::ChatConfig,
    state::AppState,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomchat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting roomchat...");

    let state = Arc::new(AppState::new_with_config(
        ChatConfig::from_env(),
        AdminConfig::from_env(),
        ContentFilter::from_env(),
        FloodConfig::from_env(),
    ));

    let static_dir = std::env::var("CHAT_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
    let app = api::router(state, &static_dir);

    let port: u16 = match std::env::var("PORT") {
        Ok(raw) => match raw.trim().parse() {
            Ok(port) => port,
            Err(_) => {
                tracing::warn!("Invalid PORT '{}', falling back to 3000", raw);
                3000
            }
        },
        Err(_) => 3000,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            return;
        }
    };
    tracing::info!("Listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
