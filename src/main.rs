use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use voiceclone_worker::api::routes::{create_router, AppState};
use voiceclone_worker::config::WorkerConfig;
use voiceclone_worker::job::JobHandler;
use voiceclone_worker::tts;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Configuration from environment
    let config = WorkerConfig::from_env();

    tracing::info!("Voice clone worker v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Backend: {}", config.backend);
    tracing::info!("Model directory: {}", config.model_dir.display());

    // The model must be resident before the first job is accepted.
    let engine = tts::create_engine(&config);
    engine.load().expect("Failed to load TTS model");

    let handler = JobHandler::new(engine, config.fetch_timeout);

    // Create app state
    let state = Arc::new(AppState { handler });

    // Create router
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid address");

    tracing::info!("Worker ready, listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
