use std::net::SocketAddr;
use std::sync::Arc;

use tracing::Level;

use yoda_backend::api::{self, AppState};
use yoda_backend::config::{self, Config};
use yoda_backend::services::joke::JOKE_CACHE_TTL;
use yoda_backend::services::{CachedJokeSource, DadJokeClient, GeminiClient};

fn main() {
    let dev_mode = config::dev_mode_enabled(std::env::var("DEV_MODE").ok().as_deref());
    tracing_subscriber::fmt()
        .with_max_level(if dev_mode { Level::DEBUG } else { Level::INFO })
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("FATAL ERROR: {e}");
            std::process::exit(1);
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime");

    runtime.block_on(serve(config));
}

async fn serve(config: Config) {
    tracing::info!("Starting server:");
    tracing::info!("  Host: {}", config.host);
    tracing::info!("  Port: {}", config.port);
    tracing::info!("  Dev mode: {}", config.dev_mode);
    tracing::info!("  Workers: {}", config.workers);

    // One pooled client for all outbound calls; each request sets its own timeout.
    let http = reqwest::Client::builder()
        .build()
        .expect("Failed to build HTTP client");

    let jokes = CachedJokeSource::new(
        DadJokeClient::new(http.clone(), config.joke_api_url.clone()),
        JOKE_CACHE_TTL,
    );
    let gemini = GeminiClient::new(
        http.clone(),
        config.gemini_api_base.clone(),
        config.gemini_model.clone(),
        config.google_api_key.clone(),
        config.gemini_timeout,
    );
    tracing::info!("Initialized Gemini client with model: {}", gemini.model());

    let state = AppState::new(Arc::new(jokes), Arc::new(gemini));
    let app = api::router(state, config.static_dir.clone());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!("Yoda backend listening on {addr}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    tracing::info!("Application shutdown...");
    drop(http);
    tracing::info!("HTTP client closed.");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
