//! EchoAid server binary, the main entry point for the voice relay.
//!
//! Loads configuration, starts an axum HTTP server with structured logging,
//! spawns the audio retention task, and shuts down gracefully on
//! SIGTERM/SIGINT.

use echoaid_server::{app, config, retention, AppState};
use echoaid_voice::{VoiceTurnOrchestrator, DEFAULT_PUBLIC_PREFIX};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("ECHOAID_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    // Runs before any configuration is read from the environment.
    let env_file = config::load_env_file(None);

    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration: the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match env_file {
        Ok(Some(path)) => tracing::info!(path = %path.display(), "loaded .env file"),
        Ok(None) => tracing::debug!("no .env file found, using process environment"),
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env file"),
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );
    tracing::debug!(providers = ?config.providers, "provider configuration");

    // Prepare the output directory
    let audio_dir = PathBuf::from(&config.storage.audio_dir);
    std::fs::create_dir_all(&audio_dir)
        .expect("failed to create audio output directory: check storage.audio_dir in config");

    let orchestrator =
        VoiceTurnOrchestrator::new(config.providers.clone(), &audio_dir, DEFAULT_PUBLIC_PREFIX)
            .expect("failed to initialize voice pipeline");

    tokio::spawn(retention::start_audio_retention_task(
        audio_dir,
        config.storage.audio_retention_seconds,
        config.storage.sweep_interval_seconds,
    ));

    // Build application
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        audio_dir: config.storage.audio_dir.clone(),
        client_dir: config.storage.client_dir.clone(),
        max_upload_bytes: config.storage.max_upload_bytes,
    };
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting echoaid server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address: is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("echoaid server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
