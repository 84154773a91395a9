//! EchoAid server library logic.

pub mod api;
pub mod api_turn;
pub mod config;
pub mod retention;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use echoaid_voice::{VoiceTurnOrchestrator, DEFAULT_PUBLIC_PREFIX};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Voice turn pipeline, shared by all requests.
    pub orchestrator: Arc<VoiceTurnOrchestrator>,
    /// Directory synthesized replies are written to and served from.
    pub audio_dir: String,
    /// Directory holding the browser client.
    pub client_dir: String,
    /// Body limit for audio uploads.
    pub max_upload_bytes: usize,
}

/// Maximum request body size outside the upload route (64 KiB).
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    // The upload route gets its own, larger body limit.
    let turn_routes = Router::new()
        .route("/process-audio", post(api_turn::process_audio_handler))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    let router = Router::new()
        .route("/health", get(health))
        .merge(turn_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES));

    // Generated replies are referenced as /audio/<file>. The directory may
    // not exist until the first turn; ServeDir resolves paths per request.
    tracing::info!(path = %state.audio_dir, "serving generated audio at {}", DEFAULT_PUBLIC_PREFIX);
    let router = router.nest_service(DEFAULT_PUBLIC_PREFIX, ServeDir::new(&state.audio_dir));

    let client_dir = state.client_dir.clone();
    if !std::path::Path::new(&client_dir).is_absolute() {
        tracing::warn!(
            path = %client_dir,
            "client directory is relative; static file serving depends on working directory; \
             consider using an absolute path"
        );
    }
    let router = if std::path::Path::new(&client_dir).join("index.html").exists() {
        tracing::info!(path = %client_dir, "serving client static files");
        let index = format!("{}/index.html", client_dir);
        router.fallback_service(ServeDir::new(&client_dir).fallback(ServeFile::new(index)))
    } else {
        tracing::info!(path = %client_dir, "client directory not found, skipping static file serving");
        router
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
