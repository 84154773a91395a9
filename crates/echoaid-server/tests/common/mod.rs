//! Shared setup: stand-in providers and an app wired to them.
#![allow(dead_code)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use echoaid_server::{app, AppState};
use echoaid_voice::{ProviderConfig, VoiceTurnOrchestrator, DEFAULT_PUBLIC_PREFIX};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const ELEVENLABS_KEY: &str = "eleven-server-test-key";
pub const GEMINI_KEY: &str = "gemini-server-test-key";
pub const MOCK_MP3: &[u8] = b"ID3\x04\x00\x00\x00\x00\x00\x00SERVER_MOCK_FRAMES";
pub const BOUNDARY: &str = "echoaid-test-boundary";

#[derive(Clone)]
pub struct Script {
    pub stt: (StatusCode, Value),
    pub llm: (StatusCode, Value),
    pub tts: (StatusCode, Vec<u8>),
}

impl Default for Script {
    fn default() -> Self {
        Self {
            stt: (StatusCode::OK, json!({ "text": "I can't sleep lately" })),
            llm: (
                StatusCode::OK,
                json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": "I'm sorry it's been hard to rest." }] }
                    }]
                }),
            ),
            tts: (StatusCode::OK, MOCK_MP3.to_vec()),
        }
    }
}

#[derive(Default)]
pub struct Hits {
    pub stt: AtomicUsize,
    pub llm: AtomicUsize,
    pub tts: AtomicUsize,
}

impl Hits {
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.stt.load(Ordering::SeqCst),
            self.llm.load(Ordering::SeqCst),
            self.tts.load(Ordering::SeqCst),
        )
    }
}

struct Shared {
    script: Script,
    hits: Arc<Hits>,
}

async fn speech_to_text(State(shared): State<Arc<Shared>>) -> Response {
    shared.hits.stt.fetch_add(1, Ordering::SeqCst);
    let (status, body) = shared.script.stt.clone();
    (status, Json(body)).into_response()
}

async fn generate_content(State(shared): State<Arc<Shared>>) -> Response {
    shared.hits.llm.fetch_add(1, Ordering::SeqCst);
    let (status, body) = shared.script.llm.clone();
    (status, Json(body)).into_response()
}

async fn text_to_speech(State(shared): State<Arc<Shared>>) -> Response {
    shared.hits.tts.fetch_add(1, Ordering::SeqCst);
    let (status, audio) = shared.script.tts.clone();
    (status, [("content-type", "audio/mpeg")], audio).into_response()
}

/// A running app plus the providers behind it.
pub struct TestApp {
    pub router: Router,
    pub hits: Arc<Hits>,
    pub audio_dir: tempfile::TempDir,
    pub client_dir: tempfile::TempDir,
}

/// Starts stand-in providers and builds the app against them.
pub async fn setup_app(script: Script) -> TestApp {
    let hits = Arc::new(Hits::default());
    let shared = Arc::new(Shared {
        script,
        hits: hits.clone(),
    });

    let providers = Router::new()
        .route("/v1/speech-to-text", post(speech_to_text))
        .route("/v1beta/models/{model}", post(generate_content))
        .route("/v1/text-to-speech/{voice_id}", post(text_to_speech))
        .with_state(shared);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, providers).await.unwrap();
    });

    let base_url = format!("http://{}", addr);
    let config =
        ProviderConfig::new(ELEVENLABS_KEY, GEMINI_KEY).with_base_urls(&base_url, &base_url);

    let audio_dir = tempfile::tempdir().unwrap();
    let client_dir = tempfile::tempdir().unwrap();
    tokio::fs::write(
        client_dir.path().join("index.html"),
        "<!doctype html><title>EchoAid</title>",
    )
    .await
    .unwrap();

    let orchestrator =
        VoiceTurnOrchestrator::new(config, audio_dir.path(), DEFAULT_PUBLIC_PREFIX).unwrap();

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        audio_dir: audio_dir.path().to_string_lossy().into_owned(),
        client_dir: client_dir.path().to_string_lossy().into_owned(),
        max_upload_bytes: 1024 * 1024,
    };

    TestApp {
        router: app(state),
        hits,
        audio_dir,
        client_dir,
    }
}

/// One part of a hand-built multipart body.
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

pub fn audio_part(data: &[u8]) -> Part<'_> {
    Part {
        name: "audio",
        file_name: Some("blob"),
        content_type: Some("audio/webm"),
        data,
    }
}

pub fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(file_name) = part.file_name {
            disposition.push_str(&format!("; filename=\"{}\"", file_name));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(ct) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/process-audio")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
