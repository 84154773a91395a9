//! Local stand-ins for the speech-to-text, generation and text-to-speech
//! providers. Each endpoint counts its hits and records what it was sent.
#![allow(dead_code)]

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use echoaid_voice::{ProviderConfig, VoiceTurnOrchestrator};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub const ELEVENLABS_KEY: &str = "eleven-test-key";
pub const GEMINI_KEY: &str = "gemini-test-key";
pub const MOCK_MP3: &[u8] = b"ID3\x04\x00\x00\x00\x00\x00\x00MOCK_MPEG_FRAMES";

/// Canned responses for each provider.
#[derive(Clone)]
pub struct Script {
    pub stt: (StatusCode, Value),
    pub llm: (StatusCode, Value),
    pub tts: (StatusCode, Vec<u8>),
}

impl Default for Script {
    fn default() -> Self {
        Self {
            stt: (StatusCode::OK, json!({ "text": "I feel a bit anxious today" })),
            llm: (
                StatusCode::OK,
                json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": "That sounds hard. Want to try a slow breath together?" }] },
                        "finishReason": "STOP"
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
    pub stt_key: Mutex<Option<String>>,
    pub stt_fields: Mutex<HashMap<String, (Option<String>, Option<String>, Vec<u8>)>>,
    pub llm_key: Mutex<Option<String>>,
    pub llm_model: Mutex<Option<String>>,
    pub llm_body: Mutex<Option<Value>>,
    pub tts_key: Mutex<Option<String>>,
    pub tts_accept: Mutex<Option<String>>,
    pub tts_voice: Mutex<Option<String>>,
    pub tts_body: Mutex<Option<Value>>,
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

pub struct MockProviders {
    pub addr: SocketAddr,
    pub hits: Arc<Hits>,
}

impl MockProviders {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> ProviderConfig {
        ProviderConfig::new(ELEVENLABS_KEY, GEMINI_KEY).with_base_urls(self.base_url(), self.base_url())
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn speech_to_text(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    shared.hits.stt.fetch_add(1, Ordering::SeqCst);
    *shared.hits.stt_key.lock().unwrap() = header(&headers, "xi-api-key");

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        shared
            .hits
            .stt_fields
            .lock()
            .unwrap()
            .insert(name, (file_name, content_type, data));
    }

    let (status, body) = shared.script.stt.clone();
    (status, Json(body)).into_response()
}

async fn generate_content(
    State(shared): State<Arc<Shared>>,
    Path(model): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    shared.hits.llm.fetch_add(1, Ordering::SeqCst);
    *shared.hits.llm_key.lock().unwrap() = query.get("key").cloned();
    *shared.hits.llm_model.lock().unwrap() = Some(model);
    *shared.hits.llm_body.lock().unwrap() = Some(body);

    let (status, body) = shared.script.llm.clone();
    (status, Json(body)).into_response()
}

async fn text_to_speech(
    State(shared): State<Arc<Shared>>,
    Path(voice_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    shared.hits.tts.fetch_add(1, Ordering::SeqCst);
    *shared.hits.tts_key.lock().unwrap() = header(&headers, "xi-api-key");
    *shared.hits.tts_accept.lock().unwrap() = header(&headers, "accept");
    *shared.hits.tts_voice.lock().unwrap() = Some(voice_id);
    *shared.hits.tts_body.lock().unwrap() = Some(body);

    let (status, audio) = shared.script.tts.clone();
    if status.is_success() {
        (status, [("content-type", "audio/mpeg")], audio).into_response()
    } else {
        (status, Json(json!({ "detail": { "status": "quota_exceeded" } }))).into_response()
    }
}

/// Starts the stand-in providers on an ephemeral port.
pub async fn spawn_providers(script: Script) -> MockProviders {
    let hits = Arc::new(Hits::default());
    let shared = Arc::new(Shared {
        script,
        hits: hits.clone(),
    });

    let app = Router::new()
        .route("/v1/speech-to-text", post(speech_to_text))
        .route("/v1beta/models/{model}", post(generate_content))
        .route("/v1/text-to-speech/{voice_id}", post(text_to_speech))
        .with_state(shared);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockProviders { addr, hits }
}

/// Serves one text-to-speech request whose body breaks off: the response
/// declares `declared_len` bytes, sends `sent`, then closes the connection.
pub async fn spawn_truncated_tts(declared_len: usize, sent: &'static [u8]) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;

        let head = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: audio/mpeg\r\ncontent-length: {}\r\n\r\n",
            declared_len
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(sent).await.unwrap();
        socket.flush().await.unwrap();
        socket.shutdown().await.ok();
    });
    addr
}

/// Reads one HTTP/1.1 request (head plus `content-length` body).
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut expected = None;
    loop {
        if expected.is_none() {
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                expected = Some(end + 4 + body_len);
            }
        }
        if expected.is_some_and(|total| buf.len() >= total) {
            return;
        }
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Returns an address nothing is listening on.
pub async fn dead_address() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn orchestrator(config: ProviderConfig, output_dir: &std::path::Path) -> VoiceTurnOrchestrator {
    VoiceTurnOrchestrator::new(config, output_dir, "/audio").expect("orchestrator should build")
}

/// Lists generated files in `dir`, sorted.
pub fn list_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// True if `path` is `/audio/audio_<digits>[_<digits>].mp3`.
pub fn is_public_audio_path(path: &str) -> bool {
    path.strip_prefix("/audio/")
        .is_some_and(echoaid_voice::is_generated_audio_file)
}
