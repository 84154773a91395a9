use crate::config::ProviderConfig;
use crate::error::{ProviderFailure, VoiceError};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion from
/// oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Prefix shared by every generated reply file.
pub const AUDIO_FILE_PREFIX: &str = "audio_";

/// Extension of generated reply files (`audio/mpeg`).
pub const AUDIO_FILE_EXTENSION: &str = "mp3";

/// Public path prefix under which the output directory is served.
pub const DEFAULT_PUBLIC_PREFIX: &str = "/audio";

/// How many suffixed names are tried when several turns finish in the same
/// millisecond.
const MAX_NAME_ATTEMPTS: u32 = 64;

#[derive(Debug, Serialize)]
struct TextToSpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

/// Builds the file name for a reply generated at `millis`.
///
/// `attempt` 0 gives the bare timestamp name; later attempts append a suffix.
pub fn audio_file_name(millis: i64, attempt: u32) -> String {
    if attempt == 0 {
        format!("{}{}.{}", AUDIO_FILE_PREFIX, millis, AUDIO_FILE_EXTENSION)
    } else {
        format!(
            "{}{}_{}.{}",
            AUDIO_FILE_PREFIX, millis, attempt, AUDIO_FILE_EXTENSION
        )
    }
}

/// Returns true if `name` looks like a file written by [`Synthesizer`].
pub fn is_generated_audio_file(name: &str) -> bool {
    let Some(stem) = name
        .strip_prefix(AUDIO_FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(AUDIO_FILE_EXTENSION))
        .and_then(|rest| rest.strip_suffix('.'))
    else {
        return false;
    };

    let mut pieces = stem.splitn(2, '_');
    let millis_ok = pieces
        .next()
        .is_some_and(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    let suffix_ok = pieces
        .next()
        .map_or(true, |p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    millis_ok && suffix_ok
}

/// Opens a fresh output file with exclusive create.
///
/// The timestamp alone does not guarantee uniqueness, so a name that already
/// exists moves on to the next suffix instead of truncating someone else's
/// file.
async fn create_output_file(dir: &Path, millis: i64) -> Result<(File, String), ProviderFailure> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = audio_file_name(millis, attempt);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(&name))
            .await
        {
            Ok(file) => return Ok((file, name)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(ProviderFailure::Io(e)),
        }
    }

    Err(ProviderFailure::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!(
            "no free output name for timestamp {} after {} attempts",
            millis, MAX_NAME_ATTEMPTS
        ),
    )))
}

/// Pipes `stream` into `file`, then flushes and syncs it.
///
/// The file handle is dropped (closed) on every return path.
async fn write_stream<S, B>(mut file: File, mut stream: S) -> Result<u64, ProviderFailure>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(chunk.as_ref()).await?;
        written += chunk.as_ref().len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

/// Turns reply text into speech and stores it in the output directory.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    client: reqwest::Client,
    config: Arc<ProviderConfig>,
    output_dir: PathBuf,
    public_prefix: String,
}

impl Synthesizer {
    /// Creates a `Synthesizer` writing into `output_dir`, whose contents are
    /// served under `public_prefix` (e.g. `/audio`).
    pub fn new(
        client: reqwest::Client,
        config: Arc<ProviderConfig>,
        output_dir: impl AsRef<Path>,
        public_prefix: impl Into<String>,
    ) -> Self {
        Self {
            client,
            config,
            output_dir: output_dir.as_ref().to_path_buf(),
            public_prefix: public_prefix.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Synthesizes `text` and returns the root-relative public path of the
    /// written file.
    ///
    /// The file is never removed by this call once written; cleanup belongs to
    /// the retention sweep.
    pub async fn synthesize(&self, text: &str) -> Result<String, VoiceError> {
        self.request(text).await.map_err(VoiceError::Synthesis)
    }

    fn public_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_prefix.trim_end_matches('/'), file_name)
    }

    async fn request(&self, text: &str) -> Result<String, ProviderFailure> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(ProviderFailure::Shape(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }

        let body = TextToSpeechRequest {
            text,
            model_id: &self.config.tts_model,
            voice_settings: VoiceSettings {
                stability: self.config.stability,
                similarity_boost: self.config.similarity_boost,
            },
        };

        let resp = self
            .client
            .post(self.config.text_to_speech_url())
            .header("xi-api-key", &self.config.elevenlabs_api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ProviderFailure::from_response(resp).await);
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let millis = chrono::Utc::now().timestamp_millis();
        let (file, file_name) = create_output_file(&self.output_dir, millis).await?;
        let file_path = self.output_dir.join(&file_name);

        match write_stream(file, resp.bytes_stream()).await {
            Ok(bytes) => {
                tracing::debug!(file = %file_name, bytes, "wrote synthesized audio");
                Ok(self.public_path(&file_name))
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&file_path).await {
                    tracing::warn!(
                        path = %file_path.display(),
                        error = %remove_err,
                        "failed to remove partial audio file"
                    );
                }
                Err(e)
            }
        }
    }
}
