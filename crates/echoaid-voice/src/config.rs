use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default ElevenLabs API origin (speech-to-text and text-to-speech).
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

/// Default Gemini API origin.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Voice used for every synthesized reply unless overridden.
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

fn default_elevenlabs_base_url() -> String {
    DEFAULT_ELEVENLABS_BASE_URL.to_string()
}

fn default_gemini_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

fn default_stt_model() -> String {
    "scribe_v1".to_string()
}

fn default_tts_model() -> String {
    "eleven_monolingual_v1".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_voice_id() -> String {
    DEFAULT_VOICE_ID.to_string()
}

fn default_voice_setting() -> f32 {
    0.5
}

fn default_connect_timeout_seconds() -> u64 {
    10
}

fn default_request_timeout_seconds() -> u64 {
    120
}

/// Credentials, endpoints and model choices for the three upstream providers.
///
/// Loaded once at startup and shared read-only by every turn.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Key sent as `xi-api-key` to the speech-to-text and text-to-speech APIs.
    #[serde(default, skip_serializing)]
    pub elevenlabs_api_key: String,
    /// Key sent as the `key` query parameter to the generation API.
    #[serde(default, skip_serializing)]
    pub gemini_api_key: String,
    #[serde(default = "default_elevenlabs_base_url")]
    pub elevenlabs_base_url: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    /// Speech-to-text model identifier.
    #[serde(default = "default_stt_model")]
    pub stt_model: String,
    /// Text-to-speech model identifier.
    #[serde(default = "default_tts_model")]
    pub tts_model: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_voice_setting")]
    pub stability: f32,
    #[serde(default = "default_voice_setting")]
    pub similarity_boost: f32,
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
    /// Whole-request timeout, including streaming the synthesized audio.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            elevenlabs_api_key: String::new(),
            gemini_api_key: String::new(),
            elevenlabs_base_url: default_elevenlabs_base_url(),
            gemini_base_url: default_gemini_base_url(),
            stt_model: default_stt_model(),
            tts_model: default_tts_model(),
            gemini_model: default_gemini_model(),
            voice_id: default_voice_id(),
            stability: default_voice_setting(),
            similarity_boost: default_voice_setting(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("elevenlabs_api_key", &redact(&self.elevenlabs_api_key))
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("elevenlabs_base_url", &self.elevenlabs_base_url)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("stt_model", &self.stt_model)
            .field("tts_model", &self.tts_model)
            .field("gemini_model", &self.gemini_model)
            .field("voice_id", &self.voice_id)
            .field("stability", &self.stability)
            .field("similarity_boost", &self.similarity_boost)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "[UNSET]"
    } else {
        "[REDACTED]"
    }
}

impl ProviderConfig {
    pub fn new(elevenlabs_api_key: impl Into<String>, gemini_api_key: impl Into<String>) -> Self {
        Self {
            elevenlabs_api_key: elevenlabs_api_key.into(),
            gemini_api_key: gemini_api_key.into(),
            ..Self::default()
        }
    }

    /// Points both providers at the given origins. Used to route traffic
    /// through a proxy or a local stand-in.
    pub fn with_base_urls(
        mut self,
        elevenlabs_base_url: impl Into<String>,
        gemini_base_url: impl Into<String>,
    ) -> Self {
        self.elevenlabs_base_url = elevenlabs_base_url.into();
        self.gemini_base_url = gemini_base_url.into();
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub(crate) fn speech_to_text_url(&self) -> String {
        format!(
            "{}/v1/speech-to-text",
            self.elevenlabs_base_url.trim_end_matches('/')
        )
    }

    pub(crate) fn text_to_speech_url(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.elevenlabs_base_url.trim_end_matches('/'),
            self.voice_id
        )
    }

    pub(crate) fn generate_content_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.gemini_base_url.trim_end_matches('/'),
            self.gemini_model
        )
    }
}
