//! Voice pipeline for EchoAid.
//!
//! A turn takes a recorded clip through three hosted providers in order:
//! speech-to-text (ElevenLabs), reply generation (Gemini) and text-to-speech
//! (ElevenLabs). The synthesized reply is streamed to a file in the output
//! directory and referenced by a root-relative public path.
//!
//! Each stage maps its failures into its own [`VoiceError`] variant so the
//! caller can log full provider detail while exposing nothing of it.

pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod stt;
pub mod tts;

pub use config::{
    ProviderConfig, DEFAULT_ELEVENLABS_BASE_URL, DEFAULT_GEMINI_BASE_URL, DEFAULT_VOICE_ID,
};
pub use error::{ProviderFailure, VoiceError};
pub use llm::{compose_prompt, ResponseGenerator, PERSONA_PROMPT};
pub use pipeline::{build_http_client, VoiceTurnOrchestrator};
pub use stt::Transcriber;
pub use tts::{is_generated_audio_file, Synthesizer, DEFAULT_PUBLIC_PREFIX};
