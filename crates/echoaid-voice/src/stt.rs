use crate::config::ProviderConfig;
use crate::error::{ProviderFailure, VoiceError};
use echoaid_types::AudioClip;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;

/// Maximum audio input size for STT (25 MiB). Matches the upload ceiling so an
/// oversized clip fails here rather than at the provider.
pub const MAX_STT_INPUT_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct SpeechToTextResponse {
    text: Option<String>,
}

/// Sends recorded audio to the speech-to-text provider.
#[derive(Debug, Clone)]
pub struct Transcriber {
    client: reqwest::Client,
    config: Arc<ProviderConfig>,
}

impl Transcriber {
    pub fn new(client: reqwest::Client, config: Arc<ProviderConfig>) -> Self {
        Self { client, config }
    }

    /// Transcribes `clip` and returns the recognised text.
    pub async fn transcribe(&self, clip: &AudioClip) -> Result<String, VoiceError> {
        self.request(clip).await.map_err(VoiceError::Transcription)
    }

    async fn request(&self, clip: &AudioClip) -> Result<String, ProviderFailure> {
        if clip.len() > MAX_STT_INPUT_BYTES {
            return Err(ProviderFailure::Shape(format!(
                "audio data exceeds maximum size: {} bytes (limit: {} bytes)",
                clip.len(),
                MAX_STT_INPUT_BYTES
            )));
        }

        let file = Part::bytes(clip.data.clone())
            .file_name(clip.upload_file_name())
            .mime_str(&clip.content_type)
            .or_else(|_| {
                Part::bytes(clip.data.clone())
                    .file_name(clip.upload_file_name())
                    .mime_str(echoaid_types::DEFAULT_AUDIO_CONTENT_TYPE)
            })?;

        let form = Form::new()
            .part("file", file)
            .text("model_id", self.config.stt_model.clone());

        let resp = self
            .client
            .post(self.config.speech_to_text_url())
            .header("xi-api-key", &self.config.elevenlabs_api_key)
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ProviderFailure::from_response(resp).await);
        }

        let bytes = resp.bytes().await?;
        let parsed: SpeechToTextResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ProviderFailure::Shape(format!("invalid transcription JSON: {}", e)))?;

        let text = parsed
            .text
            .map(|text| text.trim().to_string())
            .ok_or_else(|| {
                ProviderFailure::Shape("transcription response has no `text`".to_string())
            })?;

        // Silence or noise comes back as an empty string; there is nothing to reply to.
        if text.is_empty() {
            return Err(ProviderFailure::Shape("transcription is empty".to_string()));
        }

        Ok(text)
    }
}
