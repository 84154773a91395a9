use crate::config::ProviderConfig;
use crate::error::VoiceError;
use crate::llm::ResponseGenerator;
use crate::stt::Transcriber;
use crate::tts::Synthesizer;
use echoaid_types::{AudioClip, TurnResult, TurnStage};
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Builds the HTTP client shared by all three stages.
pub fn build_http_client(config: &ProviderConfig) -> Result<reqwest::Client, VoiceError> {
    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout())
        .timeout(config.request_timeout())
        .user_agent(concat!("EchoAid/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {}", e)))
}

/// Runs one voice turn: transcribe, generate a reply, synthesize it.
///
/// Stages run strictly in order and a failed stage stops the turn. The
/// orchestrator holds no per-turn state, so one instance serves every
/// request concurrently.
#[derive(Debug, Clone)]
pub struct VoiceTurnOrchestrator {
    transcriber: Transcriber,
    generator: ResponseGenerator,
    synthesizer: Synthesizer,
}

impl VoiceTurnOrchestrator {
    /// Wires the three stages to the providers in `config`, writing
    /// synthesized replies to `output_dir` (served under `public_prefix`).
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::Config` if either provider key is missing or the
    /// HTTP client cannot be built.
    pub fn new(
        config: ProviderConfig,
        output_dir: impl AsRef<Path>,
        public_prefix: impl Into<String>,
    ) -> Result<Self, VoiceError> {
        if config.elevenlabs_api_key.trim().is_empty() {
            return Err(VoiceError::Config(
                "ElevenLabs API key is not configured".to_string(),
            ));
        }
        if config.gemini_api_key.trim().is_empty() {
            return Err(VoiceError::Config(
                "Gemini API key is not configured".to_string(),
            ));
        }

        let client = build_http_client(&config)?;
        let config = Arc::new(config);

        Ok(Self::from_parts(
            Transcriber::new(client.clone(), config.clone()),
            ResponseGenerator::new(client.clone(), config.clone()),
            Synthesizer::new(client, config, output_dir, public_prefix),
        ))
    }

    pub fn from_parts(
        transcriber: Transcriber,
        generator: ResponseGenerator,
        synthesizer: Synthesizer,
    ) -> Self {
        Self {
            transcriber,
            generator,
            synthesizer,
        }
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    /// Runs a full turn for `clip`.
    ///
    /// On failure the stage error is logged with full provider detail and
    /// returned unchanged; callers decide what to expose.
    pub async fn run(&self, clip: AudioClip) -> Result<TurnResult, VoiceError> {
        let turn_id = Uuid::new_v4();
        let span = tracing::info_span!("turn", %turn_id);
        self.run_stages(&clip).instrument(span).await
    }

    async fn run_stages(&self, clip: &AudioClip) -> Result<TurnResult, VoiceError> {
        tracing::info!(
            bytes = clip.len(),
            content_type = %clip.content_type,
            "voice turn started"
        );

        let mut stage = enter(TurnStage::Idle);
        let user_text = self
            .transcriber
            .transcribe(clip)
            .await
            .map_err(|e| abort(stage, e))?;

        stage = enter(stage);
        let ai_text = self
            .generator
            .generate(&user_text)
            .await
            .map_err(|e| abort(stage, e))?;

        stage = enter(stage);
        let ai_audio = self
            .synthesizer
            .synthesize(&ai_text)
            .await
            .map_err(|e| abort(stage, e))?;

        enter(stage);
        tracing::info!(
            user_chars = user_text.chars().count(),
            ai_chars = ai_text.chars().count(),
            audio = %ai_audio,
            "voice turn completed"
        );

        Ok(TurnResult {
            user_text,
            ai_text,
            ai_audio,
        })
    }
}

fn enter(from: TurnStage) -> TurnStage {
    let to = from.advance();
    tracing::debug!(from = %from, to = %to, "turn stage transition");
    to
}

fn abort(stage: TurnStage, err: VoiceError) -> VoiceError {
    tracing::error!(
        stage = %stage,
        to = %stage.fail(),
        error = %err,
        "voice turn failed"
    );
    err
}
