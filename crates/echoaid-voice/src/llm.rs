//! Reply generation against the Gemini `generateContent` API.
//!
//! Every request is single-turn: the persona prompt and the user's
//! transcript are folded into one text part. No history is kept.

use crate::config::ProviderConfig;
use crate::error::{ProviderFailure, VoiceError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Instruction text prepended to every generation request.
pub const PERSONA_PROMPT: &str = "You are EchoAid, a compassionate and empathetic mental health \
companion. Your purpose is to listen to users, understand their emotional state, and provide \
supportive and grounding responses. You are not a therapist, so do not offer medical advice. \
Instead, focus on active listening, validating their feelings, and offering gentle encouragement \
or simple grounding exercises. Keep your responses concise and use a warm, human-like tone. When \
appropriate, you can ask open-ended questions to encourage the user to share more.";

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Builds the single text block sent to the model.
pub fn compose_prompt(transcript: &str) -> String {
    format!("{}\n\nUser: {}", PERSONA_PROMPT, transcript)
}

/// Pulls `candidates[0].content.parts[0].text` out of a response, turning
/// every missing link into a `Shape` failure.
fn extract_reply(resp: GenerateContentResponse) -> Result<String, ProviderFailure> {
    let Some(candidate) = resp.candidates.into_iter().next() else {
        let reason = resp
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!(" (prompt blocked: {})", r))
            .unwrap_or_default();
        return Err(ProviderFailure::Shape(format!(
            "response has no candidates{}",
            reason
        )));
    };

    let finish = candidate
        .finish_reason
        .as_deref()
        .map(|r| format!(" (finish reason: {})", r))
        .unwrap_or_default();

    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| {
            ProviderFailure::Shape(format!("first candidate has no text part{}", finish))
        })?;

    if text.trim().is_empty() {
        return Err(ProviderFailure::Shape(format!(
            "first candidate text is empty{}",
            finish
        )));
    }

    Ok(text)
}

/// Sends transcripts to the language model and returns its reply.
#[derive(Debug, Clone)]
pub struct ResponseGenerator {
    client: reqwest::Client,
    config: Arc<ProviderConfig>,
}

impl ResponseGenerator {
    pub fn new(client: reqwest::Client, config: Arc<ProviderConfig>) -> Self {
        Self { client, config }
    }

    pub async fn generate(&self, transcript: &str) -> Result<String, VoiceError> {
        self.request(transcript).await.map_err(VoiceError::Generation)
    }

    async fn request(&self, transcript: &str) -> Result<String, ProviderFailure> {
        let prompt = compose_prompt(transcript);
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [TextPart { text: &prompt }],
            }],
        };

        let resp = self
            .client
            .post(self.config.generate_content_url())
            .query(&[("key", self.config.gemini_api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ProviderFailure::from_response(resp).await);
        }

        let bytes = resp.bytes().await?;
        let parsed: GenerateContentResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ProviderFailure::Shape(format!("invalid generation JSON: {}", e)))?;

        extract_reply(parsed)
    }
}
