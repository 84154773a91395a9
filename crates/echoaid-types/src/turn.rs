//! Per-turn values.
//!
//! A turn is one trip through the pipeline: an `AudioClip` goes in, a
//! `TurnResult` comes out. Nothing here outlives the request that created it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Container type assumed when the browser does not declare one.
pub const DEFAULT_AUDIO_CONTENT_TYPE: &str = "audio/webm";

/// A recorded audio clip as uploaded by the client.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// Raw encoded audio.
    pub data: Vec<u8>,
    /// Declared MIME type of `data` (e.g. `audio/webm`).
    pub content_type: String,
}

impl AudioClip {
    pub fn new(data: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File name sent alongside the bytes in a multipart upload.
    ///
    /// Providers sniff the container from the extension, so it follows the
    /// declared content type rather than being fixed.
    pub fn upload_file_name(&self) -> String {
        format!("audio.{}", ext_from_content_type(&self.content_type))
    }
}

// The payload can be megabytes; keep it out of log lines.
impl fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioClip")
            .field("len", &self.data.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Determines file extension from an audio content type.
fn ext_from_content_type(ct: &str) -> &'static str {
    // Browsers append codec parameters, e.g. `audio/webm;codecs=opus`.
    let base = ct.split(';').next().unwrap_or("").trim();
    match base {
        "audio/webm" | "video/webm" => "webm",
        "audio/ogg" => "ogg",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/flac" => "flac",
        _ => "webm",
    }
}

/// The aggregated output of one successful pipeline run.
///
/// Serialized as the body of a successful `/process-audio` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    /// What the user said, as transcribed.
    #[serde(rename = "userText")]
    pub user_text: String,
    /// The assistant's reply text.
    #[serde(rename = "aiText")]
    pub ai_text: String,
    /// Root-relative path to the synthesized reply audio.
    #[serde(rename = "aiAudio")]
    pub ai_audio: String,
}

/// Where a turn is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    Idle,
    Transcribing,
    Generating,
    Synthesizing,
    Done,
    Failed,
}

impl TurnStage {
    /// The stage that follows a successful completion of `self`.
    ///
    /// Terminal stages return themselves.
    pub fn advance(self) -> Self {
        match self {
            Self::Idle => Self::Transcribing,
            Self::Transcribing => Self::Generating,
            Self::Generating => Self::Synthesizing,
            Self::Synthesizing => Self::Done,
            Self::Done => Self::Done,
            Self::Failed => Self::Failed,
        }
    }

    /// The stage reached when `self` fails.
    ///
    /// `Idle` and `Done` do not fail; they return themselves.
    pub fn fail(self) -> Self {
        match self {
            Self::Transcribing | Self::Generating | Self::Synthesizing => Self::Failed,
            other => other,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Transcribing => "transcribing",
            Self::Generating => "generating",
            Self::Synthesizing => "synthesizing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
