//! Handler for a single voice turn.
//!
//! The browser posts one recorded clip as multipart field `audio`; the reply
//! is the transcript pair and a path to the synthesized answer.

use crate::{api::ApiError, AppState};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Extension, Multipart,
    },
    http::StatusCode,
    Json,
};
use echoaid_types::{AudioClip, TurnResult, DEFAULT_AUDIO_CONTENT_TYPE};
use std::sync::Arc;

/// Multipart field carrying the recorded clip.
pub const AUDIO_FIELD: &str = "audio";

/// Body of the 400 returned when no clip is present.
pub const NO_AUDIO_MESSAGE: &str = "No audio file uploaded.";

/// Body of the 500 returned for any pipeline failure.
pub const PROCESSING_FAILED_MESSAGE: &str = "Failed to process audio.";

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("audio upload exceeds the size limit".to_string())
    } else {
        ApiError::BadRequest(format!("multipart error: {}", e.body_text()))
    }
}

/// Reads the first non-empty `audio` field, skipping any other fields.
async fn read_audio_field(multipart: &mut Multipart) -> Result<Option<AudioClip>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
            .unwrap_or(DEFAULT_AUDIO_CONTENT_TYPE)
            .to_string();

        let data = field.bytes().await.map_err(multipart_error)?;
        if data.is_empty() {
            continue;
        }

        return Ok(Some(AudioClip::new(data.to_vec(), content_type)));
    }

    Ok(None)
}

/// Handler for `POST /process-audio`.
///
/// Responds `400` without contacting any provider when the form has no clip,
/// and `500` with a fixed message when any pipeline stage fails. Stage
/// errors are logged by the orchestrator and never returned to the client.
pub async fn process_audio_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TurnResult>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e, "rejected non-multipart audio upload");
        ApiError::BadRequest(NO_AUDIO_MESSAGE.to_string())
    })?;

    let clip = read_audio_field(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::BadRequest(NO_AUDIO_MESSAGE.to_string()))?;

    match state.orchestrator.run(clip).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            tracing::warn!(
                stage = e.stage().map(|s| s.as_str()).unwrap_or("none"),
                "voice turn failed, returning generic error"
            );
            Err(ApiError::InternalServerError(
                PROCESSING_FAILED_MESSAGE.to_string(),
            ))
        }
    }
}
