//! Audio upload endpoints.

use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::{debug, info};
use voice_recognition_service::{AudioInput, ConsultationOutcome, TranscriptionResult};

use crate::error::{ApiError, ApiResult};
use crate::server::ScribeServer;

const DEFAULT_LANGUAGE: &str = "English";
/// Assumed for audio parts sent without a Content-Type
const DEFAULT_AUDIO_MIME_TYPE: &str = "audio/wav";

struct AudioUpload {
    audio: AudioInput,
    language: String,
}

/// Read the `audio` file and optional `language` field of a multipart form
async fn read_upload(mut multipart: Multipart) -> ApiResult<AudioUpload> {
    let mut audio = None;
    let mut language = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("audio") => {
                let mime_type = field.content_type().unwrap_or(DEFAULT_AUDIO_MIME_TYPE).to_string();
                let bytes = field.bytes().await?;
                debug!(size = bytes.len(), mime_type = %mime_type, "Received audio field");
                audio = Some(AudioInput::new(bytes.to_vec(), mime_type));
            }
            Some("language") => {
                let value = field.text().await?;
                language = Some(value.trim().to_string()).filter(|l| !l.is_empty());
            }
            _ => {}
        }
    }

    let audio = audio.ok_or_else(|| ApiError::validation("No audio file provided"))?;
    Ok(AudioUpload {
        audio,
        language: language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
    })
}

/// Transcribe and diarize an uploaded recording
pub async fn transcribe(
    State(server): State<ScribeServer>,
    multipart: Multipart,
) -> ApiResult<Json<TranscriptionResult>> {
    let upload = read_upload(multipart).await?;
    info!(language = %upload.language, size = upload.audio.bytes.len(), "Transcription requested");

    let transcript = server.processor.transcribe(&upload.audio, &upload.language).await?;
    Ok(Json(transcript))
}

/// Transcript, SOAP note and insights for an uploaded recording
pub async fn process_consultation(
    State(server): State<ScribeServer>,
    multipart: Multipart,
) -> ApiResult<Json<ConsultationOutcome>> {
    let upload = read_upload(multipart).await?;
    info!(language = %upload.language, size = upload.audio.bytes.len(), "Consultation processing requested");

    let outcome = server.processor.process(&upload.audio, &upload.language).await?;
    Ok(Json(outcome))
}
