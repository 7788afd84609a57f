//! Seams to the remote services the pipeline coordinates.
//!
//! Each trait mirrors one external contract: object storage, batch speech
//! recognition, and text generation. Concrete clients are constructed once
//! at startup and injected; tests swap in fakes.

pub mod chat_completions;
pub mod gcs;
pub mod google_auth;
pub mod google_speech;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{VoiceError, VoiceResult};
use crate::timing::DurationLike;

/// Blob storage used to stage audio for batch recognition
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8], content_type: &str) -> VoiceResult<()>;

    async fn delete(&self, bucket: &str, key: &str) -> VoiceResult<()>;

    async fn create_bucket(&self, bucket: &str, region: &str) -> VoiceResult<()>;

    /// URI the speech backend uses to read an object
    fn object_uri(&self, bucket: &str, key: &str) -> String;
}

/// Recognition settings derived from a language pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerSpec {
    pub language_code: String,
    pub model: String,
    pub enable_diarization: bool,
}

/// A named, reusable recognizer configuration held by the speech backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerResource {
    pub name: String,
    pub model: Option<String>,
    pub language_codes: Vec<String>,
}

/// Reference to a long-running remote operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub name: String,
}

/// State of a long-running operation at one poll
#[derive(Debug, Clone, PartialEq)]
pub enum OperationPoll<T> {
    Pending,
    Done(T),
}

/// Word timing as reported by the backend, before normalization
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordInfo {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub start_offset: Option<DurationLike>,
    #[serde(default)]
    pub end_offset: Option<DurationLike>,
    #[serde(default)]
    pub speaker_label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionAlternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub words: Vec<WordInfo>,
}

/// One result segment; alternatives are ranked best first
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionSegment {
    #[serde(default)]
    pub alternatives: Vec<RecognitionAlternative>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileRecognitionResult {
    pub segments: Vec<RecognitionSegment>,
}

/// Completed batch job, keyed by the input file URI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchRecognizeOutput {
    pub results_by_uri: HashMap<String, FileRecognitionResult>,
}

/// Batch speech-to-text backend with server-side recognizer resources
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Fails with [`VoiceError::NotFound`] when the recognizer does not exist
    async fn get_recognizer(&self, name: &str) -> VoiceResult<RecognizerResource>;

    /// Fails with [`VoiceError::AlreadyExists`] when another caller won the race
    async fn create_recognizer(
        &self,
        parent: &str,
        recognizer_id: &str,
        spec: &RecognizerSpec,
    ) -> VoiceResult<OperationHandle>;

    async fn poll_recognizer_creation(
        &self,
        operation: &OperationHandle,
    ) -> VoiceResult<OperationPoll<RecognizerResource>>;

    async fn batch_recognize(
        &self,
        recognizer: &str,
        spec: &RecognizerSpec,
        file_uri: &str,
    ) -> VoiceResult<OperationHandle>;

    async fn poll_batch(
        &self,
        operation: &OperationHandle,
    ) -> VoiceResult<OperationPoll<BatchRecognizeOutput>>;
}

/// Options for one text-generation call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationOptions {
    pub json_mode: bool,
    pub temperature: Option<f32>,
}

impl GenerationOptions {
    pub fn json() -> Self {
        Self {
            json_mode: true,
            temperature: None,
        }
    }

    pub fn text() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Large-language-model completion capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: GenerationOptions,
    ) -> VoiceResult<String>;
}

/// Map a non-success HTTP response onto the error variants the pipeline
/// branches on.
pub(crate) async fn error_for_status(
    response: reqwest::Response,
    resource: &str,
) -> VoiceResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        401 | 403 => VoiceError::Authentication(format!("{}: {} {}", resource, status, body)),
        404 => VoiceError::NotFound(resource.to_string()),
        409 => VoiceError::AlreadyExists(resource.to_string()),
        _ => VoiceError::Provider(format!("{}: {} {}", resource, status, body)),
    })
}
