use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Stage of the consultation pipeline an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    AudioValidation,
    Upload,
    BucketProvisioning,
    RecognizerLookup,
    RecognizerCreation,
    BatchRecognition,
    Diarization,
    NoteGeneration,
    InsightGeneration,
    PrescriptionDrafting,
    Translation,
    QuestionAnswering,
    DocumentExtraction,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::AudioValidation => "audio_validation",
            PipelineStage::Upload => "upload",
            PipelineStage::BucketProvisioning => "bucket_provisioning",
            PipelineStage::RecognizerLookup => "recognizer_lookup",
            PipelineStage::RecognizerCreation => "recognizer_creation",
            PipelineStage::BatchRecognition => "batch_recognition",
            PipelineStage::Diarization => "diarization",
            PipelineStage::NoteGeneration => "note_generation",
            PipelineStage::InsightGeneration => "insight_generation",
            PipelineStage::PrescriptionDrafting => "prescription_drafting",
            PipelineStage::Translation => "translation",
            PipelineStage::QuestionAnswering => "question_answering",
            PipelineStage::DocumentExtraction => "document_extraction",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid audio input: {0}")]
    InvalidAudio(String),

    #[error("Unreadable document: {0}")]
    InvalidDocument(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("{operation} did not complete within {waited:?}")]
    Timeout { operation: String, waited: Duration },

    #[error("Text generation error: {0}")]
    Generation(String),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: Box<VoiceError>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type VoiceResult<T> = Result<T, VoiceError>;

impl VoiceError {
    /// Wrap this error with the pipeline stage that produced it.
    /// Already-tagged errors keep their innermost stage.
    pub fn at(self, stage: PipelineStage) -> Self {
        match self {
            VoiceError::Stage { .. } => self,
            other => VoiceError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage recorded on this error, if any
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            VoiceError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The error with any stage wrapper removed
    pub fn root(&self) -> &VoiceError {
        match self {
            VoiceError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), VoiceError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self.root(), VoiceError::AlreadyExists(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), VoiceError::Timeout { .. })
    }
}

/// Attach a pipeline stage to the error side of a result
pub trait StageContext<T> {
    fn stage(self, stage: PipelineStage) -> VoiceResult<T>;
}

impl<T> StageContext<T> for VoiceResult<T> {
    fn stage(self, stage: PipelineStage) -> VoiceResult<T> {
        self.map_err(|e| e.at(stage))
    }
}

/// Outcome of a best-effort stage that failed but still produced a usable value.
#[derive(Debug, Clone, PartialEq)]
pub struct Degraded<T> {
    pub fallback: T,
    pub reason: String,
}

impl<T> Degraded<T> {
    pub fn new(fallback: T, reason: impl Into<String>) -> Self {
        Self {
            fallback,
            reason: reason.into(),
        }
    }
}

/// Result of a stage that can never fail outright
pub type BestEffort<T> = Result<T, Degraded<T>>;

/// A stage that fell back, as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradedStage {
    pub stage: PipelineStage,
    pub reason: String,
}
