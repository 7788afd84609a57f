use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use error_common::codes::{pipeline, system, upstream, validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::error;
use uuid::Uuid;
use voice_recognition_service::VoiceError;

/// Standard API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error type
    pub error_type: String,
    /// Stable error code; pipeline failures carry the code of the failed stage
    pub error_code: String,
    /// Human-readable error message
    pub message: String,
    /// Field-specific validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<HashMap<String, Vec<String>>>,
    /// Timestamp when error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Suggested actions for resolving the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Main API error enum
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field_errors: Option<HashMap<String, Vec<String>>>,
    },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    #[error(transparent)]
    Pipeline(#[from] VoiceError),

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ApiError {
    /// Create a simple validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Pipeline(err) => match err.root() {
                VoiceError::InvalidAudio(_) => StatusCode::BAD_REQUEST,
                VoiceError::InvalidDocument(_) => StatusCode::UNPROCESSABLE_ENTITY,
                VoiceError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                VoiceError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::PayloadTooLarge { .. } => "payload_too_large",
            ApiError::Pipeline(err) => match err.root() {
                VoiceError::InvalidAudio(_) => "invalid_audio",
                VoiceError::InvalidDocument(_) => "invalid_document",
                VoiceError::Timeout { .. } => "upstream_timeout",
                VoiceError::Config(_) => "configuration_error",
                _ => "upstream_error",
            },
            ApiError::Internal { .. } => "internal_error",
        }
    }

    /// Stable error code for clients
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest { .. } => validation::INVALID_INPUT,
            ApiError::PayloadTooLarge { .. } => validation::PAYLOAD_TOO_LARGE,
            ApiError::Internal { .. } => system::INTERNAL,
            ApiError::Pipeline(err) => err
                .stage()
                .and_then(|stage| pipeline::for_stage(stage.as_str()))
                .unwrap_or(match err.root() {
                    VoiceError::InvalidAudio(_) => validation::INVALID_AUDIO,
                    VoiceError::InvalidDocument(_) => validation::INVALID_DOCUMENT,
                    VoiceError::Timeout { .. } => upstream::TIMEOUT,
                    VoiceError::Config(_) => system::CONFIGURATION,
                    VoiceError::Authentication(_) => upstream::AUTHENTICATION_FAILED,
                    VoiceError::Network(_) => upstream::NETWORK,
                    _ => upstream::PROVIDER_ERROR,
                }),
        }
    }

    /// Get suggested actions for resolving the error
    pub fn suggestions(&self) -> Option<Vec<String>> {
        match self {
            ApiError::Validation { .. } => Some(vec![
                "Check the request payload for empty or invalid fields".to_string(),
                "Ensure all required fields are provided".to_string(),
            ]),
            ApiError::PayloadTooLarge { .. } => Some(vec![
                "Split long consultations into shorter recordings".to_string(),
            ]),
            ApiError::Pipeline(err) => match err.root() {
                VoiceError::InvalidAudio(_) => Some(vec![
                    "Upload a non-empty audio file (webm, wav, mp3)".to_string(),
                ]),
                VoiceError::InvalidDocument(_) => Some(vec![
                    "Check that the file opens locally and is not password protected".to_string(),
                    "Supported documents are PDF, DOCX and plain text".to_string(),
                ]),
                VoiceError::Timeout { .. } => Some(vec![
                    "Try again in a few moments".to_string(),
                    "Shorter recordings finish faster".to_string(),
                ]),
                VoiceError::Config(_) => None,
                _ => Some(vec!["Try again in a few moments".to_string()]),
            },
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        // Log the error with correlation ID
        error!(
            error_id = %error_id,
            error_type = %self.error_type(),
            error_code = %self.error_code(),
            status_code = %status_code.as_u16(),
            error = %self,
            "API error occurred"
        );

        let field_errors = match &self {
            ApiError::Validation { field_errors, .. } => field_errors.clone(),
            _ => None,
        };

        let error_response = ApiErrorResponse {
            error_id,
            error_type: self.error_type().to_string(),
            error_code: self.error_code().to_string(),
            message: self.to_string(),
            field_errors,
            timestamp: chrono::Utc::now(),
            suggestions: self.suggestions(),
        };

        (status_code, Json(error_response)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors: HashMap<String, Vec<String>> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        ApiError::Validation {
            message: "Request validation failed".to_string(),
            field_errors: Some(field_errors),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge {
                message: error.body_text(),
            }
        } else {
            ApiError::bad_request(format!("Invalid multipart body: {}", error.body_text()))
        }
    }
}

impl From<JoinError> for ApiError {
    fn from(error: JoinError) -> Self {
        let cause = if error.is_panic() { "panicked" } else { "was cancelled" };
        ApiError::internal(format!("Background task {}", cause))
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use voice_recognition_service::PipelineStage;

    #[test]
    fn pipeline_errors_map_to_gateway_statuses() {
        let timeout = ApiError::from(
            VoiceError::Timeout {
                operation: "batch recognition".into(),
                waited: Duration::from_secs(600),
            }
            .at(PipelineStage::BatchRecognition),
        );
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(timeout.error_code(), pipeline::BATCH_RECOGNITION);

        let provider = ApiError::from(VoiceError::Provider("500".into()));
        assert_eq!(provider.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(provider.error_code(), upstream::PROVIDER_ERROR);

        let config = ApiError::from(VoiceError::Config("missing".into()));
        assert_eq!(config.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unreadable_document_is_unprocessable() {
        let err = ApiError::from(VoiceError::InvalidDocument("bad xref".into()).at(PipelineStage::DocumentExtraction));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_type(), "invalid_document");
        assert_eq!(err.error_code(), pipeline::DOCUMENT_EXTRACTION);

        let untagged = ApiError::from(VoiceError::InvalidDocument("bad xref".into()));
        assert_eq!(untagged.error_code(), validation::INVALID_DOCUMENT);
    }

    #[tokio::test]
    async fn panicked_task_is_an_internal_error() {
        let join_error = tokio::task::spawn_blocking(|| panic!("parser blew up")).await.unwrap_err();

        let err = ApiError::from(join_error);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), system::INTERNAL);
        assert_eq!(err.to_string(), "Internal server error: Background task panicked");
    }

    #[test]
    fn invalid_audio_is_a_client_error() {
        let err = ApiError::from(VoiceError::InvalidAudio("empty".into()).at(PipelineStage::AudioValidation));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_type(), "invalid_audio");
        assert_eq!(err.error_code(), pipeline::AUDIO_VALIDATION);
    }
}
