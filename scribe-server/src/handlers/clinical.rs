//! Text-generation endpoints over an existing transcript.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;
use voice_recognition_service::{PatientContext, Prescription, SoapNote, Utterance};

use super::ValidatedJson;
use crate::error::ApiResult;
use crate::server::ScribeServer;

#[derive(Debug, Deserialize, Validate)]
pub struct SoapRequest {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
    #[serde(default)]
    pub utterances: Vec<Utterance>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InsightsRequest {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
    #[serde(default, alias = "userData")]
    pub patient: Option<PatientContext>,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub insights: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PrescriptionRequest {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
    #[validate(length(min = 1, message = "targetLanguage must not be empty"))]
    pub target_language: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

/// SOAP note for a transcript. Generation failures still return a complete note.
pub async fn soap_note(
    State(server): State<ScribeServer>,
    ValidatedJson(request): ValidatedJson<SoapRequest>,
) -> Json<SoapNote> {
    let note = server
        .processor
        .soap_note(&request.text, &request.utterances)
        .await
        .unwrap_or_else(|degraded| {
            warn!(reason = %degraded.reason, "Serving placeholder SOAP note");
            degraded.fallback
        });
    Json(note)
}

pub async fn insights(
    State(server): State<ScribeServer>,
    ValidatedJson(request): ValidatedJson<InsightsRequest>,
) -> Json<InsightsResponse> {
    let insights = server
        .processor
        .insights(&request.text, request.patient.as_ref())
        .await
        .unwrap_or_else(|degraded| degraded.fallback);
    Json(InsightsResponse { insights })
}

pub async fn prescription(
    State(server): State<ScribeServer>,
    ValidatedJson(request): ValidatedJson<PrescriptionRequest>,
) -> ApiResult<Json<Prescription>> {
    Ok(Json(server.processor.draft_prescription(&request.text).await?))
}

pub async fn translate(
    State(server): State<ScribeServer>,
    ValidatedJson(request): ValidatedJson<TranslateRequest>,
) -> ApiResult<Json<TranslateResponse>> {
    let translated_text = server
        .processor
        .translate(&request.text, &request.target_language)
        .await?;
    Ok(Json(TranslateResponse { translated_text }))
}

pub async fn ask(
    State(server): State<ScribeServer>,
    ValidatedJson(request): ValidatedJson<AskRequest>,
) -> ApiResult<Json<AskResponse>> {
    let answer = server
        .processor
        .ask(&request.prompt, request.context.as_deref())
        .await?;
    Ok(Json(AskResponse { answer }))
}
