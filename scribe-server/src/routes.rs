use axum::{routing::get, routing::post, Router};

use crate::{
    handlers::{clinical, consultation, documents, health},
    server::ScribeServer,
};

/// Create health check routes
pub fn health_routes() -> Router<ScribeServer> {
    Router::new().route("/health", get(health::health_check))
}

/// Audio upload routes
pub fn consultation_routes() -> Router<ScribeServer> {
    Router::new()
        .route("/transcribe", post(consultation::transcribe))
        .route("/consultations/process", post(consultation::process_consultation))
}

/// Text-generation routes over existing transcripts
pub fn clinical_routes() -> Router<ScribeServer> {
    Router::new()
        .route("/soap", post(clinical::soap_note))
        .route("/insights", post(clinical::insights))
        .route("/prescription", post(clinical::prescription))
        .route("/translate", post(clinical::translate))
        .route("/ask", post(clinical::ask))
}

/// Patient document routes
pub fn document_routes() -> Router<ScribeServer> {
    Router::new().route("/extract-text", post(documents::extract_text))
}

/// Create all routes, API routes nested under `/api/v1`
pub fn create_routes() -> Router<ScribeServer> {
    Router::new().merge(health_routes()).nest(
        "/api/v1",
        Router::new()
            .merge(consultation_routes())
            .merge(clinical_routes())
            .merge(document_routes()),
    )
}
