//! Patient document upload endpoint.

use axum::{extract::Multipart, Json};
use serde::Serialize;
use tracing::info;
use voice_recognition_service::{documents, DocumentInput};

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct ExtractTextResponse {
    pub text: String,
}

/// Plain text of an uploaded PDF, DOCX or text file (multipart field `file`).
/// Other file types produce empty text.
pub async fn extract_text(mut multipart: Multipart) -> ApiResult<Json<ExtractTextResponse>> {
    let mut document = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;

        let mut input = DocumentInput::new(bytes.to_vec());
        input.content_type = content_type;
        input.file_name = file_name;
        document = Some(input);
    }

    let document = document.ok_or_else(|| ApiError::validation("No file provided"))?;
    info!(
        file_name = ?document.file_name,
        kind = ?document.kind(),
        size = document.bytes.len(),
        "Document text extraction requested"
    );

    let text = tokio::task::spawn_blocking(move || documents::extract_text(&document)).await??;
    Ok(Json(ExtractTextResponse { text }))
}
