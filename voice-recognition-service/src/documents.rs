//! Plain-text extraction from uploaded patient documents.
//!
//! Lab reports and referral letters arrive as PDF, DOCX or plain text; their
//! text is handed to the insight and question-answering prompts as context.
//! Files without a recognised text layer yield an empty string.

use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use crate::batch::essence;
use crate::error::{PipelineStage, StageContext, VoiceError, VoiceResult};

const PDF: &str = "application/pdf";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const GENERIC_BINARY: &str = "application/octet-stream";

lazy_static! {
    static ref BLANK_LINES: Option<Regex> = Regex::new(r"\n\s*\n").ok();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
    Unsupported,
}

impl DocumentKind {
    /// Kind from the declared content type. The file extension is only
    /// consulted when the type is absent or generic.
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Self {
        let mime = content_type.map(essence).unwrap_or_default();
        match mime.as_str() {
            PDF => return DocumentKind::Pdf,
            DOCX => return DocumentKind::Docx,
            m if m.starts_with("text/") => return DocumentKind::PlainText,
            "" | GENERIC_BINARY => {}
            _ => return DocumentKind::Unsupported,
        }

        let extension = file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("pdf") => DocumentKind::Pdf,
            Some("docx") => DocumentKind::Docx,
            Some("txt" | "md" | "csv") => DocumentKind::PlainText,
            _ => DocumentKind::Unsupported,
        }
    }
}

/// An uploaded document
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

impl DocumentInput {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: None,
            file_name: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn kind(&self) -> DocumentKind {
        DocumentKind::detect(self.content_type.as_deref(), self.file_name.as_deref())
    }
}

/// Extract trimmed plain text from a document.
///
/// Parsing is CPU bound and synchronous; async callers should run it on a
/// blocking thread.
pub fn extract_text(document: &DocumentInput) -> VoiceResult<String> {
    let kind = document.kind();
    let text = match kind {
        DocumentKind::Pdf => pdf_text(&document.bytes),
        DocumentKind::Docx => docx_text(&document.bytes),
        DocumentKind::PlainText => Ok(String::from_utf8_lossy(&document.bytes).into_owned()),
        DocumentKind::Unsupported => {
            info!(
                content_type = ?document.content_type,
                file_name = ?document.file_name,
                "Skipping text extraction for unsupported document type"
            );
            return Ok(String::new());
        }
    }
    .stage(PipelineStage::DocumentExtraction)?;

    let text = text.trim().to_string();
    debug!(kind = ?kind, chars = text.chars().count(), "Document text extracted");
    Ok(text)
}

fn pdf_text(bytes: &[u8]) -> VoiceResult<String> {
    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| VoiceError::InvalidDocument(format!("failed to parse PDF: {}", e)))?;

    // PDF layout leaves runs of blank lines between blocks
    Ok(match BLANK_LINES.as_ref() {
        Some(blank_lines) => blank_lines.replace_all(&raw, "\n\n").into_owned(),
        None => raw,
    })
}

fn docx_text(bytes: &[u8]) -> VoiceResult<String> {
    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| VoiceError::InvalidDocument(format!("failed to parse DOCX: {}", e)))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(paragraph) => Some(paragraph_text(paragraph)),
            _ => None,
        })
        .collect();
    Ok(paragraphs.join("\n"))
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    paragraph
        .children
        .iter()
        .filter_map(|child| match child {
            ParagraphChild::Run(run) => Some(run),
            _ => None,
        })
        .flat_map(|run| run.children.iter())
        .filter_map(|child| match child {
            RunChild::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect()
}
