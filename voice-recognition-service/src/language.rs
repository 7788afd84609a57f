//! Per-language speech pipeline selection.
//!
//! The requested language arrives as free text from the UI ("Malayalam",
//! "ml-IN", "English"). It is resolved exactly once into a
//! [`ConsultationLanguage`]; everything downstream works with the enum.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Languages the consultation pipeline is configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationLanguage {
    English,
    Malayalam,
    Hindi,
    Arabic,
}

/// How speaker turns are recovered for a language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiarizationStrategy {
    /// Speaker tags reported by the speech backend
    Native,
    /// Text-generation model splits the transcript into turns
    Llm,
}

/// Everything the batch runner needs to know about a language
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguagePipelineConfig {
    pub language: ConsultationLanguage,
    pub language_code: String,
    pub recognizer_id: String,
    pub model_name: String,
    pub native_diarization_supported: bool,
    pub diarization_strategy: DiarizationStrategy,
}

impl ConsultationLanguage {
    /// Resolve a free-text language label.
    ///
    /// Matching is case-insensitive. Full language names match anywhere in
    /// the label; short codes (`ml`, `ar`, `hi`) only match as the primary
    /// subtag of a locale such as `hi-IN`. Anything unrecognised, including
    /// bare codes without a region, falls back to English.
    pub fn resolve(label: &str) -> Self {
        let lower = label.trim().to_lowercase();
        let (primary, region) = match lower.split_once(['-', '_']) {
            Some((primary, region)) => (primary, Some(region)),
            None => (lower.as_str(), None),
        };
        let has_region = region.is_some_and(|r| !r.is_empty());

        if lower.contains("malayalam") || lower == "ml-in" || (primary == "ml" && has_region) {
            ConsultationLanguage::Malayalam
        } else if lower.contains("arabic") || (primary == "ar" && has_region) {
            ConsultationLanguage::Arabic
        } else if lower.contains("hindi") || (primary == "hi" && has_region) {
            ConsultationLanguage::Hindi
        } else {
            ConsultationLanguage::English
        }
    }

    /// Human-readable name, used in model prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            ConsultationLanguage::English => "English",
            ConsultationLanguage::Malayalam => "Malayalam",
            ConsultationLanguage::Hindi => "Hindi",
            ConsultationLanguage::Arabic => "Arabic",
        }
    }

    pub fn language_code(&self) -> &'static str {
        match self {
            ConsultationLanguage::English => "en-US",
            ConsultationLanguage::Malayalam => "ml-IN",
            ConsultationLanguage::Hindi => "hi-IN",
            ConsultationLanguage::Arabic => "ar-BH",
        }
    }

    /// Recognizer resources are keyed per language so that one language's
    /// configuration is never reused for another language's batch job.
    pub fn recognizer_id(&self) -> &'static str {
        match self {
            ConsultationLanguage::English => "scribe-en-us",
            ConsultationLanguage::Malayalam => "scribe-ml-in",
            ConsultationLanguage::Hindi => "scribe-hi-in",
            ConsultationLanguage::Arabic => "scribe-ar-bh",
        }
    }

    pub fn diarization_strategy(&self) -> DiarizationStrategy {
        match self {
            ConsultationLanguage::English | ConsultationLanguage::Hindi => DiarizationStrategy::Native,
            ConsultationLanguage::Malayalam | ConsultationLanguage::Arabic => DiarizationStrategy::Llm,
        }
    }

    fn model_name(&self) -> &'static str {
        match self.diarization_strategy() {
            DiarizationStrategy::Native => "long",
            DiarizationStrategy::Llm => "chirp_2",
        }
    }

    pub fn pipeline(&self) -> LanguagePipelineConfig {
        let strategy = self.diarization_strategy();
        LanguagePipelineConfig {
            language: *self,
            language_code: self.language_code().to_string(),
            recognizer_id: self.recognizer_id().to_string(),
            model_name: self.model_name().to_string(),
            native_diarization_supported: strategy == DiarizationStrategy::Native,
            diarization_strategy: strategy,
        }
    }
}

impl fmt::Display for ConsultationLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Pick the speech pipeline for a requested language label. Pure; runs
/// before any network call.
pub fn select_pipeline(requested_language: &str) -> LanguagePipelineConfig {
    ConsultationLanguage::resolve(requested_language).pipeline()
}
