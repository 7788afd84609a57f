//! Decoding of JSON produced by text-generation models.

use serde::de::DeserializeOwned;

use crate::error::{VoiceError, VoiceResult};

/// Remove a surrounding Markdown code fence (```` ```json ... ``` ````)
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse model output as JSON, tolerating code fences and leading or
/// trailing prose around a single JSON value.
pub fn parse_model_json<T: DeserializeOwned>(raw: &str) -> VoiceResult<T> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(VoiceError::Generation("model returned an empty response".to_string()));
    }

    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(first_error) => match embedded_json(body) {
            Some(inner) => serde_json::from_str(inner).map_err(VoiceError::from),
            None => Err(VoiceError::from(first_error)),
        },
    }
}

fn embedded_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let end = text.rfind(['}', ']'])?;
    (end > start).then(|| text.get(start..=end)).flatten()
}
