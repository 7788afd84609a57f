//! Clinical documents generated from a consultation transcript.
//!
//! Model output is read leniently: fields may be missing, null, numbers or
//! arrays where a string was asked for. Each document type decides which of
//! its fields get defaults.

pub mod assistant;
pub mod insights;
pub mod prescription;
pub mod soap;

pub use assistant::{ask, translate};
pub use insights::{generate_insights, PatientContext};
pub use prescription::{draft_prescription, Medication, Prescription};
pub use soap::{generate_soap_note, SoapNote};

use serde_json::Value;

/// Non-empty text for a JSON value, if it has any
pub(crate) fn text_of(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| text_of(Some(item)))
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(_) | Value::Null => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Non-empty strings from a JSON array or a single string
pub(crate) fn list_of(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(|item| text_of(Some(item))).collect(),
        other => text_of(other).into_iter().collect(),
    }
}
