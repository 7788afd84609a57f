use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{PipelineStage, StageContext, VoiceResult};
use crate::generation::parse_model_json;
use crate::notes::text_of;
use crate::providers::{GenerationOptions, TextGenerator};

const SYSTEM_PROMPT: &str = r#"You are an expert medical practitioner drafting a prescription from a consultation transcript.
1. Extract every medication that was explicitly prescribed or mentioned.
2. If a condition is described but no drug is named, suggest standard first-line treatment.

Respond with a JSON object of this shape:
{
  "medications": [
    { "name": "", "dosage": "", "frequency": "", "duration": "", "instructions": "" }
  ],
  "notes": ""
}
"notes" must be a single string with the diagnosis or advice. Use "" for unknown fields, never null."#;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: String,
}

impl Medication {
    fn from_value(value: &Value) -> Option<Self> {
        let field = |key: &str| text_of(value.get(key)).unwrap_or_default();
        let medication = Medication {
            name: field("name"),
            dosage: field("dosage"),
            frequency: field("frequency"),
            duration: field("duration"),
            instructions: field("instructions"),
        };
        (!medication.name.is_empty()).then_some(medication)
    }
}

/// Draft prescription for the clinician to review
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub medications: Vec<Medication>,
    pub notes: String,
}

impl Prescription {
    pub fn from_value(raw: &Value) -> Self {
        let medications = raw
            .get("medications")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Medication::from_value).collect())
            .unwrap_or_default();

        let notes = match raw.get("notes") {
            Some(Value::Object(map)) => map
                .values()
                .filter_map(|v| text_of(Some(v)))
                .collect::<Vec<_>>()
                .join("; "),
            other => text_of(other).unwrap_or_default(),
        };

        Prescription { medications, notes }
    }
}

/// Draft a prescription from a transcript. Errors propagate to the caller.
pub async fn draft_prescription(generator: &dyn TextGenerator, transcript: &str) -> VoiceResult<Prescription> {
    let raw = generator
        .generate(SYSTEM_PROMPT, &format!("Transcript:\n{}", transcript), GenerationOptions::json())
        .await
        .stage(PipelineStage::PrescriptionDrafting)?;

    let value: Value = parse_model_json(&raw).stage(PipelineStage::PrescriptionDrafting)?;
    let prescription = Prescription::from_value(&value);

    info!(medications = prescription.medications.len(), "✅ Prescription drafted");
    Ok(prescription)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VoiceError;
    use crate::providers::MockTextGenerator;
    use serde_json::json;

    #[test]
    fn tolerates_nulls_numbers_and_structured_notes() {
        let prescription = Prescription::from_value(&json!({
            "medications": [
                { "name": "Paracetamol", "dosage": 500, "frequency": "TID", "duration": null },
                { "name": "", "dosage": "5ml" }
            ],
            "notes": { "diagnosis": "Viral fever", "advice": "Rest" }
        }));

        assert_eq!(prescription.medications.len(), 1);
        let med = &prescription.medications[0];
        assert_eq!(med.dosage, "500");
        assert_eq!(med.duration, "");
        assert_eq!(med.instructions, "");
        assert!(prescription.notes.contains("Viral fever"));
    }

    #[test]
    fn notes_array_is_joined() {
        let prescription = Prescription::from_value(&json!({ "notes": ["Rest", "Fluids"] }));
        assert!(prescription.medications.is_empty());
        assert_eq!(prescription.notes, "Rest; Fluids");
    }

    #[tokio::test]
    async fn generator_error_is_stage_tagged() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .returning(|_, _, _| Err(VoiceError::Generation("down".into())));

        let err = draft_prescription(&generator, "cough").await.unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::PrescriptionDrafting));
    }
}
