use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{BestEffort, Degraded, VoiceResult};
use crate::generation::parse_model_json;
use crate::notes::{list_of, text_of};
use crate::providers::{GenerationOptions, TextGenerator};
use crate::transcription::Utterance;

pub const NOT_RECORDED: &str = "Not recorded";
pub const NOT_DOCUMENTED: &str = "Not documented";
pub const NO_PLAN: &str = "No specific plan documented";
pub const NO_SUMMARY: &str = "Consultation overview not available.";
pub const NON_MEDICAL_TITLE: &str = "Non-Medical Content";

const FALLBACK_TITLE: &str = "Consultation Note (automatic generation unavailable)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    pub temperature: String,
    pub blood_pressure: String,
    pub pulse: String,
    pub respiratory_rate: String,
}

impl Vitals {
    fn not_recorded() -> Self {
        Self {
            temperature: NOT_RECORDED.to_string(),
            blood_pressure: NOT_RECORDED.to_string(),
            pulse: NOT_RECORDED.to_string(),
            respiratory_rate: NOT_RECORDED.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subjective {
    pub chief_complaint: String,
    pub history_of_present_illness: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub vitals: Vitals,
    pub appearance: Vec<String>,
}

/// Subjective / Objective / Assessment / Plan note. Every leaf is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoapNote {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub summary: String,
    pub subjective: Subjective,
    pub objective: Objective,
    pub assessment: String,
    pub plan: String,
}

impl SoapNote {
    /// Build a complete note from whatever the model returned, filling
    /// every missing or empty field with its documented default.
    pub fn from_value(raw: &Value) -> Self {
        let field = |path: &[&str]| path.iter().try_fold(raw, |v, key| v.get(key));
        let text = |path: &[&str], default: &str| {
            text_of(field(path)).unwrap_or_else(|| default.to_string())
        };

        let mut appearance = list_of(field(&["objective", "appearance"]));
        if appearance.is_empty() {
            appearance.push(NOT_RECORDED.to_string());
        }

        let plan = text_of(field(&["plan"]))
            .or_else(|| text_of(field(&["actionPlan"])))
            .unwrap_or_else(|| NO_PLAN.to_string());

        SoapNote {
            title: text_of(field(&["title"])),
            summary: text(&["summary"], NO_SUMMARY),
            subjective: Subjective {
                chief_complaint: text(&["subjective", "chiefComplaint"], NOT_DOCUMENTED),
                history_of_present_illness: text(&["subjective", "historyOfPresentIllness"], NOT_DOCUMENTED),
            },
            objective: Objective {
                vitals: Vitals {
                    temperature: text(&["objective", "vitals", "temperature"], NOT_RECORDED),
                    blood_pressure: text(&["objective", "vitals", "bloodPressure"], NOT_RECORDED),
                    pulse: text(&["objective", "vitals", "pulse"], NOT_RECORDED),
                    respiratory_rate: text(&["objective", "vitals", "respiratoryRate"], NOT_RECORDED),
                },
                appearance,
            },
            assessment: text(&["assessment"], NOT_DOCUMENTED),
            plan,
        }
    }

    /// Parse raw model output into a complete note
    pub fn from_model_output(raw: &str) -> VoiceResult<Self> {
        let value: Value = parse_model_json(raw)?;
        Ok(Self::from_value(&value))
    }

    /// Placeholder note returned when generation fails
    pub fn fallback() -> Self {
        SoapNote {
            title: Some(FALLBACK_TITLE.to_string()),
            summary: NO_SUMMARY.to_string(),
            subjective: Subjective {
                chief_complaint: "Patient complaint from consultation".to_string(),
                history_of_present_illness: "Consultation text available".to_string(),
            },
            objective: Objective {
                vitals: Vitals::not_recorded(),
                appearance: vec!["General appearance not noted".to_string()],
            },
            assessment: "Assessment based on consultation".to_string(),
            plan: "Follow-up and treatment plan".to_string(),
        }
    }

    pub fn is_non_medical(&self) -> bool {
        self.title.as_deref() == Some(NON_MEDICAL_TITLE)
    }
}

const SYSTEM_PROMPT: &str = r#"You are an expert medical scribe. Extract the clinical information from a consultation transcript.

Rules:
1. Do not invent anything. If a symptom, vital sign or diagnosis is not in the transcript, leave it out.
   If the transcript is not about health at all, set "title" to "Non-Medical Content" and "summary" to "The transcript does not contain medical information.".
2. Vitals: only give values that were spoken aloud, otherwise "Not recorded".
3. The transcript may be in English, Malayalam, Hindi or Arabic. Write the note in professional English.

Respond with a JSON object of exactly this shape:
{
  "title": "Short title",
  "summary": "Brief summary of the problem",
  "subjective": { "chiefComplaint": "...", "historyOfPresentIllness": "..." },
  "objective": {
    "vitals": { "temperature": "...", "bloodPressure": "...", "pulse": "...", "respiratoryRate": "..." },
    "appearance": ["..."]
  },
  "assessment": "...",
  "plan": "..."
}"#;

fn conversation(full_text: &str, utterances: &[Utterance]) -> String {
    if utterances.is_empty() {
        return full_text.trim().to_string();
    }
    utterances
        .iter()
        .map(|u| {
            if u.speaker.starts_with("Speaker ") {
                format!("{}: {}", u.speaker, u.text)
            } else {
                format!("Speaker {}: {}", u.speaker, u.text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Generate a SOAP note. Always yields a complete note; on failure the
/// fixed [`SoapNote::fallback`] is returned as the degraded value.
pub async fn generate_soap_note(
    generator: &dyn TextGenerator,
    full_text: &str,
    utterances: &[Utterance],
) -> BestEffort<SoapNote> {
    let user_prompt = format!("Consultation Transcript:\n{}", conversation(full_text, utterances));

    let result = match generator
        .generate(SYSTEM_PROMPT, &user_prompt, GenerationOptions::json())
        .await
    {
        Ok(raw) => SoapNote::from_model_output(&raw),
        Err(e) => Err(e),
    };

    match result {
        Ok(note) => {
            debug!(non_medical = note.is_non_medical(), "SOAP note generated");
            Ok(note)
        }
        Err(e) => {
            warn!(error = %e, "SOAP note generation failed, returning placeholder note");
            Err(Degraded::new(SoapNote::fallback(), e.to_string()))
        }
    }
}
