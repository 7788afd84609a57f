use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{BestEffort, Degraded, VoiceResult};
use crate::generation::parse_model_json;
use crate::notes::list_of;
use crate::providers::{GenerationOptions, TextGenerator};

const SYSTEM_PROMPT: &str = r#"You are an expert medical consultant. Extract 3-5 concise, high-value medical insights from the consultation transcript.

Rules:
1. If the transcript contains no medical information, return an empty list.
2. Only state what is explicitly said. Do not infer symptoms that were not mentioned.
3. Focus on critical vitals or labs, new diagnoses or risks, medication changes and immediate action items.
4. Keep each insight under 12 words.
5. The transcript may be in English, Malayalam, Hindi or Arabic. Write the insights in English.

Respond with a JSON object: {"insights": ["..."]}"#;

/// Demographics supplied by the caller to ground the insights
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContext {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
}

impl PatientContext {
    fn describe(&self) -> String {
        let unknown = || "Unknown".to_string();
        format!(
            "Patient Context: Age {}, Gender {}, Nationality {}.",
            self.age.map(|a| a.to_string()).unwrap_or_else(unknown),
            self.gender.clone().filter(|g| !g.trim().is_empty()).unwrap_or_else(unknown),
            self.nationality.clone().filter(|n| !n.trim().is_empty()).unwrap_or_else(unknown),
        )
    }
}

fn parse_insights(raw: &str) -> VoiceResult<Vec<String>> {
    let value: Value = parse_model_json(raw)?;
    let list = match &value {
        Value::Array(_) => Some(&value),
        other => other.get("insights"),
    };
    Ok(list_of(list))
}

/// Short key points from a transcript. Failure degrades to an empty list.
pub async fn generate_insights(
    generator: &dyn TextGenerator,
    transcript: &str,
    patient: Option<&PatientContext>,
) -> BestEffort<Vec<String>> {
    let context = patient.cloned().unwrap_or_default().describe();
    let user_prompt = format!("{} Transcript: {}", context, transcript);

    let result = match generator
        .generate(SYSTEM_PROMPT, &user_prompt, GenerationOptions::json())
        .await
    {
        Ok(raw) => parse_insights(&raw),
        Err(e) => Err(e),
    };

    result.map_err(|e| {
        warn!(error = %e, "Insight generation failed");
        Degraded::new(Vec::new(), e.to_string())
    })
}
