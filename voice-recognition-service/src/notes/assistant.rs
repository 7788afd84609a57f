//! Translation and free-form question answering.

use tracing::debug;

use crate::error::{PipelineStage, StageContext, VoiceResult};
use crate::providers::{GenerationOptions, TextGenerator};

const TRANSLATOR_PROMPT: &str = "You are a professional medical translator.";
const TRANSLATION_TEMPERATURE: f32 = 0.3;

const MAX_CONTEXT_CHARS: usize = 20_000;
const TRUNCATION_MARKER: &str = "... (truncated)";
const NO_ANSWER: &str = "No specific answer found.";

fn target_language_name(target: &str) -> &str {
    let target = target.trim();
    if target.eq_ignore_ascii_case("ml") || target.eq_ignore_ascii_case("ml-in") {
        "Malayalam"
    } else {
        target
    }
}

/// Translate medical text. An empty model reply returns the input unchanged.
pub async fn translate(generator: &dyn TextGenerator, text: &str, target_language: &str) -> VoiceResult<String> {
    let language = target_language_name(target_language);
    let prompt = format!(
        "Translate the following medical text accurately into {}. Keep professional medical terminology. \
         Return only the translated text, without any commentary.\n\nText:\n\"{}\"",
        language, text
    );

    let reply = generator
        .generate(
            TRANSLATOR_PROMPT,
            &prompt,
            GenerationOptions::text().with_temperature(TRANSLATION_TEMPERATURE),
        )
        .await
        .stage(PipelineStage::Translation)?;

    debug!(target_language = %language, chars = text.chars().count(), "Translation complete");

    let translated = reply.trim();
    Ok(if translated.is_empty() {
        text.to_string()
    } else {
        translated.to_string()
    })
}

fn truncate_context(context: &str) -> String {
    match context.char_indices().nth(MAX_CONTEXT_CHARS) {
        Some((cut, _)) => format!("{}{}", context.get(..cut).unwrap_or(context), TRUNCATION_MARKER),
        None => context.to_string(),
    }
}

/// Answer a question, optionally grounded in clinical context
pub async fn ask(generator: &dyn TextGenerator, question: &str, context: Option<&str>) -> VoiceResult<String> {
    let context = context.map(str::trim).filter(|c| !c.is_empty()).map(truncate_context);

    let system_prompt = match &context {
        Some(context) => format!(
            "You are a helpful medical assistant. Answer the user's question based on the provided clinical context.\n\n\
             CLINICAL CONTEXT FROM PATIENT RECORDS:\n{}",
            context
        ),
        None => "You are a helpful medical assistant. Answer the user's question based on the provided clinical context if available."
            .to_string(),
    };

    let answer = generator
        .generate(&system_prompt, question, GenerationOptions::text())
        .await
        .stage(PipelineStage::QuestionAnswering)?;

    let answer = answer.trim();
    Ok(if answer.is_empty() {
        NO_ANSWER.to_string()
    } else {
        answer.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockTextGenerator;

    #[tokio::test]
    async fn translate_expands_ml_and_sets_temperature() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|system, user, options| {
                system.starts_with("You are a professional medical translator")
                    && user.contains("into Malayalam")
                    && options.temperature == Some(TRANSLATION_TEMPERATURE)
                    && !options.json_mode
            })
            .returning(|_, _, _| Ok(" പനി ".into()));

        assert_eq!(translate(&generator, "fever", "ml").await.unwrap(), "പനി");
    }

    #[tokio::test]
    async fn empty_translation_returns_input() {
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().returning(|_, _, _| Ok("".into()));
        assert_eq!(translate(&generator, "fever", "Hindi").await.unwrap(), "fever");
    }

    #[test]
    fn long_context_is_truncated_with_marker() {
        let context = "x".repeat(MAX_CONTEXT_CHARS + 10);
        let truncated = truncate_context(&context);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert_eq!(truncated.chars().count(), MAX_CONTEXT_CHARS + TRUNCATION_MARKER.len());

        assert_eq!(truncate_context("short"), "short");
    }

    #[tokio::test]
    async fn empty_answer_has_placeholder() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|system, _, _| system.contains("CLINICAL CONTEXT") && system.contains("HbA1c 7.2"))
            .returning(|_, _, _| Ok("   ".into()));

        let answer = ask(&generator, "Is diabetes controlled?", Some("HbA1c 7.2")).await.unwrap();
        assert_eq!(answer, NO_ANSWER);
    }
}
