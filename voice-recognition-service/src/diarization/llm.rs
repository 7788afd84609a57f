//! Diarization by text splitting, for languages without native speaker tags.
//!
//! The model only sees the joined transcript. Its segments are mapped back
//! onto the word timeline by token count, so every word keeps its original
//! timing and text.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::diarization::labels::{role_label, UNKNOWN};
use crate::error::{BestEffort, Degraded, VoiceResult};
use crate::generation::parse_model_json;
use crate::providers::{GenerationOptions, TextGenerator};
use crate::transcription::{Utterance, Word};

#[derive(Debug, Clone, Deserialize)]
struct Segment {
    #[serde(default, alias = "role")]
    speaker: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SegmentsResponse {
    List(Vec<Segment>),
    Wrapped {
        #[serde(default)]
        segments: Option<Vec<Segment>>,
        #[serde(default)]
        turns: Option<Vec<Segment>>,
    },
}

impl SegmentsResponse {
    fn into_segments(self) -> Vec<Segment> {
        match self {
            SegmentsResponse::List(segments) => segments,
            SegmentsResponse::Wrapped { segments, turns } => segments.or(turns).unwrap_or_default(),
        }
    }
}

fn system_prompt(language_name: &str) -> String {
    format!(
        "You are an expert medical transcription assistant. You receive the raw transcript of a \
         clinical consultation in {language}. It has no speaker labels.\n\
         Split the transcript into consecutive speaker turns. Use only these speakers: \
         \"Doctor\", \"Patient\", \"Caregiver\" (only if a caregiver is clearly present).\n\
         Respond with JSON of the form {{\"segments\": [{{\"speaker\": \"Doctor\", \"text\": \"...\"}}]}}.\n\
         The text of the segments, concatenated in order, must reproduce the input exactly. \
         Do not translate, paraphrase, correct, add or remove any words.",
        language = language_name
    )
}

/// Split a word list into speaker turns with the text-generation model.
///
/// Never fails outright: an unusable model response degrades to a single
/// `Unknown` utterance spanning every word.
pub async fn diarize_by_text(
    generator: &dyn TextGenerator,
    words: &[Word],
    language_name: &str,
) -> BestEffort<Vec<Utterance>> {
    let (Some(first), Some(last)) = (words.first(), words.last()) else {
        return Ok(Vec::new());
    };

    let full_text = join_words(words);
    match request_segments(generator, &full_text, language_name).await {
        Ok(segments) if !segments.is_empty() => Ok(realign(&segments, words)),
        Ok(_) => Err(Degraded::new(
            whole_transcript(full_text, first, last),
            "model returned no segments",
        )),
        Err(e) => {
            warn!(error = %e, language = %language_name, "Text diarization failed, using a single turn");
            Err(Degraded::new(whole_transcript(full_text, first, last), e.to_string()))
        }
    }
}

async fn request_segments(
    generator: &dyn TextGenerator,
    full_text: &str,
    language_name: &str,
) -> VoiceResult<Vec<Segment>> {
    let raw = generator
        .generate(&system_prompt(language_name), full_text, GenerationOptions::json())
        .await?;
    let response: SegmentsResponse = parse_model_json(&raw)?;
    let segments: Vec<Segment> = response
        .into_segments()
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .collect();

    debug!(segments = segments.len(), "Model returned speaker segments");
    Ok(segments)
}

/// Consume words for each segment by its whitespace token count.
///
/// Token counts that disagree with the word list shift later boundaries;
/// words left over after the last segment are attached to the final turn.
fn realign(segments: &[Segment], words: &[Word]) -> Vec<Utterance> {
    let model_tokens: usize = segments.iter().map(|s| s.text.split_whitespace().count()).sum();
    if model_tokens != words.len() {
        warn!(
            model_tokens,
            word_count = words.len(),
            "Segment token count differs from transcript, turn boundaries are approximate"
        );
    }

    let mut utterances: Vec<Utterance> = Vec::with_capacity(segments.len());
    let mut remaining = words;

    for segment in segments {
        let take = segment.text.split_whitespace().count().min(remaining.len());
        let (consumed, rest) = remaining.split_at(take);
        remaining = rest;

        let Some((head, tail)) = consumed.split_first() else {
            continue;
        };
        let mut utterance = Utterance::starting_with(role_label(&segment.speaker), head);
        tail.iter().for_each(|word| utterance.push_word(word));
        utterances.push(utterance);

        if remaining.is_empty() {
            break;
        }
    }

    if let Some(last) = utterances.last_mut() {
        remaining.iter().for_each(|word| last.push_word(word));
    }

    utterances
}

fn join_words(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn whole_transcript(text: String, first: &Word, last: &Word) -> Vec<Utterance> {
    vec![Utterance {
        speaker: UNKNOWN.to_string(),
        text,
        start_ms: first.start_ms,
        end_ms: last.end_ms,
    }]
}
