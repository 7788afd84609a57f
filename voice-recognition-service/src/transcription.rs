use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::language::ConsultationLanguage;

/// A single recognized word with its timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
}

impl Word {
    /// Build a word, widening `end_ms` so that `start_ms <= end_ms` holds.
    pub fn new(text: impl Into<String>, start_ms: i64, end_ms: i64) -> Self {
        Self {
            text: text.into(),
            start_ms,
            end_ms: end_ms.max(start_ms),
        }
    }
}

/// One continuous speaker turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utterance {
    pub speaker: String,
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
}

impl Utterance {
    /// Open an utterance from its first word
    pub fn starting_with(speaker: impl Into<String>, word: &Word) -> Self {
        Self {
            speaker: speaker.into(),
            text: word.text.clone(),
            start_ms: word.start_ms,
            end_ms: word.end_ms,
        }
    }

    /// Append a following word, extending the end time
    pub fn push_word(&mut self, word: &Word) {
        if self.text.is_empty() {
            self.text = word.text.clone();
        } else {
            self.text.push(' ');
            self.text.push_str(&word.text);
        }
        self.end_ms = self.end_ms.max(word.end_ms);
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Transcript handed back to callers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionResult {
    pub full_text: String,
    pub utterances: Vec<Utterance>,
}

impl TranscriptionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.full_text.is_empty() && self.utterances.is_empty()
    }
}

/// Flattened output of one batch recognition job.
///
/// `native_speaker_tags` is parallel to `raw_words`; both are sorted by start
/// time together. `per_segment_transcripts` keeps the backend's own segment
/// transcripts in result order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchTranscription {
    pub raw_words: Vec<Word>,
    pub native_speaker_tags: Vec<Option<String>>,
    pub per_segment_transcripts: Vec<String>,
}

impl BatchTranscription {
    pub fn is_empty(&self) -> bool {
        self.raw_words.is_empty() && self.per_segment_transcripts.is_empty()
    }

    /// Full transcript assembled from the backend's per-segment transcripts.
    /// This is intentionally independent of the word list.
    pub fn full_text(&self) -> String {
        self.per_segment_transcripts
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .join(" ")
    }
}

/// Raw audio submitted for a consultation
#[derive(Debug, Clone)]
pub struct AudioInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl AudioInput {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

/// Metadata describing how a transcript was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionMetadata {
    pub language: ConsultationLanguage,
    pub language_code: String,
    pub model: String,
    pub word_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_end_never_precedes_start() {
        let word = Word::new("fever", 1200, 900);
        assert_eq!(word.end_ms, 1200);
    }

    #[test]
    fn utterance_accumulates_words() {
        let mut utterance = Utterance::starting_with("DOCTOR", &Word::new("how", 0, 200));
        utterance.push_word(&Word::new("are", 250, 400));
        utterance.push_word(&Word::new("you", 450, 600));

        assert_eq!(utterance.text, "how are you");
        assert_eq!(utterance.start_ms, 0);
        assert_eq!(utterance.end_ms, 600);
        assert_eq!(utterance.word_count(), 3);
    }

    #[test]
    fn full_text_joins_segment_transcripts() {
        let batch = BatchTranscription {
            per_segment_transcripts: vec![" Hello doctor.".into(), "".into(), "I have a cough ".into()],
            ..Default::default()
        };
        assert_eq!(batch.full_text(), "Hello doctor. I have a cough");
    }
}
