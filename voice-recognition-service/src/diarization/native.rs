use crate::diarization::labels::{canonical_label, FIRST_SPEAKER};
use crate::transcription::{Utterance, Word};

/// Merge consecutive words that share a backend speaker tag.
///
/// `speaker_tags` is parallel to `words`; missing entries count as the
/// default tag. Words are re-sorted by start time before grouping.
pub fn group_by_speaker_tag(words: &[Word], speaker_tags: &[Option<String>]) -> Vec<Utterance> {
    let mut tagged: Vec<(&Word, String)> = words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let tag = speaker_tags.get(i).and_then(|t| t.as_deref());
            (word, canonical_label(tag))
        })
        .collect();
    tagged.sort_by_key(|(word, _)| word.start_ms);

    let mut utterances: Vec<Utterance> = Vec::new();
    let mut current: Option<Utterance> = None;

    for (word, label) in tagged {
        match current.as_mut() {
            Some(open) if open.speaker == label => open.push_word(word),
            _ => {
                if let Some(done) = current.replace(Utterance::starting_with(label, word)) {
                    utterances.push(done);
                }
            }
        }
    }
    utterances.extend(current);

    utterances
}

/// Native grouping with the synthetic single-turn fallback used when the
/// backend produced a transcript but no usable words.
pub fn group_or_whole_transcript(
    words: &[Word],
    speaker_tags: &[Option<String>],
    full_text: &str,
) -> Vec<Utterance> {
    let utterances = group_by_speaker_tag(words, speaker_tags);
    if utterances.is_empty() && !full_text.trim().is_empty() {
        return vec![Utterance {
            speaker: FIRST_SPEAKER.to_string(),
            text: full_text.trim().to_string(),
            start_ms: 0,
            end_ms: 0,
        }];
    }
    utterances
}
