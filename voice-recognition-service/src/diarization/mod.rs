//! Speaker attribution for batch transcripts.

pub mod labels;
pub mod llm;
pub mod native;

pub use llm::diarize_by_text;
pub use native::{group_by_speaker_tag, group_or_whole_transcript};

use crate::error::BestEffort;
use crate::language::{DiarizationStrategy, LanguagePipelineConfig};
use crate::providers::TextGenerator;
use crate::transcription::{BatchTranscription, Utterance};

/// Turn a batch transcription into utterances with the strategy chosen
/// for its language
pub async fn diarize(
    pipeline: &LanguagePipelineConfig,
    generator: &dyn TextGenerator,
    batch: &BatchTranscription,
) -> BestEffort<Vec<Utterance>> {
    match pipeline.diarization_strategy {
        DiarizationStrategy::Llm => {
            diarize_by_text(generator, &batch.raw_words, pipeline.language.display_name()).await
        }
        DiarizationStrategy::Native => Ok(group_or_whole_transcript(
            &batch.raw_words,
            &batch.native_speaker_tags,
            &batch.full_text(),
        )),
    }
}
