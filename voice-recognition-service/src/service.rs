use std::sync::Arc;
use std::time::Duration;

use logger_redacted::TextPreview;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::batch::{BatchSettings, BatchTranscriptionRunner};
use crate::config::VoiceConfig;
use crate::diarization::diarize;
use crate::error::{BestEffort, DegradedStage, PipelineStage, VoiceResult};
use crate::language::{select_pipeline, LanguagePipelineConfig};
use crate::notes::{self, PatientContext, Prescription, SoapNote};
use crate::providers::chat_completions::OpenAiCompatibleGenerator;
use crate::providers::gcs::GcsObjectStore;
use crate::providers::google_auth::GoogleAuth;
use crate::providers::google_speech::GoogleSpeechBackend;
use crate::providers::{ObjectStore, SpeechBackend, TextGenerator};
use crate::transcription::{AudioInput, TranscriptionMetadata, TranscriptionResult, Utterance};

const API_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything produced for one recorded consultation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationOutcome {
    pub transcript: TranscriptionResult,
    pub metadata: TranscriptionMetadata,
    pub soap_note: SoapNote,
    pub insights: Vec<String>,
    /// Stages that fell back to a substitute value
    pub degraded: Vec<DegradedStage>,
}

/// Transcript plus the bookkeeping needed by later stages
struct Transcribed {
    result: TranscriptionResult,
    metadata: TranscriptionMetadata,
    degraded: Vec<DegradedStage>,
}

/// Consultation processing service.
///
/// Holds the storage, speech and text-generation clients for the life of the
/// process; construct once at startup and share behind an `Arc`.
pub struct ConsultationProcessor {
    runner: BatchTranscriptionRunner,
    generator: Arc<dyn TextGenerator>,
    preview: TextPreview,
}

impl ConsultationProcessor {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        speech: Arc<dyn SpeechBackend>,
        generator: Arc<dyn TextGenerator>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            runner: BatchTranscriptionRunner::new(storage, speech, settings),
            generator,
            preview: TextPreview::default(),
        }
    }

    /// Excerpts used when transcripts are logged
    pub fn with_log_preview(mut self, preview: TextPreview) -> Self {
        self.preview = preview;
        self
    }

    pub fn log_preview(&self) -> &TextPreview {
        &self.preview
    }

    /// Build the Google Cloud and chat-completions clients from configuration
    pub fn from_config(config: &VoiceConfig) -> VoiceResult<Self> {
        let auth = Arc::new(GoogleAuth::new(config.google.credentials.clone(), API_TIMEOUT)?);
        let storage = GcsObjectStore::new(auth.clone(), config.google.project_id.clone(), UPLOAD_TIMEOUT)?;
        let speech = GoogleSpeechBackend::new(auth, &config.google.speech_location, API_TIMEOUT)?;
        let generator = OpenAiCompatibleGenerator::new(
            config.llm.api_url.clone(),
            config.llm.api_key.clone(),
            config.llm.model.clone(),
            config.llm.timeout,
        )?;

        let settings = BatchSettings {
            bucket: config.google.audio_bucket.clone(),
            bucket_region: config.google.bucket_region.clone(),
            recognizer_parent: config.google.recognizer_parent(),
            poll: config.poll,
            max_audio_bytes: config.max_audio_bytes,
        };

        info!(
            project = %config.google.project_id,
            location = %config.google.speech_location,
            bucket = %settings.bucket,
            model = %generator.model(),
            "Consultation processor configured"
        );

        Ok(Self::new(Arc::new(storage), Arc::new(speech), Arc::new(generator), settings))
    }

    pub fn settings(&self) -> &BatchSettings {
        self.runner.settings()
    }

    /// Transcribe and diarize a recording
    pub async fn transcribe(&self, audio: &AudioInput, requested_language: &str) -> VoiceResult<TranscriptionResult> {
        Ok(self.transcribe_inner(audio, requested_language).await?.result)
    }

    async fn transcribe_inner(&self, audio: &AudioInput, requested_language: &str) -> VoiceResult<Transcribed> {
        let pipeline = select_pipeline(requested_language);
        info!(
            requested = %requested_language,
            language = %pipeline.language,
            strategy = ?pipeline.diarization_strategy,
            size = audio.bytes.len(),
            "Transcribing consultation"
        );

        let batch = self.runner.run(audio, &pipeline).await?;
        let full_text = batch.full_text();

        let mut degraded = Vec::new();
        let utterances = settle(diarize(&pipeline, self.generator.as_ref(), &batch).await, PipelineStage::Diarization, &mut degraded);

        debug!(
            utterances = utterances.len(),
            preview = %self.preview.excerpt(&full_text),
            "Transcript assembled"
        );

        Ok(Transcribed {
            metadata: metadata(&pipeline, batch.raw_words.len()),
            result: TranscriptionResult { full_text, utterances },
            degraded,
        })
    }

    /// Full consultation flow: transcript, SOAP note and insights.
    ///
    /// Only transcription failures are returned as errors; note and insight
    /// generation fall back and are listed in [`ConsultationOutcome::degraded`].
    pub async fn process(&self, audio: &AudioInput, requested_language: &str) -> VoiceResult<ConsultationOutcome> {
        let Transcribed {
            result: transcript,
            metadata,
            mut degraded,
        } = self.transcribe_inner(audio, requested_language).await?;

        if transcript.is_empty() {
            warn!("No speech recognized, skipping note generation");
            return Ok(ConsultationOutcome {
                transcript,
                metadata,
                soap_note: SoapNote::from_value(&Value::Null),
                insights: Vec::new(),
                degraded,
            });
        }

        let (soap, insights) = tokio::join!(
            notes::generate_soap_note(self.generator.as_ref(), &transcript.full_text, &transcript.utterances),
            notes::generate_insights(self.generator.as_ref(), &transcript.full_text, None),
        );
        let soap_note = settle(soap, PipelineStage::NoteGeneration, &mut degraded);
        let insights = settle(insights, PipelineStage::InsightGeneration, &mut degraded);

        info!(
            utterances = transcript.utterances.len(),
            insights = insights.len(),
            degraded = degraded.len(),
            "✅ Consultation processed"
        );

        Ok(ConsultationOutcome {
            transcript,
            metadata,
            soap_note,
            insights,
            degraded,
        })
    }

    /// SOAP note for an existing transcript; always complete
    pub async fn soap_note(&self, full_text: &str, utterances: &[Utterance]) -> BestEffort<SoapNote> {
        notes::generate_soap_note(self.generator.as_ref(), full_text, utterances).await
    }

    pub async fn insights(&self, transcript: &str, patient: Option<&PatientContext>) -> BestEffort<Vec<String>> {
        notes::generate_insights(self.generator.as_ref(), transcript, patient).await
    }

    pub async fn draft_prescription(&self, transcript: &str) -> VoiceResult<Prescription> {
        notes::draft_prescription(self.generator.as_ref(), transcript).await
    }

    pub async fn translate(&self, text: &str, target_language: &str) -> VoiceResult<String> {
        notes::translate(self.generator.as_ref(), text, target_language).await
    }

    pub async fn ask(&self, question: &str, context: Option<&str>) -> VoiceResult<String> {
        notes::ask(self.generator.as_ref(), question, context).await
    }
}

/// Take the usable value of a best-effort stage, recording any fallback
fn settle<T>(result: BestEffort<T>, stage: PipelineStage, degraded: &mut Vec<DegradedStage>) -> T {
    match result {
        Ok(value) => value,
        Err(fallback) => {
            degraded.push(DegradedStage {
                stage,
                reason: fallback.reason,
            });
            fallback.fallback
        }
    }
}

fn metadata(pipeline: &LanguagePipelineConfig, word_count: usize) -> TranscriptionMetadata {
    TranscriptionMetadata {
        language: pipeline.language,
        language_code: pipeline.language_code.clone(),
        model: pipeline.model_name.clone(),
        word_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollPolicy;
    use crate::diarization::labels::{DOCTOR, UNKNOWN};
    use crate::error::VoiceError;
    use crate::language::ConsultationLanguage;
    use crate::providers::MockTextGenerator;
    use crate::testing::{FakeObjectStore, FakeSpeechBackend};

    const DIARIZATION: &str = "medical transcription assistant";
    const SOAP: &str = "medical scribe";
    const INSIGHTS: &str = "medical insights";

    fn settings() -> BatchSettings {
        BatchSettings {
            bucket: "b".into(),
            bucket_region: "US-CENTRAL1".into(),
            recognizer_parent: "projects/p/locations/us-central1".into(),
            poll: PollPolicy::new(Duration::from_secs(1), 5),
            max_audio_bytes: 1 << 20,
        }
    }

    fn audio() -> AudioInput {
        AudioInput::new(vec![0; 64], "audio/webm")
    }

    fn expect(generator: &mut MockTextGenerator, marker: &'static str, reply: VoiceResult<&'static str>) {
        let reply = reply.map(str::to_string).map_err(|e| e.to_string());
        generator
            .expect_generate()
            .withf(move |system, _, _| system.contains(marker))
            .returning(move |_, _, _| reply.clone().map_err(VoiceError::Generation));
    }

    fn processor(speech: FakeSpeechBackend, generator: MockTextGenerator) -> ConsultationProcessor {
        ConsultationProcessor::new(
            Arc::new(FakeObjectStore::default()),
            Arc::new(speech),
            Arc::new(generator),
            settings(),
        )
    }

    #[test]
    fn log_preview_follows_logger_config() {
        let default = processor(FakeSpeechBackend::never_finishing(), MockTextGenerator::new());
        assert_eq!(default.log_preview().max_chars(), 120);

        let logging = logger_redacted::LoggerConfig {
            redaction_enabled: false,
            hash_for_correlation: false,
            preview_chars: 8,
        };
        let configured = default.with_log_preview(logging.previewer());
        assert_eq!(configured.log_preview().excerpt("call 555-123-4567"), "call 555...");
    }

    #[tokio::test(start_paused = true)]
    async fn malayalam_uses_text_diarization_over_all_words() {
        let speech = FakeSpeechBackend::finishing_after(1).with_segments(&[
            &["namaskaram", "doctor", "enikku", "pani", "undu"],
            &["ethra", "divasam", "aayi", "moonnu", "divasam"],
        ]);
        let mut generator = MockTextGenerator::new();
        expect(
            &mut generator,
            DIARIZATION,
            Ok(r#"{"segments":[
                {"speaker":"Patient","text":"namaskaram doctor enikku pani undu ethra divasam"},
                {"speaker":"Doctor","text":"aayi moonnu divasam"}]}"#),
        );
        expect(&mut generator, SOAP, Ok(r#"{"assessment":"Fever"}"#));
        expect(&mut generator, INSIGHTS, Ok(r#"{"insights":["Fever for three days"]}"#));

        let outcome = processor(speech, generator).process(&audio(), "Malayalam").await.unwrap();

        assert_eq!(outcome.metadata.language, ConsultationLanguage::Malayalam);
        assert_eq!(outcome.metadata.language_code, "ml-IN");
        assert_eq!(
            outcome.transcript.full_text,
            "namaskaram doctor enikku pani undu ethra divasam aayi moonnu divasam"
        );
        assert_eq!(outcome.transcript.utterances.len(), 2);
        let words: usize = outcome.transcript.utterances.iter().map(Utterance::word_count).sum();
        assert_eq!(words, 10);
        assert_eq!(outcome.soap_note.assessment, "Fever");
        assert_eq!(outcome.insights, vec!["Fever for three days"]);
        assert!(outcome.degraded.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn english_uses_native_tags() {
        let speech = FakeSpeechBackend::finishing_after(1).with_tagged_words(&[
            ("good", "1"),
            ("morning", "1"),
            ("hello", "2"),
            ("doctor", "2"),
            ("sit", "1"),
        ]);
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().withf(|system, _, _| system.contains(DIARIZATION)).never();

        let transcript = processor(speech, generator).transcribe(&audio(), "English").await.unwrap();

        let speakers: Vec<_> = transcript.utterances.iter().map(|u| u.speaker.as_str()).collect();
        assert_eq!(speakers, [DOCTOR, "Speaker B", DOCTOR]);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_results_yield_empty_transcript() {
        let speech = FakeSpeechBackend::finishing_after(1).with_no_results();
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();

        let outcome = processor(speech, generator).process(&audio(), "English").await.unwrap();

        assert_eq!(outcome.transcript, TranscriptionResult::empty());
        assert!(outcome.insights.is_empty());
        assert!(!outcome.soap_note.plan.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn soap_failure_returns_fallback_note() {
        let speech = FakeSpeechBackend::finishing_after(1).with_tagged_words(&[("cough", "1")]);
        let mut generator = MockTextGenerator::new();
        expect(&mut generator, SOAP, Err(VoiceError::Generation("503 from upstream".into())));
        expect(&mut generator, INSIGHTS, Ok(r#"{"insights":[]}"#));

        let outcome = processor(speech, generator).process(&audio(), "English").await.unwrap();

        assert_eq!(outcome.soap_note, SoapNote::fallback());
        assert_eq!(outcome.degraded.len(), 1);
        assert_eq!(outcome.degraded[0].stage, PipelineStage::NoteGeneration);
    }

    #[tokio::test(start_paused = true)]
    async fn diarization_fallback_is_reported() {
        let speech = FakeSpeechBackend::finishing_after(1).with_words(&["salam", "doctor"]);
        let mut generator = MockTextGenerator::new();
        expect(&mut generator, DIARIZATION, Ok("no idea"));
        expect(&mut generator, SOAP, Ok("{}"));
        expect(&mut generator, INSIGHTS, Err(VoiceError::Generation("quota".into())));

        let outcome = processor(speech, generator).process(&audio(), "Arabic").await.unwrap();

        assert_eq!(outcome.transcript.utterances.len(), 1);
        assert_eq!(outcome.transcript.utterances[0].speaker, UNKNOWN);
        let stages: Vec<_> = outcome.degraded.iter().map(|d| d.stage).collect();
        assert_eq!(stages, [PipelineStage::Diarization, PipelineStage::InsightGeneration]);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_audio_is_rejected_before_upload() {
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();
        let processor = processor(FakeSpeechBackend::finishing_after(1), generator);

        let err = processor
            .process(&AudioInput::new(Vec::new(), "audio/wav"), "English")
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::AudioValidation));
    }
}
