//! Batch transcription job runner.
//!
//! One call stages the audio in object storage, makes sure the language's
//! recognizer exists, submits a batch recognition job and waits for it under
//! a bounded [`PollPolicy`]. The staged object is removed on every exit path.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::PollPolicy;
use crate::error::{PipelineStage, StageContext, VoiceError, VoiceResult};
use crate::language::LanguagePipelineConfig;
use crate::providers::{
    BatchRecognizeOutput, ObjectStore, OperationPoll, RecognizerSpec, SpeechBackend,
};
use crate::timing::to_millis;
use crate::transcription::{AudioInput, BatchTranscription, Word};

/// Where the runner stages audio and provisions recognizers
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub bucket: String,
    pub bucket_region: String,
    /// `projects/{project}/locations/{location}`
    pub recognizer_parent: String,
    pub poll: PollPolicy,
    pub max_audio_bytes: usize,
}

pub struct BatchTranscriptionRunner {
    storage: Arc<dyn ObjectStore>,
    speech: Arc<dyn SpeechBackend>,
    settings: BatchSettings,
}

impl BatchTranscriptionRunner {
    pub fn new(storage: Arc<dyn ObjectStore>, speech: Arc<dyn SpeechBackend>, settings: BatchSettings) -> Self {
        Self {
            storage,
            speech,
            settings,
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Transcribe one audio file with the given language pipeline.
    ///
    /// Blocks until the remote job completes or the poll budget runs out,
    /// in which case a [`VoiceError::Timeout`] is returned.
    pub async fn run(
        &self,
        audio: &AudioInput,
        pipeline: &LanguagePipelineConfig,
    ) -> VoiceResult<BatchTranscription> {
        validate_audio(audio, self.settings.max_audio_bytes).stage(PipelineStage::AudioValidation)?;

        let key = object_key(&audio.mime_type);
        self.upload(audio, &key).await?;

        let staged = StagedObject::new(self.storage.clone(), &self.settings.bucket, &key);
        let result = self.recognize(&staged.uri, pipeline).await;
        staged.cleanup().await;

        result
    }

    async fn upload(&self, audio: &AudioInput, key: &str) -> VoiceResult<()> {
        let bucket = &self.settings.bucket;

        match self.storage.put(bucket, key, &audio.bytes, &audio.mime_type).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!(bucket = %bucket, region = %self.settings.bucket_region, "Audio bucket missing, creating it");
                match self.storage.create_bucket(bucket, &self.settings.bucket_region).await {
                    Ok(()) => {}
                    Err(e) if e.is_already_exists() => {
                        debug!(bucket = %bucket, "Bucket was created concurrently");
                    }
                    Err(e) => return Err(e.at(PipelineStage::BucketProvisioning)),
                }
                self.storage
                    .put(bucket, key, &audio.bytes, &audio.mime_type)
                    .await
                    .stage(PipelineStage::Upload)?;
            }
            Err(e) => return Err(e.at(PipelineStage::Upload)),
        }

        info!(bucket = %bucket, object = %key, size = audio.bytes.len(), "✅ Audio staged for recognition");
        Ok(())
    }

    async fn recognize(
        &self,
        file_uri: &str,
        pipeline: &LanguagePipelineConfig,
    ) -> VoiceResult<BatchTranscription> {
        let spec = recognizer_spec(pipeline);
        let recognizer = self.ensure_recognizer(pipeline, &spec).await?;

        let operation = self
            .speech
            .batch_recognize(&recognizer, &spec, file_uri)
            .await
            .stage(PipelineStage::BatchRecognition)?;

        info!(
            recognizer = %recognizer,
            operation = %operation.name,
            language = %pipeline.language_code,
            "Batch recognition running"
        );

        let speech = &self.speech;
        let operation = &operation;
        let output = self
            .await_operation("batch recognition", move || speech.poll_batch(operation))
            .await
            .stage(PipelineStage::BatchRecognition)?;

        let transcription = flatten_output(output, file_uri);
        if transcription.is_empty() {
            warn!(uri = %file_uri, "Batch recognition returned no results for the uploaded audio");
        } else {
            info!(
                word_count = transcription.raw_words.len(),
                segments = transcription.per_segment_transcripts.len(),
                "✅ Batch recognition complete"
            );
        }
        Ok(transcription)
    }

    /// Get-or-create the language's recognizer. Safe under concurrent first
    /// use: losing the creation race counts as success.
    async fn ensure_recognizer(
        &self,
        pipeline: &LanguagePipelineConfig,
        spec: &RecognizerSpec,
    ) -> VoiceResult<String> {
        let parent = &self.settings.recognizer_parent;
        let name = format!("{}/recognizers/{}", parent, pipeline.recognizer_id);

        match self.speech.get_recognizer(&name).await {
            Ok(existing) => {
                debug!(recognizer = %existing.name, "Reusing recognizer");
                return Ok(name);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.at(PipelineStage::RecognizerLookup)),
        }

        info!(recognizer = %name, model = %spec.model, "Creating recognizer");
        let operation = match self
            .speech
            .create_recognizer(parent, &pipeline.recognizer_id, spec)
            .await
        {
            Ok(operation) => operation,
            Err(e) if e.is_already_exists() => return Ok(name),
            Err(e) => return Err(e.at(PipelineStage::RecognizerCreation)),
        };

        let speech = &self.speech;
        let operation = &operation;
        match self
            .await_operation("recognizer creation", move || speech.poll_recognizer_creation(operation))
            .await
        {
            Ok(_) => {
                info!(recognizer = %name, "✅ Recognizer ready");
                Ok(name)
            }
            Err(e) if e.is_already_exists() => Ok(name),
            Err(e) => Err(e.at(PipelineStage::RecognizerCreation)),
        }
    }

    async fn await_operation<T, F, Fut>(&self, operation: &str, mut poll: F) -> VoiceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = VoiceResult<OperationPoll<T>>>,
    {
        let policy = self.settings.poll;
        for attempt in 1..=policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
            match poll().await? {
                OperationPoll::Done(value) => return Ok(value),
                OperationPoll::Pending => {
                    debug!(operation = %operation, attempt, max_attempts = policy.max_attempts, "Operation still running");
                }
            }
        }

        Err(VoiceError::Timeout {
            operation: operation.to_string(),
            waited: policy.budget(),
        })
    }
}

/// Temporary audio object that is deleted when the runner is done with it.
///
/// If the request future is dropped before [`StagedObject::cleanup`] runs,
/// the delete is spawned from `Drop` instead.
struct StagedObject {
    storage: Arc<dyn ObjectStore>,
    bucket: String,
    key: String,
    uri: String,
    released: bool,
}

impl StagedObject {
    fn new(storage: Arc<dyn ObjectStore>, bucket: &str, key: &str) -> Self {
        let uri = storage.object_uri(bucket, key);
        Self {
            storage,
            bucket: bucket.to_string(),
            key: key.to_string(),
            uri,
            released: false,
        }
    }

    async fn cleanup(mut self) {
        self.released = true;
        delete_quietly(self.storage.as_ref(), &self.bucket, &self.key).await;
    }
}

impl Drop for StagedObject {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(bucket = %self.bucket, object = %self.key, "No runtime to clean up abandoned audio object");
            return;
        };

        let storage = self.storage.clone();
        let bucket = std::mem::take(&mut self.bucket);
        let key = std::mem::take(&mut self.key);
        handle.spawn(async move {
            delete_quietly(storage.as_ref(), &bucket, &key).await;
        });
    }
}

async fn delete_quietly(storage: &dyn ObjectStore, bucket: &str, key: &str) {
    match storage.delete(bucket, key).await {
        Ok(()) => debug!(bucket = %bucket, object = %key, "Staged audio removed"),
        Err(e) => warn!(bucket = %bucket, object = %key, error = %e, "Failed to remove staged audio"),
    }
}

fn validate_audio(audio: &AudioInput, max_bytes: usize) -> VoiceResult<()> {
    if audio.bytes.is_empty() {
        return Err(VoiceError::InvalidAudio("audio file is empty".to_string()));
    }
    if audio.bytes.len() > max_bytes {
        return Err(VoiceError::InvalidAudio(format!(
            "audio file is {} bytes, limit is {}",
            audio.bytes.len(),
            max_bytes
        )));
    }

    let mime = essence(&audio.mime_type);
    let accepted = mime.starts_with("audio/") || matches!(mime.as_str(), "video/webm" | "video/mp4" | "video/ogg");
    if !accepted {
        return Err(VoiceError::InvalidAudio(format!(
            "unsupported content type '{}'",
            audio.mime_type
        )));
    }
    Ok(())
}

pub(crate) fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

/// Storage extension for a declared content type
pub fn extension_for(content_type: &str) -> &'static str {
    let mime = essence(content_type);
    if mime.contains("mp3") || mime.contains("mpeg") {
        "mp3"
    } else if mime.contains("webm") {
        "webm"
    } else {
        "wav"
    }
}

/// `audio-<timestamp>-<random>.<ext>`
pub fn object_key(content_type: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!(
        "audio-{}-{}.{}",
        Utc::now().timestamp_millis(),
        suffix,
        extension_for(content_type)
    )
}

fn recognizer_spec(pipeline: &LanguagePipelineConfig) -> RecognizerSpec {
    RecognizerSpec {
        language_code: pipeline.language_code.clone(),
        model: pipeline.model_name.clone(),
        enable_diarization: pipeline.native_diarization_supported,
    }
}

/// Words from the top alternative of every segment, globally time-sorted
/// with their speaker tags carried along.
fn flatten_output(mut output: BatchRecognizeOutput, file_uri: &str) -> BatchTranscription {
    let Some(file) = output.results_by_uri.remove(file_uri) else {
        return BatchTranscription::default();
    };

    let mut tagged = Vec::new();
    let mut per_segment_transcripts = Vec::with_capacity(file.segments.len());

    for segment in file.segments {
        let Some(top) = segment.alternatives.into_iter().next() else {
            continue;
        };
        per_segment_transcripts.push(top.transcript);
        for info in top.words {
            let word = Word::new(
                info.word,
                to_millis(info.start_offset.as_ref()),
                to_millis(info.end_offset.as_ref()),
            );
            tagged.push((word, info.speaker_label));
        }
    }

    tagged.sort_by_key(|(word, _)| word.start_ms);
    let (raw_words, native_speaker_tags) = tagged.into_iter().unzip();

    BatchTranscription {
        raw_words,
        native_speaker_tags,
        per_segment_transcripts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::select_pipeline;
    use crate::providers::{FileRecognitionResult, RecognitionAlternative, RecognitionSegment, WordInfo};
    use crate::testing::{FakeObjectStore, FakeSpeechBackend};
    use std::time::Duration;

    fn settings() -> BatchSettings {
        BatchSettings {
            bucket: "clinic-scribe-audio".into(),
            bucket_region: "US-CENTRAL1".into(),
            recognizer_parent: "projects/clinic/locations/us-central1".into(),
            poll: PollPolicy::new(Duration::from_secs(5), 3),
            max_audio_bytes: 1024,
        }
    }

    fn audio() -> AudioInput {
        AudioInput::new(vec![1, 2, 3, 4], "audio/webm;codecs=opus")
    }

    fn word(text: &str, start: &str, end: &str, tag: Option<&str>) -> WordInfo {
        WordInfo {
            word: text.into(),
            start_offset: Some(start.into()),
            end_offset: Some(end.into()),
            speaker_label: tag.map(str::to_string),
        }
    }

    #[test]
    fn object_keys_follow_naming_scheme() {
        let key = object_key("audio/mpeg");
        assert!(key.starts_with("audio-"));
        assert!(key.ends_with(".mp3"));
        assert_eq!(extension_for("audio/webm;codecs=opus"), "webm");
        assert_eq!(extension_for("audio/x-wav"), "wav");
        assert_eq!(extension_for("audio/ogg"), "wav");
    }

    #[test]
    fn rejects_empty_oversized_and_non_audio() {
        assert!(validate_audio(&AudioInput::new(vec![], "audio/wav"), 10).is_err());
        assert!(validate_audio(&AudioInput::new(vec![0; 11], "audio/wav"), 10).is_err());
        assert!(validate_audio(&AudioInput::new(vec![0; 4], "text/plain"), 10).is_err());
        assert!(validate_audio(&AudioInput::new(vec![0; 4], "video/webm"), 10).is_ok());
    }

    #[test]
    fn flatten_uses_top_alternative_and_sorts() {
        let uri = "gs://b/a.wav";
        let mut output = BatchRecognizeOutput::default();
        output.results_by_uri.insert(
            uri.into(),
            FileRecognitionResult {
                segments: vec![
                    RecognitionSegment {
                        alternatives: vec![
                            RecognitionAlternative {
                                transcript: "later words".into(),
                                words: vec![
                                    word("later", "2s", "2.4s", Some("2")),
                                    word("words", "2.5s", "3s", Some("2")),
                                ],
                            },
                            RecognitionAlternative {
                                transcript: "ignored".into(),
                                words: vec![word("ignored", "0s", "1s", None)],
                            },
                        ],
                    },
                    RecognitionSegment {
                        alternatives: vec![RecognitionAlternative {
                            transcript: "first".into(),
                            words: vec![word("first", "0.1s", "0.5s", Some("1"))],
                        }],
                    },
                ],
            },
        );

        let batch = flatten_output(output, uri);
        let texts: Vec<_> = batch.raw_words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["first", "later", "words"]);
        assert_eq!(batch.native_speaker_tags[0].as_deref(), Some("1"));
        assert_eq!(batch.per_segment_transcripts, ["later words", "first"]);
        assert_eq!(batch.raw_words[0].start_ms, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn creates_missing_bucket_and_retries_upload_once() {
        let storage = Arc::new(FakeObjectStore::with_missing_bucket());
        let speech = Arc::new(FakeSpeechBackend::finishing_after(1).with_words(&["hello"]));
        let runner = BatchTranscriptionRunner::new(storage.clone(), speech.clone(), settings());

        let batch = runner.run(&audio(), &select_pipeline("English")).await.unwrap();

        assert_eq!(batch.raw_words.len(), 1);
        assert_eq!(storage.created_buckets(), vec![("clinic-scribe-audio".to_string(), "US-CENTRAL1".to_string())]);
        assert_eq!(storage.put_attempts(), 2);
        assert_eq!(storage.deleted().len(), 1);
        assert!(storage.deleted()[0].ends_with(".webm"));
    }

    #[tokio::test(start_paused = true)]
    async fn upload_failure_after_retry_is_fatal() {
        let storage = Arc::new(FakeObjectStore::with_missing_bucket().failing_retry());
        let speech = Arc::new(FakeSpeechBackend::finishing_after(1));
        let runner = BatchTranscriptionRunner::new(storage.clone(), speech.clone(), settings());

        let err = runner.run(&audio(), &select_pipeline("English")).await.unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Upload));
        assert_eq!(speech.batch_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_recognizer_is_created_and_race_is_tolerated() {
        let storage = Arc::new(FakeObjectStore::default());
        let speech = Arc::new(
            FakeSpeechBackend::finishing_after(1)
                .without_recognizers()
                .losing_creation_race(),
        );
        let runner = BatchTranscriptionRunner::new(storage, speech.clone(), settings());

        let pipeline = select_pipeline("Malayalam");
        runner.run(&audio(), &pipeline).await.unwrap();

        assert_eq!(speech.created_recognizers(), vec!["scribe-ml-in".to_string()]);
        assert_eq!(
            speech.recognized_with(),
            vec!["projects/clinic/locations/us-central1/recognizers/scribe-ml-in".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_errors_other_than_not_found_are_fatal() {
        let storage = Arc::new(FakeObjectStore::default());
        let speech = Arc::new(FakeSpeechBackend::finishing_after(1).failing_lookup());
        let runner = BatchTranscriptionRunner::new(storage.clone(), speech, settings());

        let err = runner.run(&audio(), &select_pipeline("Hindi")).await.unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::RecognizerLookup));
        assert_eq!(storage.deleted().len(), 1, "staged audio removed on failure");
    }

    #[tokio::test(start_paused = true)]
    async fn never_finishing_job_times_out() {
        let storage = Arc::new(FakeObjectStore::default());
        let speech = Arc::new(FakeSpeechBackend::never_finishing());
        let runner = BatchTranscriptionRunner::new(storage.clone(), speech, settings());

        let started = tokio::time::Instant::now();
        let err = runner.run(&audio(), &select_pipeline("English")).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.stage(), Some(PipelineStage::BatchRecognition));
        assert_eq!(started.elapsed(), Duration::from_secs(15));
        assert_eq!(storage.deleted().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_results_for_uri_is_empty_not_error() {
        let storage = Arc::new(FakeObjectStore::default());
        let speech = Arc::new(FakeSpeechBackend::finishing_after(2).with_no_results());
        let runner = BatchTranscriptionRunner::new(storage, speech, settings());

        let batch = runner.run(&audio(), &select_pipeline("English")).await.unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.full_text(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_run_still_cleans_up() {
        let storage = Arc::new(FakeObjectStore::default());
        let speech = Arc::new(FakeSpeechBackend::never_finishing());
        let runner = Arc::new(BatchTranscriptionRunner::new(storage.clone(), speech, settings()));

        let task = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.run(&audio(), &select_pipeline("English")).await })
        };
        tokio::time::sleep(Duration::from_secs(6)).await;
        task.abort();
        let _ = task.await;
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        assert_eq!(storage.deleted().len(), 1);
    }
}
