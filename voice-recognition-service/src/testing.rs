//! In-memory backends for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{VoiceError, VoiceResult};
use crate::providers::{
    BatchRecognizeOutput, FileRecognitionResult, ObjectStore, OperationHandle, OperationPoll,
    RecognitionAlternative, RecognitionSegment, RecognizerResource, RecognizerSpec, SpeechBackend,
    WordInfo,
};
use crate::timing::DurationLike;

#[derive(Default)]
struct StoreState {
    objects: HashMap<String, Vec<u8>>,
    put_attempts: usize,
    created_buckets: Vec<(String, String)>,
    deleted: Vec<String>,
    bucket_missing: bool,
}

#[derive(Default)]
pub struct FakeObjectStore {
    state: Mutex<StoreState>,
    fail_retry: bool,
}

impl FakeObjectStore {
    pub fn with_missing_bucket() -> Self {
        let store = Self::default();
        store.state.lock().unwrap().bucket_missing = true;
        store
    }

    pub fn failing_retry(mut self) -> Self {
        self.fail_retry = true;
        self
    }

    pub fn put_attempts(&self) -> usize {
        self.state.lock().unwrap().put_attempts
    }

    pub fn created_buckets(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().created_buckets.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8], _content_type: &str) -> VoiceResult<()> {
        let mut state = self.state.lock().unwrap();
        state.put_attempts += 1;
        if state.bucket_missing {
            return Err(VoiceError::NotFound(format!("bucket {}", bucket)));
        }
        if self.fail_retry && state.put_attempts > 1 {
            return Err(VoiceError::Provider("upload rejected".into()));
        }
        state.objects.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, _bucket: &str, key: &str) -> VoiceResult<()> {
        let mut state = self.state.lock().unwrap();
        state.objects.remove(key);
        state.deleted.push(key.to_string());
        Ok(())
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> VoiceResult<()> {
        let mut state = self.state.lock().unwrap();
        state.created_buckets.push((bucket.to_string(), region.to_string()));
        if !self.fail_retry {
            state.bucket_missing = false;
        }
        Ok(())
    }

    fn object_uri(&self, bucket: &str, key: &str) -> String {
        format!("gs://{}/{}", bucket, key)
    }
}

#[derive(Default)]
struct SpeechState {
    created_recognizers: Vec<String>,
    recognized_with: Vec<String>,
    batch_requests: usize,
    polls: u32,
    last_uri: Option<String>,
}

/// Speech backend whose batch job finishes after a fixed number of polls
pub struct FakeSpeechBackend {
    state: Mutex<SpeechState>,
    polls_until_done: Option<u32>,
    recognizers_exist: bool,
    lookup_fails: bool,
    creation_race: bool,
    no_results: bool,
    segments: Vec<Vec<(String, Option<String>)>>,
}

impl FakeSpeechBackend {
    pub fn finishing_after(polls: u32) -> Self {
        Self {
            state: Mutex::new(SpeechState::default()),
            polls_until_done: Some(polls),
            recognizers_exist: true,
            lookup_fails: false,
            creation_race: false,
            no_results: false,
            segments: Vec::new(),
        }
    }

    pub fn never_finishing() -> Self {
        Self {
            polls_until_done: None,
            ..Self::finishing_after(0)
        }
    }

    pub fn without_recognizers(mut self) -> Self {
        self.recognizers_exist = false;
        self
    }

    pub fn failing_lookup(mut self) -> Self {
        self.lookup_fails = true;
        self
    }

    pub fn losing_creation_race(mut self) -> Self {
        self.creation_race = true;
        self
    }

    pub fn with_no_results(mut self) -> Self {
        self.no_results = true;
        self
    }

    /// One segment of untagged words
    pub fn with_words(self, words: &[&str]) -> Self {
        self.with_segments(&[words])
    }

    /// One segment whose words carry native speaker tags
    pub fn with_tagged_words(mut self, words: &[(&str, &str)]) -> Self {
        self.segments.push(
            words
                .iter()
                .map(|(w, tag)| (w.to_string(), Some(tag.to_string())))
                .collect(),
        );
        self
    }

    pub fn with_segments(mut self, segments: &[&[&str]]) -> Self {
        for words in segments {
            self.segments
                .push(words.iter().map(|w| (w.to_string(), None)).collect());
        }
        self
    }

    pub fn created_recognizers(&self) -> Vec<String> {
        self.state.lock().unwrap().created_recognizers.clone()
    }

    pub fn recognized_with(&self) -> Vec<String> {
        self.state.lock().unwrap().recognized_with.clone()
    }

    pub fn batch_requests(&self) -> usize {
        self.state.lock().unwrap().batch_requests
    }

    /// Words are 400ms long and start every 500ms, across all segments
    fn output(&self, uri: &str) -> BatchRecognizeOutput {
        let mut output = BatchRecognizeOutput::default();
        if self.no_results {
            return output;
        }

        let mut index = 0_i64;
        let segments = self
            .segments
            .iter()
            .map(|words| {
                let infos: Vec<WordInfo> = words
                    .iter()
                    .map(|(word, tag)| {
                        let start = index * 500;
                        index += 1;
                        WordInfo {
                            word: word.clone(),
                            start_offset: Some(DurationLike::Millis(start as f64)),
                            end_offset: Some(DurationLike::Millis((start + 400) as f64)),
                            speaker_label: tag.clone(),
                        }
                    })
                    .collect();
                let transcript = words
                    .iter()
                    .map(|(w, _)| w.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                RecognitionSegment {
                    alternatives: vec![RecognitionAlternative {
                        transcript,
                        words: infos,
                    }],
                }
            })
            .collect();

        output
            .results_by_uri
            .insert(uri.to_string(), FileRecognitionResult { segments });
        output
    }
}

#[async_trait]
impl SpeechBackend for FakeSpeechBackend {
    async fn get_recognizer(&self, name: &str) -> VoiceResult<RecognizerResource> {
        if self.lookup_fails {
            return Err(VoiceError::Authentication("permission denied".into()));
        }
        if !self.recognizers_exist {
            return Err(VoiceError::NotFound(name.to_string()));
        }
        Ok(RecognizerResource {
            name: name.to_string(),
            model: None,
            language_codes: Vec::new(),
        })
    }

    async fn create_recognizer(
        &self,
        parent: &str,
        recognizer_id: &str,
        _spec: &RecognizerSpec,
    ) -> VoiceResult<OperationHandle> {
        self.state
            .lock()
            .unwrap()
            .created_recognizers
            .push(recognizer_id.to_string());
        if self.creation_race {
            return Err(VoiceError::AlreadyExists(recognizer_id.to_string()));
        }
        Ok(OperationHandle {
            name: format!("{}/operations/create-{}", parent, recognizer_id),
        })
    }

    async fn poll_recognizer_creation(
        &self,
        operation: &OperationHandle,
    ) -> VoiceResult<OperationPoll<RecognizerResource>> {
        Ok(OperationPoll::Done(RecognizerResource {
            name: operation.name.clone(),
            model: None,
            language_codes: Vec::new(),
        }))
    }

    async fn batch_recognize(
        &self,
        recognizer: &str,
        _spec: &RecognizerSpec,
        file_uri: &str,
    ) -> VoiceResult<OperationHandle> {
        let mut state = self.state.lock().unwrap();
        state.batch_requests += 1;
        state.recognized_with.push(recognizer.to_string());
        state.last_uri = Some(file_uri.to_string());
        Ok(OperationHandle {
            name: format!("operations/batch-{}", state.batch_requests),
        })
    }

    async fn poll_batch(
        &self,
        _operation: &OperationHandle,
    ) -> VoiceResult<OperationPoll<BatchRecognizeOutput>> {
        let uri = {
            let mut state = self.state.lock().unwrap();
            state.polls += 1;
            match self.polls_until_done {
                Some(n) if state.polls >= n => state.last_uri.clone().unwrap_or_default(),
                _ => return Ok(OperationPoll::Pending),
            }
        };
        Ok(OperationPoll::Done(self.output(&uri)))
    }
}
