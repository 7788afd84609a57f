//! Google Cloud Speech-to-Text v2 over REST.
//!
//! Recognizers are regional resources; every call goes to the regional
//! endpoint for the configured location. Batch jobs return inline results
//! through a long-running operation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{VoiceError, VoiceResult};
use crate::providers::google_auth::GoogleAuth;
use crate::providers::{
    error_for_status, BatchRecognizeOutput, FileRecognitionResult, OperationHandle, OperationPoll,
    RecognitionSegment, RecognizerResource, RecognizerSpec, SpeechBackend,
};

/// gRPC status codes surfaced inside operation errors
const STATUS_NOT_FOUND: i32 = 5;
const STATUS_ALREADY_EXISTS: i32 = 6;

const MIN_SPEAKERS: u32 = 2;
const MAX_SPEAKERS: u32 = 6;

pub struct GoogleSpeechBackend {
    client: reqwest::Client,
    auth: Arc<GoogleAuth>,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecognizerWire {
    name: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    language_codes: Vec<String>,
    #[serde(default)]
    default_recognition_config: Option<RecognitionConfigWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfigWire {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    language_codes: Vec<String>,
}

impl From<RecognizerWire> for RecognizerResource {
    fn from(wire: RecognizerWire) -> Self {
        let (model, language_codes) = match wire.default_recognition_config {
            Some(config) if !config.language_codes.is_empty() => (config.model, config.language_codes),
            _ => (wire.model, wire.language_codes),
        };
        RecognizerResource {
            name: wire.name,
            model,
            language_codes,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusWire {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

impl StatusWire {
    fn into_error(self, resource: &str) -> VoiceError {
        match self.code {
            STATUS_NOT_FOUND => VoiceError::NotFound(resource.to_string()),
            STATUS_ALREADY_EXISTS => VoiceError::AlreadyExists(resource.to_string()),
            code => VoiceError::Provider(format!("{} failed with status {}: {}", resource, code, self.message)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OperationWire {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<StatusWire>,
    #[serde(default)]
    response: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchRecognizeResponseWire {
    #[serde(default)]
    results: HashMap<String, BatchRecognizeFileResultWire>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchRecognizeFileResultWire {
    #[serde(default)]
    error: Option<StatusWire>,
    #[serde(default)]
    inline_result: Option<InlineResultWire>,
}

#[derive(Debug, Default, Deserialize)]
struct InlineResultWire {
    #[serde(default)]
    transcript: Option<TranscriptWire>,
}

#[derive(Debug, Default, Deserialize)]
struct TranscriptWire {
    #[serde(default)]
    results: Vec<RecognitionSegment>,
}

impl GoogleSpeechBackend {
    pub fn new(auth: Arc<GoogleAuth>, location: &str, timeout: Duration) -> VoiceResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let endpoint = if location == "global" {
            "https://speech.googleapis.com".to_string()
        } else {
            format!("https://{}-speech.googleapis.com", location)
        };

        Ok(Self {
            client,
            auth,
            endpoint,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn recognition_config(spec: &RecognizerSpec) -> Value {
        let mut features = json!({
            "enableWordTimeOffsets": true,
            "enableAutomaticPunctuation": true,
        });
        if spec.enable_diarization {
            features["diarizationConfig"] = json!({
                "minSpeakerCount": MIN_SPEAKERS,
                "maxSpeakerCount": MAX_SPEAKERS,
            });
        }

        json!({
            "autoDecodingConfig": {},
            "model": spec.model,
            "languageCodes": [spec.language_code],
            "features": features,
        })
    }

    async fn get_operation(&self, operation: &OperationHandle) -> VoiceResult<OperationWire> {
        let url = format!("{}/v2/{}", self.endpoint, operation.name);
        let token = self.auth.bearer_token().await?;
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let response = error_for_status(response, &format!("operation {}", operation.name)).await?;
        Ok(response.json().await?)
    }

    fn batch_output(response: BatchRecognizeResponseWire) -> VoiceResult<BatchRecognizeOutput> {
        let mut results_by_uri = HashMap::with_capacity(response.results.len());
        for (uri, file) in response.results {
            if let Some(status) = file.error.filter(|s| s.code != 0) {
                return Err(status.into_error(&format!("recognition of {}", uri)));
            }
            let segments = file
                .inline_result
                .and_then(|inline| inline.transcript)
                .map(|transcript| transcript.results)
                .unwrap_or_default();
            results_by_uri.insert(uri, FileRecognitionResult { segments });
        }
        Ok(BatchRecognizeOutput { results_by_uri })
    }
}

#[async_trait]
impl SpeechBackend for GoogleSpeechBackend {
    async fn get_recognizer(&self, name: &str) -> VoiceResult<RecognizerResource> {
        let url = format!("{}/v2/{}", self.endpoint, name);
        let token = self.auth.bearer_token().await?;

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let response = error_for_status(response, &format!("recognizer {}", name)).await?;
        let wire: RecognizerWire = response.json().await?;
        Ok(wire.into())
    }

    async fn create_recognizer(
        &self,
        parent: &str,
        recognizer_id: &str,
        spec: &RecognizerSpec,
    ) -> VoiceResult<OperationHandle> {
        let url = format!(
            "{}/v2/{}/recognizers?recognizerId={}",
            self.endpoint,
            parent,
            urlencoding::encode(recognizer_id)
        );
        let token = self.auth.bearer_token().await?;

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "defaultRecognitionConfig": Self::recognition_config(spec) }))
            .send()
            .await?;
        let response = error_for_status(response, &format!("recognizer {}/recognizers/{}", parent, recognizer_id)).await?;
        let operation: OperationWire = response.json().await?;

        debug!(recognizer = %recognizer_id, operation = %operation.name, "Recognizer creation submitted");
        Ok(OperationHandle { name: operation.name })
    }

    async fn poll_recognizer_creation(
        &self,
        operation: &OperationHandle,
    ) -> VoiceResult<OperationPoll<RecognizerResource>> {
        let wire = self.get_operation(operation).await?;
        if !wire.done {
            return Ok(OperationPoll::Pending);
        }
        if let Some(status) = wire.error {
            return Err(status.into_error(&format!("recognizer creation {}", wire.name)));
        }

        let response = wire
            .response
            .ok_or_else(|| VoiceError::Provider(format!("operation {} finished without a recognizer", wire.name)))?;
        let recognizer: RecognizerWire = serde_json::from_value(response)?;
        Ok(OperationPoll::Done(recognizer.into()))
    }

    async fn batch_recognize(
        &self,
        recognizer: &str,
        spec: &RecognizerSpec,
        file_uri: &str,
    ) -> VoiceResult<OperationHandle> {
        let url = format!("{}/v2/{}:batchRecognize", self.endpoint, recognizer);
        let token = self.auth.bearer_token().await?;

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({
                "config": Self::recognition_config(spec),
                "files": [{ "uri": file_uri }],
                "recognitionOutputConfig": { "inlineResponseConfig": {} },
            }))
            .send()
            .await?;
        let response = error_for_status(response, &format!("batch recognition on {}", recognizer)).await?;
        let operation: OperationWire = response.json().await?;

        debug!(recognizer = %recognizer, operation = %operation.name, "Batch recognition submitted");
        Ok(OperationHandle { name: operation.name })
    }

    async fn poll_batch(
        &self,
        operation: &OperationHandle,
    ) -> VoiceResult<OperationPoll<BatchRecognizeOutput>> {
        let wire = self.get_operation(operation).await?;
        if !wire.done {
            return Ok(OperationPoll::Pending);
        }
        if let Some(status) = wire.error {
            return Err(status.into_error(&format!("batch recognition {}", wire.name)));
        }

        let response = match wire.response {
            Some(value) => serde_json::from_value(value)?,
            None => BatchRecognizeResponseWire::default(),
        };
        Ok(OperationPoll::Done(Self::batch_output(response)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::to_millis;

    #[test]
    fn parses_inline_batch_response() {
        let body = json!({
            "@type": "type.googleapis.com/google.cloud.speech.v2.BatchRecognizeResponse",
            "results": {
                "gs://bucket/audio-1.webm": {
                    "inlineResult": {
                        "transcript": {
                            "results": [{
                                "alternatives": [
                                    {
                                        "transcript": "hello doctor",
                                        "words": [
                                            {"word": "hello", "startOffset": "0s", "endOffset": "0.400s", "speakerLabel": "1"},
                                            {"word": "doctor", "startOffset": {"seconds": "0", "nanos": 500000000}, "endOffset": "0.900s", "speakerLabel": "1"}
                                        ]
                                    },
                                    {"transcript": "hollow doctor"}
                                ]
                            }]
                        }
                    }
                }
            }
        });

        let wire: BatchRecognizeResponseWire = serde_json::from_value(body).unwrap();
        let output = GoogleSpeechBackend::batch_output(wire).unwrap();
        let file = &output.results_by_uri["gs://bucket/audio-1.webm"];
        let top = &file.segments[0].alternatives[0];

        assert_eq!(top.transcript, "hello doctor");
        assert_eq!(to_millis(top.words[1].start_offset.as_ref()), 500);
        assert_eq!(top.words[0].speaker_label.as_deref(), Some("1"));
    }

    #[test]
    fn per_file_error_becomes_provider_error() {
        let body = json!({
            "results": {
                "gs://bucket/a.wav": { "error": { "code": 3, "message": "bad encoding" } }
            }
        });

        let wire: BatchRecognizeResponseWire = serde_json::from_value(body).unwrap();
        let err = GoogleSpeechBackend::batch_output(wire).unwrap_err();
        assert!(matches!(err, VoiceError::Provider(msg) if msg.contains("bad encoding")));
    }

    #[test]
    fn operation_status_maps_already_exists() {
        let status = StatusWire {
            code: STATUS_ALREADY_EXISTS,
            message: "exists".into(),
        };
        assert!(status.into_error("recognizer").is_already_exists());
    }

    #[test]
    fn diarization_only_requested_when_supported() {
        let mut spec = RecognizerSpec {
            language_code: "ml-IN".into(),
            model: "chirp_2".into(),
            enable_diarization: false,
        };
        let config = GoogleSpeechBackend::recognition_config(&spec);
        assert!(config["features"].get("diarizationConfig").is_none());

        spec.enable_diarization = true;
        let config = GoogleSpeechBackend::recognition_config(&spec);
        assert_eq!(config["features"]["diarizationConfig"]["minSpeakerCount"], 2);
        assert_eq!(config["languageCodes"][0], "ml-IN");
    }
}
