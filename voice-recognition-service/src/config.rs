use std::time::Duration;

use secrecy::SecretString;

use crate::error::{VoiceError, VoiceResult};
use crate::providers::google_auth::{GoogleCredentials, ServiceAccountKey};

const DEFAULT_SPEECH_LOCATION: &str = "us-central1";
const DEFAULT_BUCKET_REGION: &str = "US-CENTRAL1";
const DEFAULT_LLM_API_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_LLM_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_MAX_AUDIO_BYTES: usize = 100 * 1024 * 1024;

/// Bounded wait for a long-running remote operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Longest time a caller can be kept waiting
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(5000), 120)
    }
}

/// Google Cloud project, storage and speech settings
#[derive(Debug, Clone)]
pub struct GoogleCloudConfig {
    pub project_id: String,
    pub speech_location: String,
    pub audio_bucket: String,
    pub bucket_region: String,
    pub credentials: GoogleCredentials,
}

impl GoogleCloudConfig {
    /// `projects/{project}/locations/{location}`
    pub fn recognizer_parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, self.speech_location)
    }
}

/// Text-generation endpoint settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout: Duration,
}

/// Runtime configuration for the consultation pipeline
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub google: GoogleCloudConfig,
    pub llm: LlmConfig,
    pub poll: PollPolicy,
    pub max_audio_bytes: usize,
}

impl VoiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> VoiceResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> VoiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let parsed = |name: &str| var(name).and_then(|s| s.trim().parse::<u64>().ok());

        let project_id = var("GOOGLE_PROJECT_ID")
            .ok_or_else(|| VoiceError::Config("GOOGLE_PROJECT_ID is not set".to_string()))?;

        let credentials = if let Some(token) = var("GOOGLE_ACCESS_TOKEN") {
            GoogleCredentials::AccessToken(SecretString::new(token))
        } else if let Some(json) = var("GOOGLE_SERVICE_ACCOUNT_JSON") {
            GoogleCredentials::ServiceAccount(ServiceAccountKey::from_json(&json)?)
        } else if let Some(path) = var("GOOGLE_APPLICATION_CREDENTIALS") {
            let json = std::fs::read_to_string(&path).map_err(|e| {
                VoiceError::Config(format!("Cannot read credentials file {}: {}", path, e))
            })?;
            GoogleCredentials::ServiceAccount(ServiceAccountKey::from_json(&json)?)
        } else {
            return Err(VoiceError::Config(
                "No Google credentials: set GOOGLE_ACCESS_TOKEN, GOOGLE_SERVICE_ACCOUNT_JSON or GOOGLE_APPLICATION_CREDENTIALS"
                    .to_string(),
            ));
        };

        let google = GoogleCloudConfig {
            speech_location: var("GOOGLE_SPEECH_LOCATION")
                .unwrap_or_else(|| DEFAULT_SPEECH_LOCATION.to_string()),
            audio_bucket: var("SCRIBE_AUDIO_BUCKET")
                .unwrap_or_else(|| format!("{}-scribe-audio", project_id)),
            bucket_region: var("SCRIBE_BUCKET_REGION")
                .unwrap_or_else(|| DEFAULT_BUCKET_REGION.to_string()),
            project_id,
            credentials,
        };

        let llm = LlmConfig {
            api_url: var("LLM_API_URL").unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
            api_key: var("LLM_API_KEY")
                .or_else(|| var("GROQ_API_KEY"))
                .map(SecretString::new),
            model: var("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            timeout: Duration::from_secs(parsed("LLM_TIMEOUT_SECS").unwrap_or(60)),
        };

        let poll = PollPolicy::new(
            Duration::from_millis(parsed("SPEECH_POLL_INTERVAL_MS").unwrap_or(5000)),
            parsed("SPEECH_POLL_MAX_ATTEMPTS")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(120),
        );

        let max_audio_bytes = parsed("SCRIBE_MAX_AUDIO_BYTES")
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(DEFAULT_MAX_AUDIO_BYTES);

        Ok(Self {
            google,
            llm,
            poll,
            max_audio_bytes,
        })
    }
}
