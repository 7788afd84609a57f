use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use logger_redacted::LoggerConfig;
use voice_recognition_service::{ConsultationProcessor, VoiceConfig, VoiceResult};

/// Multipart framing on top of the raw audio size limit
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
];

/// Main scribe server state
#[derive(Clone)]
pub struct ScribeServer {
    /// Server configuration
    pub config: ServerConfig,
    /// Consultation pipeline shared by all handlers
    pub processor: Arc<ConsultationProcessor>,
    started_at: Instant,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server name
    pub name: String,
    /// Request body limit for audio uploads
    pub max_upload_bytes: usize,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Backend description reported by the health check
    pub backends: BTreeMap<String, String>,
}

impl ServerConfig {
    pub fn from_voice_config(voice: &VoiceConfig) -> Self {
        let mut backends = BTreeMap::new();
        backends.insert(
            "speech".to_string(),
            format!("google-speech-v2 ({})", voice.google.speech_location),
        );
        backends.insert("storage".to_string(), format!("gcs ({})", voice.google.audio_bucket));
        backends.insert("text_generation".to_string(), voice.llm.model.clone());

        Self {
            name: "Scribe".to_string(),
            max_upload_bytes: voice.max_audio_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
            cors_origins: cors_origins_from_env(),
            backends,
        }
    }
}

/// `SCRIBE_CORS_ORIGINS`, comma separated
fn cors_origins_from_env() -> Vec<String> {
    match std::env::var("SCRIBE_CORS_ORIGINS") {
        Ok(value) if !value.trim().is_empty() => value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
    }
}

impl ScribeServer {
    pub fn new(processor: Arc<ConsultationProcessor>, config: ServerConfig) -> Self {
        Self {
            config,
            processor,
            started_at: Instant::now(),
        }
    }

    /// Build the production clients from configuration
    pub fn from_config(voice: &VoiceConfig, logging: &LoggerConfig) -> VoiceResult<Self> {
        let processor = ConsultationProcessor::from_config(voice)?.with_log_preview(logging.previewer());
        Ok(Self::new(Arc::new(processor), ServerConfig::from_voice_config(voice)))
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
