// Logger configuration
use serde::{Deserialize, Serialize};

use crate::preview::TextPreview;
use crate::redactor::{PiiRedactor, RedactionConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub redaction_enabled: bool,
    /// Replace matches with a short hash instead of a mask
    pub hash_for_correlation: bool,
    /// Length of transcript excerpts in log events
    pub preview_chars: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            redaction_enabled: true,
            hash_for_correlation: true,
            preview_chars: 120,
        }
    }
}

impl LoggerConfig {
    /// `LOG_REDACTION_ENABLED`, `LOG_REDACTION_HASH`, `LOG_PREVIEW_CHARS`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |name: &str, default: bool| {
            lookup(name)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(default)
        };

        Self {
            redaction_enabled: flag("LOG_REDACTION_ENABLED", defaults.redaction_enabled),
            hash_for_correlation: flag("LOG_REDACTION_HASH", defaults.hash_for_correlation),
            preview_chars: lookup("LOG_PREVIEW_CHARS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.preview_chars),
        }
    }

    pub fn redactor(&self) -> PiiRedactor {
        if !self.redaction_enabled {
            return PiiRedactor::new(RedactionConfig::disabled());
        }
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: self.hash_for_correlation,
            ..Default::default()
        })
    }

    pub fn previewer(&self) -> TextPreview {
        TextPreview::new(self.redactor(), self.preview_chars)
    }
}
