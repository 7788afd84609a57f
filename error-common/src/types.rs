use thiserror::Error;

use crate::codes::system;

/// Process-level errors for the scribe binaries
#[derive(Error, Debug)]
pub enum ScribeError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failure while wiring up clients at startup
    #[error("Startup error: {0}")]
    StartupError(String),

    /// Network communication errors
    #[error("Network error: {0}")]
    NetworkError(String),

    /// HTTP server errors
    #[error("Server error: {0}")]
    ServerError(String),
}

impl ScribeError {
    pub fn code(&self) -> &'static str {
        match self {
            ScribeError::ConfigError(_) => system::CONFIGURATION,
            ScribeError::StartupError(_) | ScribeError::NetworkError(_) => system::STARTUP,
            ScribeError::ServerError(_) => system::INTERNAL,
        }
    }
}

/// Result type alias for scribe operations
pub type Result<T> = std::result::Result<T, ScribeError>;

/// Log an error with its code and the context it occurred in
pub fn log_error(context: &str, error: &ScribeError) {
    tracing::error!(
        context = context,
        error_code = error.code(),
        error = %error,
        "Scribe error occurred"
    );
}
