//! Common error handling utilities for the scribe workspace
//!
//! Provides the process-level [`ScribeError`] used by the binaries and the
//! stable error codes that API error bodies carry. Pipeline failures are
//! coded by the stage that failed, see [`codes::pipeline::for_stage`].
//!
//! # Example
//!
//! ```rust
//! use error_common::{codes, ScribeError};
//!
//! let error = ScribeError::ConfigError("GOOGLE_PROJECT_ID is not set".into());
//! assert_eq!(error.code(), codes::system::CONFIGURATION);
//! assert_eq!(codes::pipeline::for_stage("upload"), Some(codes::pipeline::UPLOAD));
//! ```

pub mod codes;
pub mod types;

pub use types::*;
