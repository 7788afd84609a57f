//! HIPAA-oriented log redaction for the scribe services.
//!
//! Consultation audio turns into free text that routinely contains names,
//! phone numbers and record numbers. This crate keeps that text out of the
//! log sink:
//!
//! - [`PiiRedactor`] masks (or hashes, for correlation) emails, phone
//!   numbers, SSNs, card numbers, IP addresses and medical record numbers
//! - [`RedactingMakeWriter`] plugs the redactor into `tracing-subscriber`,
//!   so every formatted event is scrubbed before it is written
//! - [`TextPreview`] produces the short transcript excerpts that services
//!   log instead of full text, honouring the same [`LoggerConfig`]
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::{LoggerConfig, RedactingMakeWriter};
//!
//! let config = LoggerConfig::default();
//! let subscriber = tracing_subscriber::fmt()
//!     .with_writer(RedactingMakeWriter::new(std::io::stdout, config.redactor()))
//!     .finish();
//! # drop(subscriber);
//! ```

pub mod config;
pub mod preview;
pub mod redactor;
pub mod writer;

pub use config::*;
pub use preview::*;
pub use redactor::*;
pub use writer::*;
