//! Consultation transcription and clinical note generation for the EMR.
//!
//! A recorded doctor/patient consultation goes through:
//!
//! 1. **Language selection** - English, Malayalam, Hindi or Arabic, each with
//!    its own speech model and diarization strategy
//! 2. **Batch transcription** - the audio is staged in Cloud Storage and
//!    recognized with a long-running Speech-to-Text v2 job
//! 3. **Diarization** - native speaker tags where the model supports them,
//!    text-generation based turn splitting otherwise
//! 4. **Clinical notes** - a SOAP note and short insights, both best-effort
//!
//! Translation, question answering and prescription drafting are exposed on
//! the same [`ConsultationProcessor`]. Text from uploaded patient documents
//! (PDF, DOCX, plain text) is available through [`documents::extract_text`].
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use voice_recognition_service::{AudioInput, ConsultationProcessor, VoiceConfig};
//!
//! # async fn example(audio: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = VoiceConfig::from_env()?;
//! let processor = ConsultationProcessor::from_config(&config)?;
//!
//! let outcome = processor
//!     .process(&AudioInput::new(audio, "audio/webm"), "Malayalam")
//!     .await?;
//!
//! println!("{}", outcome.soap_note.assessment);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod diarization;
pub mod documents;
pub mod error;
pub mod generation;
pub mod language;
pub mod notes;
pub mod providers;
pub mod service;
pub mod timing;
pub mod transcription;

#[cfg(test)]
mod testing;

pub use batch::{BatchSettings, BatchTranscriptionRunner};
pub use config::*;
pub use documents::{DocumentInput, DocumentKind};
pub use error::*;
pub use language::*;
pub use notes::{PatientContext, Prescription, SoapNote};
pub use service::*;
pub use transcription::*;
