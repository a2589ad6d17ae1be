//! Audio sample types and analyzer ports for voice biometrics.
//!
//! The engine and enrollment service never talk to ML models directly;
//! they go through the async trait ports defined here:
//!
//! - [`QualityAnalyzer`]: SNR / duration / quality scoring
//! - [`Transcriber`]: speech-to-text for challenge validation
//! - [`SpeakerEmbedder`]: audio -> fixed-length embedding vector
//! - [`SpoofDetector`]: liveness / replay / synthesis detection
//! - [`FaceEnrollmentLookup`]: face-biometric status for eligibility
//! - [`Notifier`]: approval and confirmation messages
//!
//! The [`mock`] module provides deterministic in-memory implementations
//! for tests and the `enrolltest` harness.

mod error;
pub mod mock;
mod ports;
mod types;

pub use error::AnalysisError;
pub use ports::{
    FaceEnrollmentLookup, Notifier, QualityAnalyzer, SpeakerEmbedder, SpoofDetector, Transcriber,
};
pub use types::{
    AudioClip, FraudIndicator, Notification, QualityReport, SpoofReport, SpoofType, UserAccount,
};
