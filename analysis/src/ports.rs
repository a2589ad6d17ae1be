use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AnalysisError;
use crate::types::{AudioClip, Notification, QualityReport, SpoofReport};

/// Scores the signal quality of an audio clip.
#[async_trait]
pub trait QualityAnalyzer: Send + Sync {
    async fn assess(&self, clip: &AudioClip) -> Result<QualityReport, AnalysisError>;
}

/// Speech-to-text for challenge-response validation.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, AnalysisError>;
}

/// Extracts a fixed-length speaker embedding from an audio clip.
#[async_trait]
pub trait SpeakerEmbedder: Send + Sync {
    async fn extract(&self, clip: &AudioClip) -> Result<Vec<f32>, AnalysisError>;

    /// Identifier of the underlying model, recorded on stored voiceprints.
    fn model_id(&self) -> &str;
}

/// Replay / synthesis / conversion detection.
#[async_trait]
pub trait SpoofDetector: Send + Sync {
    async fn detect(&self, clip: &AudioClip) -> Result<SpoofReport, AnalysisError>;
}

/// Face-biometric enrollment status, consumed by the voice eligibility
/// check. Returns the timestamp of the most recent *validated* face
/// embedding, or `None` when the user has no face enrollment.
#[async_trait]
pub trait FaceEnrollmentLookup: Send + Sync {
    async fn latest_validated(
        &self,
        user_id: &str,
    ) -> Result<Option<DateTime<Utc>>, AnalysisError>;
}

/// Outbound messaging for approval requests and confirmations.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: Notification) -> Result<(), AnalysisError>;
}
