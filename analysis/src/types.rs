use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single audio submission. The raw bytes live only for the duration
/// of one enrollment or verification call and are never persisted.
#[derive(Debug, Clone)]
pub struct AudioClip {
    data: Vec<u8>,
}

impl AudioClip {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// SHA-256 of the raw bytes as lowercase hex. Used to deduplicate
    /// resubmitted samples within one enrollment session.
    pub fn content_hash(&self) -> String {
        let mut h = Sha256::new();
        h.update(&self.data);
        hex::encode(h.finalize())
    }
}

/// Output of the audio quality analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Overall quality in [0, 1].
    pub quality_score: f32,
    /// Signal-to-noise ratio in decibels.
    pub snr_db: f32,
    /// Clip duration in seconds.
    pub duration_seconds: f32,
    /// Human-readable findings ("clipping", "background noise", ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// Spoofing technique identified by the liveness detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpoofType {
    /// Replay of a recording through a speaker.
    Playback,
    /// Fully synthetic (TTS) voice.
    Synthesis,
    /// Voice-conversion attack on a genuine recording.
    Conversion,
}

impl std::fmt::Display for SpoofType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Playback => f.write_str("playback"),
            Self::Synthesis => f.write_str("synthesis"),
            Self::Conversion => f.write_str("conversion"),
        }
    }
}

/// Output of the anti-spoofing detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpoofReport {
    pub spoof_detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spoof_type: Option<SpoofType>,
    /// Liveness confidence in [0, 1]; higher means more likely live.
    pub liveness_score: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fraud_indicators: Vec<FraudIndicator>,
}

impl SpoofReport {
    /// A clean report for callers that run with anti-spoofing disabled.
    pub fn clean() -> Self {
        Self {
            spoof_detected: false,
            spoof_type: None,
            liveness_score: 1.0,
            fraud_indicators: Vec::new(),
        }
    }
}

/// Fraud signals attached to audit rows. Each verification or
/// enrollment rejection names the signal that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FraudIndicator {
    LowAudioQuality,
    ResponseTooSlow,
    ValidationError,
    ChallengeMismatch,
    NoRegisteredVoiceprints,
    EmbeddingExtractionFailed,
    PlaybackDetected,
    SyntheticVoice,
    LowConfidence,
    InconsistentSamples,
    VerificationError,
}

impl std::fmt::Display for FraudIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::LowAudioQuality => "low_audio_quality",
            Self::ResponseTooSlow => "response_too_slow",
            Self::ValidationError => "validation_error",
            Self::ChallengeMismatch => "challenge_mismatch",
            Self::NoRegisteredVoiceprints => "no_registered_voiceprints",
            Self::EmbeddingExtractionFailed => "embedding_extraction_failed",
            Self::PlaybackDetected => "playback_detected",
            Self::SyntheticVoice => "synthetic_voice",
            Self::LowConfidence => "low_confidence",
            Self::InconsistentSamples => "inconsistent_samples",
            Self::VerificationError => "verification_error",
        };
        f.write_str(s)
    }
}

/// Directory record for the person being enrolled or verified.
/// Supplied by the caller; the core never queries a user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub active: bool,
    pub verified: bool,
    pub voice_auth_enabled: bool,
    /// Reporting manager's address for approval routing. When absent,
    /// approvals fall back to the HR queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_email: Option<String>,
}

/// An outbound message (approval request, enrollment confirmation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable_hex() {
        let a = AudioClip::new(vec![1, 2, 3]);
        let b = AudioClip::new(vec![1, 2, 3]);
        assert_eq!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash().len(), 64);
    }

    #[test]
    fn content_hash_differs_per_clip() {
        let a = AudioClip::new(vec![1, 2, 3]);
        let b = AudioClip::new(vec![1, 2, 4]);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn fraud_indicator_display() {
        assert_eq!(FraudIndicator::ResponseTooSlow.to_string(), "response_too_slow");
        assert_eq!(FraudIndicator::PlaybackDetected.to_string(), "playback_detected");
    }

    #[test]
    fn clean_spoof_report() {
        let r = SpoofReport::clean();
        assert!(!r.spoof_detected);
        assert_eq!(r.liveness_score, 1.0);
    }
}
