use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voxauth_analysis::FraudIndicator;

use crate::error::StoreError;

/// A stored voiceprint: an L2-normalized embedding plus quality
/// metadata. Immutable after creation except for the usage counters
/// and the `active` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceprintRecord {
    pub id: String,
    pub user_id: String,
    pub embedding: Vec<f32>,
    pub snr_db: f32,
    pub duration_seconds: f32,
    pub quality_score: f32,
    /// Identifier of the extraction model that produced the embedding.
    pub model: String,
    pub validated: bool,
    /// Exactly one voiceprint per user is primary.
    pub is_primary: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub use_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl VoiceprintRecord {
    /// Age-based retirement check for forced re-enrollment.
    pub fn is_stale(&self, max_age_days: i64, now: DateTime<Utc>) -> bool {
        now - self.created_at > chrono::Duration::days(max_age_days)
    }
}

/// Terminal result of a verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifyResult {
    Accepted,
    Rejected,
    Error,
}

impl std::fmt::Display for VerifyResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted => f.write_str("ACCEPTED"),
            Self::Rejected => f.write_str("REJECTED"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

/// Append-only audit row for one verification attempt. Every call to
/// the engine writes exactly one of these, whatever the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationLog {
    pub user_id: String,
    pub result: VerifyResult,
    pub best_similarity: f32,
    pub confidence: f32,
    pub fraud_risk: f32,
    pub quality_score: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fraud_indicators: Vec<FraudIndicator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance_record_id: Option<String>,
    pub processing_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit row for one enrollment lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentAudit {
    pub user_id: String,
    pub session_id: String,
    /// "COMPLETED", "REJECTED", "EXPIRED"...
    pub outcome: String,
    pub sample_count: usize,
    pub consistency_score: f32,
    pub avg_quality: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fraud_indicators: Vec<FraudIndicator>,
    pub created_at: DateTime<Utc>,
}

/// Administrator-managed enrollment gate configuration. Read-only at
/// request time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentPolicy {
    pub require_approval: bool,
    pub min_samples: usize,
    pub max_samples: usize,
    /// Minimum per-sample quality score in [0, 1].
    pub min_quality: f32,
    pub min_snr_db: f32,
    pub min_duration_seconds: f32,
    pub max_duration_seconds: f32,
    /// Minimum consistency (mean pairwise similarity) for voiceprint
    /// generation.
    pub min_consistency: f32,
    /// Days before a voiceprint may be replaced by re-enrollment.
    pub reenroll_interval_days: i64,
    /// Face enrollment must be validated within this many days.
    pub face_recency_days: i64,
    pub session_timeout_secs: u64,
    pub approval_timeout_secs: u64,
    pub device_trust_threshold: f32,
    pub require_trusted_location: bool,
}

impl Default for EnrollmentPolicy {
    fn default() -> Self {
        Self {
            require_approval: true,
            min_samples: 5,
            max_samples: 8,
            min_quality: 0.7,
            min_snr_db: 20.0,
            min_duration_seconds: 3.0,
            max_duration_seconds: 15.0,
            min_consistency: 0.85,
            reenroll_interval_days: 365,
            face_recency_days: 365,
            session_timeout_secs: 3600,
            approval_timeout_secs: 86_400,
            device_trust_threshold: 0.5,
            require_trusted_location: false,
        }
    }
}

impl EnrollmentPolicy {
    /// Enforced on save: sample bounds ordered, scores within [0, 1],
    /// duration window ordered.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.min_samples == 0 || self.min_samples > self.max_samples {
            return Err(StoreError::InvalidPolicy(format!(
                "sample bounds: min {} must be in 1..=max {}",
                self.min_samples, self.max_samples
            )));
        }
        if !(0.0..=1.0).contains(&self.min_quality) {
            return Err(StoreError::InvalidPolicy(format!(
                "min_quality {} outside [0, 1]",
                self.min_quality
            )));
        }
        if !(0.0..=1.0).contains(&self.min_consistency) {
            return Err(StoreError::InvalidPolicy(format!(
                "min_consistency {} outside [0, 1]",
                self.min_consistency
            )));
        }
        if self.min_duration_seconds <= 0.0
            || self.min_duration_seconds >= self.max_duration_seconds
        {
            return Err(StoreError::InvalidPolicy(format!(
                "duration window: {}..{}",
                self.min_duration_seconds, self.max_duration_seconds
            )));
        }
        Ok(())
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    rmp_serde::to_vec_named(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

pub(crate) fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, StoreError> {
    rmp_serde::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

static LAST_NANO: AtomicI64 = AtomicI64::new(0);

/// A monotonically increasing Unix nanosecond timestamp, so audit keys
/// written in the same instant never collide.
pub fn now_nanos() -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos() as i64;
    loop {
        let old = LAST_NANO.load(Ordering::Relaxed);
        let next = if now > old { now } else { old + 1 };
        if LAST_NANO
            .compare_exchange_weak(old, next, Ordering::Release, Ordering::Relaxed)
            .is_ok()
        {
            return next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        EnrollmentPolicy::default().validate().unwrap();
    }

    #[test]
    fn policy_rejects_inverted_sample_bounds() {
        let mut p = EnrollmentPolicy::default();
        p.min_samples = 9;
        p.max_samples = 5;
        assert!(p.validate().is_err());
    }

    #[test]
    fn policy_rejects_out_of_range_quality() {
        let mut p = EnrollmentPolicy::default();
        p.min_quality = 1.2;
        assert!(p.validate().is_err());
        p.min_quality = -0.1;
        assert!(p.validate().is_err());
    }

    #[test]
    fn voiceprint_roundtrips_msgpack() {
        let vp = VoiceprintRecord {
            id: "a".into(),
            user_id: "u".into(),
            embedding: vec![0.6, 0.8],
            snr_db: 25.0,
            duration_seconds: 5.0,
            quality_score: 0.9,
            model: "mock-embedder-v1".into(),
            validated: true,
            is_primary: true,
            active: true,
            created_at: Utc::now(),
            use_count: 0,
            last_used_at: None,
        };
        let got: VoiceprintRecord = decode(&encode(&vp).unwrap()).unwrap();
        assert_eq!(got.id, "a");
        assert_eq!(got.embedding, vec![0.6, 0.8]);
        assert!(got.is_primary);
    }

    #[test]
    fn staleness_by_age() {
        let now = Utc::now();
        let vp = VoiceprintRecord {
            id: "a".into(),
            user_id: "u".into(),
            embedding: vec![1.0],
            snr_db: 25.0,
            duration_seconds: 5.0,
            quality_score: 0.9,
            model: "m".into(),
            validated: true,
            is_primary: false,
            active: true,
            created_at: now - chrono::Duration::days(400),
            use_count: 0,
            last_used_at: None,
        };
        assert!(vp.is_stale(365, now));
        assert!(!vp.is_stale(500, now));
    }

    #[test]
    fn now_nanos_is_monotonic() {
        let a = now_nanos();
        let b = now_nanos();
        assert!(b > a);
    }
}
