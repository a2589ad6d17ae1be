use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use voxauth_challenge::Challenge;

use crate::error::EnrollError;

/// Enrollment session lifecycle. Transitions are checked; anything
/// else is an [`EnrollError::InvalidState`].
///
/// ```text
/// Created -> Collecting -> ConsistencyCheck -> PendingApproval -> Approved
///                 |                |                  |             |
///                 +----------------+------------------+-------------+--> Rejected
/// any state --(expiry, lazy)--> Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Created,
    Collecting,
    ConsistencyCheck,
    PendingApproval,
    Approved,
    Rejected,
    Expired,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Collecting => "COLLECTING",
            Self::ConsistencyCheck => "CONSISTENCY_CHECK",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// One accepted sample: the working bundle that survives into the
/// session. Raw audio is discarded; only the hash, the embedding and
/// the quality numbers remain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedSample {
    pub content_hash: String,
    pub embedding: Vec<f32>,
    pub quality_score: f32,
    pub snr_db: f32,
    pub duration_seconds: f32,
    pub challenge_kind: String,
}

/// Deterministic, time-salted session id: SHA-256 of
/// `"{user_id}:{timestamp_ms}"`, truncated to 16 hex chars.
pub fn session_id_for(user_id: &str, timestamp_ms: i64) -> String {
    let mut h = Sha256::new();
    h.update(format!("{user_id}:{timestamp_ms}"));
    hex::encode(h.finalize())[..16].to_string()
}

/// Cache-persisted enrollment session. Created after eligibility
/// passes; destroyed on completion, rejection or timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentSession {
    pub session_id: String,
    pub user_id: String,
    pub state: SessionState,
    pub challenges: Vec<Challenge>,
    pub samples: Vec<CollectedSample>,
    pub required_samples: usize,
    /// Set by voiceprint generation (phase 3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency_score: Option<f32>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EnrollmentSession {
    pub fn new(
        user_id: &str,
        challenges: Vec<Challenge>,
        required_samples: usize,
        timeout_secs: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id_for(user_id, now.timestamp_millis()),
            user_id: user_id.to_string(),
            state: SessionState::Created,
            challenges,
            samples: Vec::new(),
            required_samples,
            consistency_score: None,
            created_at: now,
            expires_at: now + Duration::seconds(timeout_secs as i64),
        }
    }

    pub fn samples_collected(&self) -> usize {
        self.samples.len()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    fn require_state(&self, expected: SessionState) -> Result<(), EnrollError> {
        if self.state != expected {
            return Err(EnrollError::InvalidState(format!(
                "session {} is {}, expected {}",
                self.session_id, self.state, expected
            )));
        }
        Ok(())
    }

    pub fn begin_collecting(&mut self) -> Result<(), EnrollError> {
        self.require_state(SessionState::Created)?;
        self.state = SessionState::Collecting;
        Ok(())
    }

    /// Record an accepted sample. Returns `false` without recording
    /// when the same audio hash was already collected, so duplicates
    /// never double-count.
    pub fn record_sample(&mut self, sample: CollectedSample) -> Result<bool, EnrollError> {
        self.require_state(SessionState::Collecting)?;
        if self
            .samples
            .iter()
            .any(|s| s.content_hash == sample.content_hash)
        {
            return Ok(false);
        }
        self.samples.push(sample);
        Ok(true)
    }

    pub fn pass_consistency(&mut self, score: f32) -> Result<(), EnrollError> {
        self.require_state(SessionState::Collecting)?;
        self.consistency_score = Some(score);
        self.state = SessionState::ConsistencyCheck;
        Ok(())
    }

    pub fn submit_for_approval(&mut self) -> Result<(), EnrollError> {
        self.require_state(SessionState::ConsistencyCheck)?;
        self.state = SessionState::PendingApproval;
        Ok(())
    }

    pub fn approve(&mut self) -> Result<(), EnrollError> {
        self.require_state(SessionState::PendingApproval)?;
        self.state = SessionState::Approved;
        Ok(())
    }

    /// Terminal rejection; allowed from every non-terminal state.
    pub fn reject(&mut self) -> Result<(), EnrollError> {
        match self.state {
            SessionState::Approved | SessionState::Rejected | SessionState::Expired => {
                Err(EnrollError::InvalidState(format!(
                    "session {} is already terminal ({})",
                    self.session_id, self.state
                )))
            }
            _ => {
                self.state = SessionState::Rejected;
                Ok(())
            }
        }
    }

    pub fn expire(&mut self) {
        self.state = SessionState::Expired;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> EnrollmentSession {
        EnrollmentSession::new("u1", Vec::new(), 5, 3600, Utc::now())
    }

    fn sample(hash: &str) -> CollectedSample {
        CollectedSample {
            content_hash: hash.to_string(),
            embedding: vec![1.0, 0.0],
            quality_score: 0.9,
            snr_db: 25.0,
            duration_seconds: 5.0,
            challenge_kind: "temporal".to_string(),
        }
    }

    #[test]
    fn session_id_is_16_hex_and_time_salted() {
        let a = session_id_for("u1", 1_700_000_000_000);
        let b = session_id_for("u1", 1_700_000_000_001);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b, "different timestamps must salt differently");
        assert_eq!(a, session_id_for("u1", 1_700_000_000_000), "deterministic");
    }

    #[test]
    fn happy_path_transitions() {
        let mut s = session();
        s.begin_collecting().unwrap();
        assert!(s.record_sample(sample("h1")).unwrap());
        s.pass_consistency(0.92).unwrap();
        s.submit_for_approval().unwrap();
        s.approve().unwrap();
        assert_eq!(s.state, SessionState::Approved);
    }

    #[test]
    fn duplicate_hash_does_not_double_count() {
        let mut s = session();
        s.begin_collecting().unwrap();
        assert!(s.record_sample(sample("h1")).unwrap());
        assert!(!s.record_sample(sample("h1")).unwrap());
        assert_eq!(s.samples_collected(), 1);
    }

    #[test]
    fn skipping_phases_is_rejected() {
        let mut s = session();
        assert!(s.approve().is_err(), "cannot approve a Created session");
        assert!(s.submit_for_approval().is_err());
        s.begin_collecting().unwrap();
        assert!(s.approve().is_err(), "cannot approve while collecting");
    }

    #[test]
    fn reject_is_terminal() {
        let mut s = session();
        s.begin_collecting().unwrap();
        s.reject().unwrap();
        assert_eq!(s.state, SessionState::Rejected);
        assert!(s.reject().is_err());
        assert!(s.record_sample(sample("h1")).is_err());
    }

    #[test]
    fn expiry_is_lazy_timestamp_comparison() {
        let s = session();
        assert!(!s.is_expired(s.expires_at));
        assert!(s.is_expired(s.expires_at + Duration::seconds(1)));
    }
}
