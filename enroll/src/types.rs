use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What eligibility verified, returned on success for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub user_id: String,
    pub face_validated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_voice_enrollment_at: Option<DateTime<Utc>>,
}

/// Result of one accepted sample submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleOutcome {
    pub session_id: String,
    /// True when this clip's hash was already collected; the sample was
    /// accepted earlier and did not count again.
    pub duplicate: bool,
    pub samples_collected: usize,
    pub required_samples: usize,
    /// All required samples are in; voiceprint generation may run.
    pub collection_complete: bool,
}

/// Output of the consistency-gated voiceprint generation phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceprintDraft {
    pub session_id: String,
    /// L2-normalized mean of the accepted embeddings.
    pub voiceprint: Vec<f32>,
    /// Mean pairwise cosine similarity of the sample set.
    pub consistency_score: f32,
    pub sample_count: usize,
    pub avg_quality: f32,
}

/// A time-boxed human approval checkpoint. Addressed to the reporting
/// manager, or the HR queue when no manager is on file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub approver: String,
    pub requested_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub sample_count: usize,
    pub consistency_score: f32,
    pub avg_quality: f32,
    /// Set when policy waives human review for this scope.
    pub auto_approved: bool,
}

/// Supervisor decision fed into finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalDecision {
    Approved,
    Rejected,
    Expired,
}

/// Terminal result of the enrollment workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeResult {
    pub success: bool,
    /// "COMPLETED", "REJECTED" or "EXPIRED".
    pub status: String,
    /// Ids of the persisted voiceprints (empty unless completed).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub voiceprint_ids: Vec<String>,
}
