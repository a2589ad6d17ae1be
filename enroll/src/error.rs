use thiserror::Error;

use voxauth_analysis::{AnalysisError, FraudIndicator};
use voxauth_store::StoreError;

/// Enrollment failure taxonomy.
///
/// `Ineligible` and `Security` are expected, user-facing conditions:
/// the caller presents the reasons and the user retries once the
/// prerequisite is met or with a fresh genuine sample. The rest are
/// session misuse or infrastructure failures.
#[derive(Debug, Error)]
pub enum EnrollError {
    /// The user does not currently qualify to enroll. Every failing
    /// check is listed; none are short-circuited.
    #[error("not eligible for enrollment: {}", reasons.join("; "))]
    Ineligible { reasons: Vec<String> },

    /// A sample or the aggregate sample set failed an integrity check.
    /// Never downgraded to a pass; the caller retries with a new
    /// genuine sample.
    #[error("security check failed: {reason}")]
    Security {
        reason: String,
        indicator: FraudIndicator,
    },

    #[error("enrollment session not found: {0}")]
    SessionNotFound(String),

    #[error("enrollment session expired: {0}")]
    SessionExpired(String),

    #[error("invalid session state: {0}")]
    InvalidState(String),

    /// Embedding extraction failed; infrastructure, not the user.
    #[error("embedding extraction failed: {0}")]
    Extraction(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),
}
