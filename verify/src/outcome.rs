use serde::{Deserialize, Serialize};

use voxauth_analysis::{FraudIndicator, QualityReport, SpoofReport};
use voxauth_challenge::ChallengeOutcome;
use voxauth_store::VerifyResult;

/// Scores computed once the pipeline reaches voiceprint comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub best_similarity: f32,
    pub confidence: f32,
    pub fraud_risk: f32,
    pub threshold_met: bool,
    pub confidence_met: bool,
    /// Id of the best-matching stored voiceprint.
    pub matched_print_id: String,
    /// Whether that voiceprint is the user's primary.
    pub matched_primary: bool,
}

/// Terminal state of one verification attempt. Callers must handle
/// every variant; there is no catch-all dict to probe.
#[derive(Debug, Clone)]
pub enum VerificationOutcome {
    /// Genuine live match.
    Verified(MatchReport),
    /// Quality gate failed before any biometric comparison.
    RejectedLowQuality(QualityReport),
    /// The liveness detector flagged the clip.
    RejectedSpoof(SpoofReport),
    /// The spoken response did not satisfy the challenge (or came too
    /// late).
    RejectedChallenge(ChallengeOutcome),
    /// The claimed user has no active voiceprints on file.
    NoEnrolledVoiceprints,
    /// Comparison ran but the scores did not clear the thresholds.
    RejectedLowConfidence(MatchReport),
    /// Infrastructure failure; diagnostic only, never a match.
    Error {
        message: String,
        indicator: FraudIndicator,
    },
}

impl VerificationOutcome {
    pub fn verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    /// Audit-row result column for this outcome.
    pub fn result(&self) -> VerifyResult {
        match self {
            Self::Verified(_) => VerifyResult::Accepted,
            Self::Error { .. } => VerifyResult::Error,
            _ => VerifyResult::Rejected,
        }
    }

    /// Fraud indicators this outcome contributes to the audit row.
    pub fn fraud_indicators(&self) -> Vec<FraudIndicator> {
        match self {
            Self::Verified(_) => Vec::new(),
            Self::RejectedLowQuality(_) => vec![FraudIndicator::LowAudioQuality],
            Self::RejectedSpoof(report) => {
                if report.fraud_indicators.is_empty() {
                    vec![FraudIndicator::PlaybackDetected]
                } else {
                    report.fraud_indicators.clone()
                }
            }
            Self::RejectedChallenge(outcome) => outcome
                .fraud_indicator()
                .map(|i| vec![i])
                .unwrap_or_default(),
            Self::NoEnrolledVoiceprints => vec![FraudIndicator::NoRegisteredVoiceprints],
            Self::RejectedLowConfidence(_) => vec![FraudIndicator::LowConfidence],
            Self::Error { indicator, .. } => vec![*indicator],
        }
    }

    /// The match report, when scoring ran.
    pub fn report(&self) -> Option<&MatchReport> {
        match self {
            Self::Verified(r) | Self::RejectedLowConfidence(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_mapping() {
        let report = MatchReport {
            best_similarity: 0.9,
            confidence: 0.9,
            fraud_risk: 0.0,
            threshold_met: true,
            confidence_met: true,
            matched_print_id: "a".into(),
            matched_primary: true,
        };
        assert_eq!(
            VerificationOutcome::Verified(report.clone()).result(),
            VerifyResult::Accepted
        );
        assert_eq!(
            VerificationOutcome::RejectedLowConfidence(report).result(),
            VerifyResult::Rejected
        );
        let err = VerificationOutcome::Error {
            message: "x".into(),
            indicator: FraudIndicator::VerificationError,
        };
        assert_eq!(err.result(), VerifyResult::Error);
        assert_eq!(err.fraud_indicators(), vec![FraudIndicator::VerificationError]);
    }

    #[test]
    fn no_voiceprints_indicator() {
        let out = VerificationOutcome::NoEnrolledVoiceprints;
        assert_eq!(
            out.fraud_indicators(),
            vec![FraudIndicator::NoRegisteredVoiceprints]
        );
        assert!(!out.verified());
    }
}
