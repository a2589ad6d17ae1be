/// Verification thresholds and fraud-risk weights.
///
/// These were fixed constants in earlier deployments with no recorded
/// tuning rationale, so they are configuration here; the defaults
/// reproduce the historical behavior.
#[derive(Debug, Clone, Copy)]
pub struct VerifyConfig {
    /// Minimum quality score to proceed past the quality gate.
    pub min_quality: f32,
    /// Best similarity must reach this for `threshold_met`.
    pub similarity_threshold: f32,
    /// Blended confidence must reach this for `confidence_met`.
    pub confidence_threshold: f32,
    /// Fraud risk at or above this vetoes the match.
    pub fraud_veto: f32,
    /// Confidence blend: weight of the best similarity.
    pub weight_similarity: f32,
    /// Confidence blend: weight of the consistency factor
    /// `1 - stddev(similarities)`.
    pub weight_consistency: f32,
    /// Multiplier applied when the best match is the primary voiceprint.
    pub primary_boost: f32,
    /// Fraud-risk contribution when confidence falls below
    /// `low_confidence_floor`.
    pub risk_low_confidence: f32,
    pub low_confidence_floor: f32,
    /// Fraud-risk contribution when quality falls below `min_quality`.
    pub risk_low_quality: f32,
    /// Fraud-risk contribution when spoofing was flagged.
    pub risk_spoof: f32,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            min_quality: 0.6,
            similarity_threshold: 0.6,
            confidence_threshold: 0.7,
            fraud_veto: 0.7,
            weight_similarity: 0.6,
            weight_consistency: 0.4,
            primary_boost: 1.1,
            risk_low_confidence: 0.3,
            low_confidence_floor: 0.5,
            risk_low_quality: 0.2,
            risk_spoof: 0.5,
        }
    }
}
