use voxauth_simvec::stddev;

use crate::config::VerifyConfig;

/// Blend similarity scores into a single confidence value in [0, 1].
///
/// Two signals: the best similarity, and a consistency factor
/// `1 - stddev(all similarities)` that rewards a clip matching all of a
/// user's voiceprints about equally (an impostor tends to match one
/// print by chance and miss the rest). A match against the primary
/// voiceprint earns a small boost.
pub fn confidence_score(similarities: &[f32], best_is_primary: bool, cfg: &VerifyConfig) -> f32 {
    let best = similarities.iter().copied().fold(0.0f32, f32::max);
    let consistency = (1.0 - stddev(similarities)).clamp(0.0, 1.0);

    let mut confidence = cfg.weight_similarity * best + cfg.weight_consistency * consistency;
    if best_is_primary {
        confidence *= cfg.primary_boost;
    }
    confidence.clamp(0.0, 1.0)
}

/// Additive fraud-risk aggregation, clamped to [0, 1].
pub fn fraud_risk(confidence: f32, quality: f32, spoof_flagged: bool, cfg: &VerifyConfig) -> f32 {
    let mut risk = 0.0f32;
    if confidence < cfg.low_confidence_floor {
        risk += cfg.risk_low_confidence;
    }
    if quality < cfg.min_quality {
        risk += cfg.risk_low_quality;
    }
    if spoof_flagged {
        risk += cfg.risk_spoof;
    }
    risk.min(1.0)
}

/// The final decision is strictly conjunctive: similarity threshold,
/// confidence threshold, fraud-risk veto and spoof veto must all pass.
/// Spoof detection vetoes regardless of every other factor.
pub fn decide(
    threshold_met: bool,
    confidence_met: bool,
    fraud_risk: f32,
    spoof_detected: bool,
    cfg: &VerifyConfig,
) -> bool {
    threshold_met && confidence_met && fraud_risk < cfg.fraud_veto && !spoof_detected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_match_against_single_print() {
        let cfg = VerifyConfig::default();
        // One print, similarity 1.0: stddev is 0, consistency 1.0.
        let c = confidence_score(&[1.0], false, &cfg);
        assert!((c - 1.0).abs() < 1e-6, "got {c}");
    }

    #[test]
    fn primary_boost_applies_and_clamps() {
        let cfg = VerifyConfig::default();
        let plain = confidence_score(&[0.8], false, &cfg);
        let boosted = confidence_score(&[0.8], true, &cfg);
        assert!(boosted > plain);
        assert!(boosted <= 1.0);

        // Boost never pushes past 1.0.
        assert!(confidence_score(&[1.0], true, &cfg) <= 1.0);
    }

    #[test]
    fn spread_similarities_lower_confidence() {
        let cfg = VerifyConfig::default();
        let tight = confidence_score(&[0.8, 0.8, 0.8], false, &cfg);
        let spread = confidence_score(&[0.8, 0.2, 0.5], false, &cfg);
        assert!(spread < tight, "{spread} !< {tight}");
    }

    #[test]
    fn fraud_risk_weights_add_and_clamp() {
        let cfg = VerifyConfig::default();
        assert_eq!(fraud_risk(0.9, 0.9, false, &cfg), 0.0);
        assert!((fraud_risk(0.4, 0.9, false, &cfg) - 0.3).abs() < 1e-6);
        assert!((fraud_risk(0.9, 0.5, false, &cfg) - 0.2).abs() < 1e-6);
        assert!((fraud_risk(0.9, 0.9, true, &cfg) - 0.5).abs() < 1e-6);
        // All three: 0.3 + 0.2 + 0.5 = 1.0, clamped.
        assert_eq!(fraud_risk(0.4, 0.5, true, &cfg), 1.0);
    }

    #[test]
    fn decision_is_conjunctive_spoof_vetoes() {
        let cfg = VerifyConfig::default();
        assert!(decide(true, true, 0.5, false, &cfg));
        // Spoof vetoes even with every other factor passing.
        assert!(!decide(true, true, 0.5, true, &cfg));
        assert!(!decide(false, true, 0.0, false, &cfg));
        assert!(!decide(true, false, 0.0, false, &cfg));
        assert!(!decide(true, true, 0.7, false, &cfg), "veto is >= 0.7");
    }
}
