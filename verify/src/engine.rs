use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use voxauth_analysis::{
    AudioClip, FraudIndicator, QualityAnalyzer, SpeakerEmbedder, SpoofDetector, Transcriber,
};
use voxauth_challenge::{validate_response, Challenge};
use voxauth_simvec::cosine_similarity;
use voxauth_store::{BiometricStore, StoreError, VerificationLog};

use crate::config::VerifyConfig;
use crate::outcome::{MatchReport, VerificationOutcome};
use crate::scoring::{confidence_score, decide, fraud_risk};

/// One verification attempt.
pub struct VerifyRequest {
    /// Claimed identity.
    pub user_id: String,
    pub clip: AudioClip,
    /// Optional challenge the clip must answer.
    pub challenge: Option<Challenge>,
    /// Attendance record this attempt authenticates, if any.
    pub attendance_record_id: Option<String>,
    pub enable_anti_spoofing: bool,
}

/// Runtime verification engine. All external analysis goes through the
/// injected ports; persistence and the voiceprint cache go through
/// [`BiometricStore`].
pub struct VerifyEngine {
    quality: Arc<dyn QualityAnalyzer>,
    transcriber: Arc<dyn Transcriber>,
    spoof: Arc<dyn SpoofDetector>,
    embedder: Arc<dyn SpeakerEmbedder>,
    store: Arc<BiometricStore>,
    cfg: VerifyConfig,
}

impl VerifyEngine {
    pub fn new(
        quality: Arc<dyn QualityAnalyzer>,
        transcriber: Arc<dyn Transcriber>,
        spoof: Arc<dyn SpoofDetector>,
        embedder: Arc<dyn SpeakerEmbedder>,
        store: Arc<BiometricStore>,
        cfg: VerifyConfig,
    ) -> Self {
        Self {
            quality,
            transcriber,
            spoof,
            embedder,
            store,
            cfg,
        }
    }

    /// Run the full pipeline and append the audit row.
    ///
    /// Expected rejections are data, not errors; the only `Err` this
    /// returns is a failure to write the mandatory audit row.
    pub async fn verify(&self, req: VerifyRequest) -> Result<VerificationOutcome, StoreError> {
        let started = Instant::now();
        let mut quality_score = 0.0f32;
        let outcome = self.run(&req, &mut quality_score).await;

        if let VerificationOutcome::Verified(report) = &outcome {
            // Usage counters are best-effort; a counter failure must not
            // overturn an accepted match.
            if let Err(e) =
                self.store
                    .touch_usage(&req.user_id, &report.matched_print_id, Utc::now())
            {
                warn!(user = %req.user_id, error = %e, "usage counter update failed");
            }
        }

        let log = VerificationLog {
            user_id: req.user_id.clone(),
            result: outcome.result(),
            best_similarity: outcome.report().map(|r| r.best_similarity).unwrap_or(0.0),
            confidence: outcome.report().map(|r| r.confidence).unwrap_or(0.0),
            fraud_risk: outcome.report().map(|r| r.fraud_risk).unwrap_or(0.0),
            quality_score,
            fraud_indicators: outcome.fraud_indicators(),
            challenge_kind: req.challenge.as_ref().map(|c| c.kind.to_string()),
            attendance_record_id: req.attendance_record_id.clone(),
            processing_ms: started.elapsed().as_millis() as u64,
            created_at: Utc::now(),
        };
        self.store.append_verification(&log)?;
        Ok(outcome)
    }

    async fn run(&self, req: &VerifyRequest, quality_score: &mut f32) -> VerificationOutcome {
        // Gate 1: quality. Cheapest check runs first.
        let quality = match self.quality.assess(&req.clip).await {
            Ok(q) => q,
            Err(e) => {
                warn!(user = %req.user_id, error = %e, "quality analysis failed");
                return VerificationOutcome::Error {
                    message: format!("quality analysis: {e}"),
                    indicator: FraudIndicator::VerificationError,
                };
            }
        };
        *quality_score = quality.quality_score;
        if quality.quality_score < self.cfg.min_quality {
            debug!(
                user = %req.user_id,
                score = quality.quality_score,
                "rejected: audio quality below threshold"
            );
            return VerificationOutcome::RejectedLowQuality(quality);
        }

        // Gate 2: anti-spoofing. Detection terminates; a borderline
        // report (indicators without detection) only raises fraud risk.
        let mut spoof_flagged = false;
        if req.enable_anti_spoofing {
            match self.spoof.detect(&req.clip).await {
                Ok(report) if report.spoof_detected => {
                    warn!(
                        user = %req.user_id,
                        spoof_type = ?report.spoof_type,
                        "rejected: spoof detected"
                    );
                    return VerificationOutcome::RejectedSpoof(report);
                }
                Ok(report) => spoof_flagged = !report.fraud_indicators.is_empty(),
                Err(e) => {
                    warn!(user = %req.user_id, error = %e, "spoof detection failed");
                    return VerificationOutcome::Error {
                        message: format!("spoof detection: {e}"),
                        indicator: FraudIndicator::VerificationError,
                    };
                }
            }
        }

        // Gate 3: challenge-response.
        if let Some(challenge) = &req.challenge {
            let transcript = match self.transcriber.transcribe(&req.clip).await {
                Ok(t) => t,
                Err(e) => {
                    warn!(user = %req.user_id, error = %e, "transcription failed");
                    return VerificationOutcome::Error {
                        message: format!("transcription: {e}"),
                        indicator: FraudIndicator::VerificationError,
                    };
                }
            };
            let outcome = validate_response(challenge, &transcript, Utc::now());
            if !outcome.matched() {
                debug!(user = %req.user_id, reason = outcome.reason(), "rejected: challenge");
                return VerificationOutcome::RejectedChallenge(outcome);
            }
        }

        // Gate 4: stored voiceprints, cache-first.
        let prints = match self.store.voiceprints_for(&req.user_id) {
            Ok(p) => p,
            Err(e) => {
                warn!(user = %req.user_id, error = %e, "voiceprint load failed");
                return VerificationOutcome::Error {
                    message: format!("voiceprint load: {e}"),
                    indicator: FraudIndicator::VerificationError,
                };
            }
        };
        if prints.is_empty() {
            return VerificationOutcome::NoEnrolledVoiceprints;
        }

        // Gate 5: embedding extraction.
        let embedding = match self.embedder.extract(&req.clip).await {
            Ok(e) => e,
            Err(e) => {
                warn!(user = %req.user_id, error = %e, "embedding extraction failed");
                return VerificationOutcome::Error {
                    message: format!("embedding extraction: {e}"),
                    indicator: FraudIndicator::EmbeddingExtractionFailed,
                };
            }
        };

        // Scoring: best similarity across all prints, blended confidence,
        // additive fraud risk.
        let sims: Vec<f32> = prints
            .iter()
            .map(|p| cosine_similarity(&embedding, &p.embedding))
            .collect();
        let mut best_idx = 0usize;
        let mut best = 0.0f32;
        for (i, &s) in sims.iter().enumerate() {
            if s > best {
                best = s;
                best_idx = i;
            }
        }

        let best_is_primary = prints[best_idx].is_primary;
        let confidence = confidence_score(&sims, best_is_primary, &self.cfg);
        let threshold_met = best >= self.cfg.similarity_threshold;
        let confidence_met = confidence >= self.cfg.confidence_threshold;
        let risk = fraud_risk(confidence, quality.quality_score, spoof_flagged, &self.cfg);

        let report = MatchReport {
            best_similarity: best,
            confidence,
            fraud_risk: risk,
            threshold_met,
            confidence_met,
            matched_print_id: prints[best_idx].id.clone(),
            matched_primary: best_is_primary,
        };

        // Spoof detection would have terminated above, so the spoof veto
        // input here is always false; the veto stays in `decide` so the
        // decision rule is complete on its own.
        if decide(threshold_met, confidence_met, risk, false, &self.cfg) {
            debug!(user = %req.user_id, confidence, best, "verified");
            VerificationOutcome::Verified(report)
        } else {
            debug!(
                user = %req.user_id,
                confidence,
                best,
                risk,
                "rejected: thresholds not met"
            );
            VerificationOutcome::RejectedLowConfidence(report)
        }
    }
}
