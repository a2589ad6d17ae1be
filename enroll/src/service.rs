use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use voxauth_analysis::{
    AudioClip, FaceEnrollmentLookup, FraudIndicator, Notification, Notifier, QualityAnalyzer,
    SpeakerEmbedder, SpoofDetector, Transcriber, UserAccount,
};
use voxauth_challenge::{validate_response, ChallengeGenerator, UserProfile};
use voxauth_simvec::{l2_normalize, mean_embedding, pairwise_consistency};
use voxauth_store::{
    session_key, BiometricStore, EnrollmentAudit, EnrollmentPolicy, TtlCache, VoiceprintRecord,
};

use crate::error::EnrollError;
use crate::session::{CollectedSample, EnrollmentSession, SessionState};
use crate::types::{
    ApprovalDecision, ApprovalRequest, EligibilityReport, FinalizeResult, SampleOutcome,
    VoiceprintDraft,
};

/// Extra seconds an expired session stays readable in the cache, so a
/// late caller gets "expired" rather than "not found".
const SESSION_GRACE_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Policy scope consulted for every request.
    pub policy_scope: String,
    /// Approval fallback address when no manager is on file.
    pub hr_queue: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            policy_scope: "default".to_string(),
            hr_queue: "hr-approvals@voxauth.local".to_string(),
        }
    }
}

/// Orchestrates the five-phase enrollment workflow. Each phase is a
/// hard gate; a failure aborts the enrollment, never downgrades it.
pub struct EnrollmentService {
    quality: Arc<dyn QualityAnalyzer>,
    transcriber: Arc<dyn Transcriber>,
    spoof: Arc<dyn SpoofDetector>,
    embedder: Arc<dyn SpeakerEmbedder>,
    face: Arc<dyn FaceEnrollmentLookup>,
    notifier: Arc<dyn Notifier>,
    store: Arc<BiometricStore>,
    sessions: Arc<dyn TtlCache>,
    generator: ChallengeGenerator,
    cfg: ServiceConfig,
}

impl EnrollmentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        quality: Arc<dyn QualityAnalyzer>,
        transcriber: Arc<dyn Transcriber>,
        spoof: Arc<dyn SpoofDetector>,
        embedder: Arc<dyn SpeakerEmbedder>,
        face: Arc<dyn FaceEnrollmentLookup>,
        notifier: Arc<dyn Notifier>,
        store: Arc<BiometricStore>,
        sessions: Arc<dyn TtlCache>,
        generator: ChallengeGenerator,
        cfg: ServiceConfig,
    ) -> Self {
        Self {
            quality,
            transcriber,
            spoof,
            embedder,
            face,
            notifier,
            store,
            sessions,
            generator,
            cfg,
        }
    }

    /// Phase 1: eligibility. All checks run; every failing reason is
    /// reported together so the user sees the full list at once.
    pub async fn check_eligibility(
        &self,
        account: &UserAccount,
    ) -> Result<EligibilityReport, EnrollError> {
        let policy = self.store.policy(&self.cfg.policy_scope)?;
        let now = Utc::now();
        let mut reasons = Vec::new();

        let face_validated_at = self.face.latest_validated(&account.user_id).await?;
        match face_validated_at {
            Some(ts) if now - ts > Duration::days(policy.face_recency_days) => {
                reasons.push(format!(
                    "face biometric enrollment is older than {} days",
                    policy.face_recency_days
                ));
            }
            Some(_) => {}
            None => reasons.push("no validated face biometric enrollment on file".to_string()),
        }

        let last_enrollment = self.store.latest_enrollment_at(&account.user_id)?;
        if let Some(ts) = last_enrollment {
            if now - ts < Duration::days(policy.reenroll_interval_days) {
                reasons.push(format!(
                    "voice enrollment from {} is within the {}-day re-enrollment window",
                    ts.format("%Y-%m-%d"),
                    policy.reenroll_interval_days
                ));
            }
        }

        if !account.active {
            reasons.push("account is not active".to_string());
        }
        if !account.verified {
            reasons.push("account is not verified".to_string());
        }
        if !account.voice_auth_enabled {
            reasons.push("voice authentication is not enabled for this account".to_string());
        }

        if !reasons.is_empty() {
            return Err(EnrollError::Ineligible { reasons });
        }
        match face_validated_at {
            Some(ts) => Ok(EligibilityReport {
                user_id: account.user_id.clone(),
                face_validated_at: ts,
                last_voice_enrollment_at: last_enrollment,
            }),
            // Unreachable: a missing face enrollment was pushed above.
            None => Err(EnrollError::Ineligible {
                reasons: vec!["no validated face biometric enrollment on file".to_string()],
            }),
        }
    }

    /// Phase 2a: open a session. Only runs after eligibility passes.
    pub async fn create_session(
        &self,
        account: &UserAccount,
        profile: Option<&UserProfile>,
    ) -> Result<EnrollmentSession, EnrollError> {
        self.check_eligibility(account).await?;
        let policy = self.store.policy(&self.cfg.policy_scope)?;

        let challenges = self.generator.enrollment_set(policy.min_samples, profile);
        let mut session = EnrollmentSession::new(
            &account.user_id,
            challenges,
            policy.min_samples,
            policy.session_timeout_secs,
            Utc::now(),
        );
        session.begin_collecting()?;
        self.save_session(&session, &policy)?;

        info!(
            user = %account.user_id,
            session = %session.session_id,
            challenges = session.challenges.len(),
            "enrollment session created"
        );
        Ok(session)
    }

    /// Phase 2b: submit one sample against one of the session's
    /// challenges. Gates run in strict order, cheapest first: quality,
    /// transcription, challenge, anti-spoofing, embedding extraction.
    /// The first failing gate aborts this sample only; the caller
    /// retries with a fresh recording.
    pub async fn collect_sample(
        &self,
        session_id: &str,
        challenge_idx: usize,
        clip: &AudioClip,
    ) -> Result<SampleOutcome, EnrollError> {
        let policy = self.store.policy(&self.cfg.policy_scope)?;
        let mut session = self.load_live_session(session_id)?;
        if session.state != SessionState::Collecting {
            return Err(EnrollError::InvalidState(format!(
                "session {session_id} is {}, not collecting",
                session.state
            )));
        }
        let challenge = session
            .challenges
            .get(challenge_idx)
            .ok_or_else(|| {
                EnrollError::InvalidState(format!("challenge index {challenge_idx} out of range"))
            })?
            .clone();

        // Gate 1: quality. Enrollment is stricter than verification:
        // these samples become the reference for every later match.
        let quality = self.quality.assess(clip).await?;
        if quality.quality_score < policy.min_quality {
            return Err(EnrollError::Security {
                reason: format!(
                    "audio quality {:.2} below required {:.2}",
                    quality.quality_score, policy.min_quality
                ),
                indicator: FraudIndicator::LowAudioQuality,
            });
        }
        if quality.snr_db < policy.min_snr_db {
            return Err(EnrollError::Security {
                reason: format!(
                    "signal-to-noise ratio {:.1} dB below required {:.1} dB",
                    quality.snr_db, policy.min_snr_db
                ),
                indicator: FraudIndicator::LowAudioQuality,
            });
        }
        if quality.duration_seconds < policy.min_duration_seconds
            || quality.duration_seconds > policy.max_duration_seconds
        {
            return Err(EnrollError::Security {
                reason: format!(
                    "duration {:.1}s outside {:.0}-{:.0}s window",
                    quality.duration_seconds,
                    policy.min_duration_seconds,
                    policy.max_duration_seconds
                ),
                indicator: FraudIndicator::LowAudioQuality,
            });
        }

        // Gate 2: transcription.
        let transcript = self.transcriber.transcribe(clip).await?;

        // Gate 3: challenge-response.
        let outcome = validate_response(&challenge, &transcript, Utc::now());
        if !outcome.matched() {
            return Err(EnrollError::Security {
                reason: format!("challenge failed: {}", outcome.reason()),
                indicator: outcome
                    .fraud_indicator()
                    .unwrap_or(FraudIndicator::ChallengeMismatch),
            });
        }

        // Gate 4: anti-spoofing. Always on during enrollment.
        let spoof = self.spoof.detect(clip).await?;
        if spoof.spoof_detected {
            warn!(
                session = %session_id,
                spoof_type = ?spoof.spoof_type,
                "spoofed enrollment sample rejected"
            );
            return Err(EnrollError::Security {
                reason: match spoof.spoof_type {
                    Some(t) => format!("spoofing detected: {t}"),
                    None => "spoofing detected".to_string(),
                },
                indicator: spoof
                    .fraud_indicators
                    .first()
                    .copied()
                    .unwrap_or(FraudIndicator::PlaybackDetected),
            });
        }

        // Gate 5: embedding extraction.
        let embedding = self
            .embedder
            .extract(clip)
            .await
            .map_err(|e| EnrollError::Extraction(e.to_string()))?;

        let recorded = session.record_sample(CollectedSample {
            content_hash: clip.content_hash(),
            embedding,
            quality_score: quality.quality_score,
            snr_db: quality.snr_db,
            duration_seconds: quality.duration_seconds,
            challenge_kind: challenge.kind.to_string(),
        })?;
        self.save_session(&session, &policy)?;

        Ok(SampleOutcome {
            session_id: session.session_id.clone(),
            duplicate: !recorded,
            samples_collected: session.samples_collected(),
            required_samples: session.required_samples,
            collection_complete: session.samples_collected() >= session.required_samples,
        })
    }

    /// Phase 3: consistency-gated voiceprint generation.
    ///
    /// The gate is the anti-collusion check: samples from different
    /// speakers, or a mix of genuine and synthetic voice, fail the mean
    /// pairwise similarity even when each sample individually passed
    /// quality and challenge checks. Failure is terminal for the
    /// session and leaves an audit row.
    pub async fn generate_voiceprint(
        &self,
        session_id: &str,
    ) -> Result<VoiceprintDraft, EnrollError> {
        let policy = self.store.policy(&self.cfg.policy_scope)?;
        let mut session = self.load_live_session(session_id)?;
        if session.samples_collected() < policy.min_samples {
            return Err(EnrollError::InvalidState(format!(
                "only {} of {} required samples collected",
                session.samples_collected(),
                policy.min_samples
            )));
        }

        let embeddings: Vec<Vec<f32>> =
            session.samples.iter().map(|s| s.embedding.clone()).collect();
        let consistency = pairwise_consistency(&embeddings).unwrap_or(0.0);
        let avg_quality = avg_quality(&session);

        if consistency < policy.min_consistency {
            session.reject()?;
            self.save_session(&session, &policy)?;
            self.store.append_enrollment_audit(&EnrollmentAudit {
                user_id: session.user_id.clone(),
                session_id: session.session_id.clone(),
                outcome: "REJECTED".to_string(),
                sample_count: session.samples_collected(),
                consistency_score: consistency,
                avg_quality,
                fraud_indicators: vec![FraudIndicator::InconsistentSamples],
                created_at: Utc::now(),
            })?;
            warn!(
                session = %session_id,
                consistency,
                required = policy.min_consistency,
                "enrollment rejected: inconsistent sample set"
            );
            return Err(EnrollError::Security {
                reason: format!(
                    "sample consistency {:.3} below required {:.3}",
                    consistency, policy.min_consistency
                ),
                indicator: FraudIndicator::InconsistentSamples,
            });
        }

        let voiceprint =
            mean_embedding(&embeddings).map_err(|e| EnrollError::InvalidState(e.to_string()))?;
        session.pass_consistency(consistency)?;
        self.save_session(&session, &policy)?;

        Ok(VoiceprintDraft {
            session_id: session.session_id.clone(),
            voiceprint,
            consistency_score: consistency,
            sample_count: session.samples_collected(),
            avg_quality,
        })
    }

    /// Phase 4: the human checkpoint. Routed to the reporting manager,
    /// or to the HR queue when no manager is on file. When policy
    /// waives review for this scope the session auto-approves and no
    /// message is sent.
    pub async fn request_approval(
        &self,
        account: &UserAccount,
        session_id: &str,
    ) -> Result<ApprovalRequest, EnrollError> {
        let policy = self.store.policy(&self.cfg.policy_scope)?;
        let mut session = self.load_live_session(session_id)?;
        let consistency = session.consistency_score.ok_or_else(|| {
            EnrollError::InvalidState("voiceprint has not been generated".to_string())
        })?;
        session.submit_for_approval()?;

        let now = Utc::now();
        let auto_approved = !policy.require_approval;
        let approver = if auto_approved {
            "auto".to_string()
        } else {
            account
                .manager_email
                .clone()
                .unwrap_or_else(|| self.cfg.hr_queue.clone())
        };

        let request = ApprovalRequest {
            id: Uuid::new_v4().to_string(),
            session_id: session.session_id.clone(),
            user_id: session.user_id.clone(),
            approver: approver.clone(),
            requested_at: now,
            expires_at: now + Duration::seconds(policy.approval_timeout_secs as i64),
            sample_count: session.samples_collected(),
            consistency_score: consistency,
            avg_quality: avg_quality(&session),
            auto_approved,
        };

        if auto_approved {
            session.approve()?;
        } else {
            self.notifier
                .send(Notification {
                    to: approver,
                    subject: format!("Voice enrollment approval needed for {}", account.display_name),
                    body: format!(
                        "Samples: {}\nConsistency: {:.3}\nAverage quality: {:.2}\nRespond before: {}",
                        request.sample_count,
                        request.consistency_score,
                        request.avg_quality,
                        request.expires_at.format("%Y-%m-%d %H:%M UTC"),
                    ),
                })
                .await?;
        }
        self.save_session(&session, &policy)?;

        info!(
            session = %session_id,
            approver = %request.approver,
            auto = auto_approved,
            "approval requested"
        );
        Ok(request)
    }

    /// Phase 5: finalize. On approval, every accepted embedding is
    /// persisted in one atomic batch (first one primary) and any prior
    /// enrollment is retired; any other decision discards the session
    /// with no persistence. Both paths leave an audit row.
    pub async fn finalize(
        &self,
        account: &UserAccount,
        session_id: &str,
        decision: ApprovalDecision,
    ) -> Result<FinalizeResult, EnrollError> {
        let mut session = self.load_live_session(session_id)?;

        if decision != ApprovalDecision::Approved {
            let status = match decision {
                ApprovalDecision::Rejected => "REJECTED",
                _ => "EXPIRED",
            };
            self.store.append_enrollment_audit(&EnrollmentAudit {
                user_id: session.user_id.clone(),
                session_id: session.session_id.clone(),
                outcome: status.to_string(),
                sample_count: session.samples_collected(),
                consistency_score: session.consistency_score.unwrap_or(0.0),
                avg_quality: avg_quality(&session),
                fraud_indicators: Vec::new(),
                created_at: Utc::now(),
            })?;
            self.sessions.delete(&session_key(session_id))?;
            info!(session = %session_id, status, "enrollment discarded");
            return Ok(FinalizeResult {
                success: false,
                status: status.to_string(),
                voiceprint_ids: Vec::new(),
            });
        }

        match session.state {
            SessionState::PendingApproval => session.approve()?,
            SessionState::Approved => {}
            other => {
                return Err(EnrollError::InvalidState(format!(
                    "session {session_id} is {other}, cannot finalize"
                )))
            }
        }

        let now = Utc::now();
        let model = self.embedder.model_id().to_string();
        let mut prints = Vec::with_capacity(session.samples.len());
        for (i, s) in session.samples.iter().enumerate() {
            let mut embedding = s.embedding.clone();
            l2_normalize(&mut embedding);
            prints.push(VoiceprintRecord {
                id: format!("{}-{i}", session.session_id),
                user_id: session.user_id.clone(),
                embedding,
                snr_db: s.snr_db,
                duration_seconds: s.duration_seconds,
                quality_score: s.quality_score,
                model: model.clone(),
                validated: true,
                is_primary: i == 0,
                active: true,
                created_at: now,
                use_count: 0,
                last_used_at: None,
            });
        }

        // One transaction retires the prior enrollment and persists
        // the new set: no partial voiceprint sets, ever, and a backend
        // failure leaves the old enrollment serving matches.
        self.store.replace_enrollment(&session.user_id, &prints)?;
        self.store.append_enrollment_audit(&EnrollmentAudit {
            user_id: session.user_id.clone(),
            session_id: session.session_id.clone(),
            outcome: "COMPLETED".to_string(),
            sample_count: session.samples_collected(),
            consistency_score: session.consistency_score.unwrap_or(0.0),
            avg_quality: avg_quality(&session),
            fraud_indicators: Vec::new(),
            created_at: now,
        })?;

        // Confirmation is best-effort: persistence already succeeded.
        if let Err(e) = self
            .notifier
            .send(Notification {
                to: account.email.clone(),
                subject: "Voice enrollment complete".to_string(),
                body: format!(
                    "Your voice enrollment finished with {} samples on {}.",
                    prints.len(),
                    now.format("%Y-%m-%d"),
                ),
            })
            .await
        {
            warn!(user = %session.user_id, error = %e, "confirmation notification failed");
        }

        self.sessions.delete(&session_key(session_id))?;
        info!(
            user = %session.user_id,
            session = %session_id,
            voiceprints = prints.len(),
            "enrollment completed"
        );
        Ok(FinalizeResult {
            success: true,
            status: "COMPLETED".to_string(),
            voiceprint_ids: prints.into_iter().map(|p| p.id).collect(),
        })
    }

    // -- Session persistence --

    fn save_session(
        &self,
        session: &EnrollmentSession,
        policy: &EnrollmentPolicy,
    ) -> Result<(), EnrollError> {
        let bytes = serde_json::to_vec(session)
            .map_err(|e| EnrollError::InvalidState(format!("session encode: {e}")))?;
        // Keep expired sessions readable for a grace period so late
        // callers get "expired", not "not found".
        let ttl = StdDuration::from_secs(policy.session_timeout_secs + SESSION_GRACE_SECS);
        self.sessions
            .set(&session_key(&session.session_id), &bytes, ttl)?;
        Ok(())
    }

    fn load_live_session(&self, session_id: &str) -> Result<EnrollmentSession, EnrollError> {
        let bytes = self
            .sessions
            .get(&session_key(session_id))?
            .ok_or_else(|| EnrollError::SessionNotFound(session_id.to_string()))?;
        let mut session: EnrollmentSession = serde_json::from_slice(&bytes)
            .map_err(|e| EnrollError::InvalidState(format!("session decode: {e}")))?;

        if session.state == SessionState::Expired {
            return Err(EnrollError::SessionExpired(session_id.to_string()));
        }
        if session.is_expired(Utc::now()) {
            session.expire();
            let policy = self.store.policy(&self.cfg.policy_scope)?;
            self.save_session(&session, &policy)?;
            return Err(EnrollError::SessionExpired(session_id.to_string()));
        }
        Ok(session)
    }
}

fn avg_quality(session: &EnrollmentSession) -> f32 {
    if session.samples.is_empty() {
        return 0.0;
    }
    session.samples.iter().map(|s| s.quality_score).sum::<f32>() / session.samples.len() as f32
}
