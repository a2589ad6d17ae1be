//! enrolltest - drives a full enrollment and a few verification
//! attempts through the real pipelines, with scripted analyzers in
//! place of the ML services. Useful for eyeballing the workflow, the
//! audit trail and the persisted records end to end.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;

use voxauth_analysis::mock::{
    MockEmbedder, MockFaceLookup, MockNotifier, MockQualityAnalyzer, MockSpoofDetector,
    MockTranscriber,
};
use voxauth_analysis::{AudioClip, FraudIndicator, SpoofReport, SpoofType};
use voxauth_challenge::{Challenge, ChallengeGenerator, Expected, GeneratorConfig, UserProfile};
use voxauth_enroll::{ApprovalDecision, EnrollmentService, ServiceConfig};
use voxauth_store::{BiometricStore, Kv, MemoryCache, MemoryKv, RedbKv};
use voxauth_verify::{VerificationOutcome, VerifyConfig, VerifyEngine, VerifyRequest};

/// Exercise tool for the enrollment and verification pipelines.
#[derive(Parser, Debug)]
#[command(name = "enrolltest")]
#[command(about = "Exercise tool for the enrollment and verification pipelines")]
struct Args {
    /// User id to enroll and verify
    #[arg(short, long, default_value = "demo-user")]
    user: String,

    /// Persist to a redb file instead of memory
    #[arg(long)]
    db: Option<PathBuf>,

    /// Skip the human approval step (policy waiver)
    #[arg(long)]
    skip_approval: bool,

    /// Also run a playback-spoof verification attempt
    #[arg(long)]
    spoof: bool,

    /// Also run an impostor verification attempt (wrong voice)
    #[arg(long)]
    impostor: bool,

    /// Dump the verification log rows as JSON when done
    #[arg(long)]
    dump_logs: bool,

    /// Quiet mode (warnings only)
    #[arg(short = 'q', long)]
    quiet: bool,
}

struct Harness {
    transcriber: Arc<MockTranscriber>,
    spoof: Arc<MockSpoofDetector>,
    embedder: Arc<MockEmbedder>,
    notifier: Arc<MockNotifier>,
    store: Arc<BiometricStore>,
    enroll: EnrollmentService,
    verify: VerifyEngine,
    generator: ChallengeGenerator,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    let kv: Arc<dyn Kv> = match &args.db {
        Some(path) => {
            let db = RedbKv::open(path)
                .with_context(|| format!("opening database {}", path.display()))?;
            Arc::new(db)
        }
        None => Arc::new(MemoryKv::new()),
    };
    let h = harness(kv);

    if args.skip_approval {
        let mut policy = h.store.policy("default")?;
        policy.require_approval = false;
        h.store.save_policy("default", &policy)?;
    }

    run_enrollment(&h, &args).await?;
    run_verification(&h, &args).await?;

    if args.spoof {
        run_spoofed_attempt(&h, &args).await?;
    }
    if args.impostor {
        run_impostor_attempt(&h, &args).await?;
    }

    println!("\n=== Persisted voiceprints ===");
    for p in h.store.voiceprints_for(&args.user)? {
        println!(
            "  {} primary={} quality={:.2} snr={:.1}dB used={} model={}",
            p.id, p.is_primary, p.quality_score, p.snr_db, p.use_count, p.model
        );
    }

    println!("\n=== Verification log ===");
    for log in h.store.verification_logs_for(&args.user)? {
        println!(
            "  {} sim={:.3} conf={:.3} risk={:.2} indicators={:?} took={}ms",
            log.result,
            log.best_similarity,
            log.confidence,
            log.fraud_risk,
            log.fraud_indicators,
            log.processing_ms
        );
        if args.dump_logs {
            println!("    {}", serde_json::to_string(&log)?);
        }
    }

    println!("\n=== Enrollment audit ===");
    for audit in h.store.enrollment_audits_for(&args.user)? {
        println!(
            "  {} session={} samples={} consistency={:.3}",
            audit.outcome, audit.session_id, audit.sample_count, audit.consistency_score
        );
    }

    Ok(())
}

fn harness(kv: Arc<dyn Kv>) -> Harness {
    let quality = Arc::new(MockQualityAnalyzer::new());
    let transcriber = Arc::new(MockTranscriber::new(""));
    let spoof = Arc::new(MockSpoofDetector::new());
    let embedder = Arc::new(MockEmbedder::new(16));
    let notifier = Arc::new(MockNotifier::new());
    let face = Arc::new(MockFaceLookup::new());
    let store = Arc::new(BiometricStore::new(kv, Arc::new(MemoryCache::new())));
    let generator = ChallengeGenerator::new(GeneratorConfig::default());

    let enroll = EnrollmentService::new(
        quality.clone(),
        transcriber.clone(),
        spoof.clone(),
        embedder.clone(),
        face.clone(),
        notifier.clone(),
        store.clone(),
        Arc::new(MemoryCache::new()),
        ChallengeGenerator::new(GeneratorConfig::default()),
        ServiceConfig::default(),
    );
    let verify = VerifyEngine::new(
        quality.clone(),
        transcriber.clone(),
        spoof.clone(),
        embedder.clone(),
        store.clone(),
        VerifyConfig::default(),
    );

    // Every demo user has a fresh face enrollment on file.
    face.set("demo-user", Utc::now() - Duration::days(10));

    Harness {
        transcriber,
        spoof,
        embedder,
        notifier,
        store,
        enroll,
        verify,
        generator,
    }
}

/// The spoken answer a genuine user would give.
fn answer_for(challenge: &Challenge) -> String {
    match &challenge.expected {
        Expected::Keywords(kws) => kws.join(" "),
        Expected::Number(n) => format!("the answer is {n}"),
    }
}

/// The enrolled speaker's voice, with slight per-utterance variation.
fn genuine_embedding(variant: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; 16];
    v[0] = 1.0;
    v[1] = 0.02 * variant as f32;
    v
}

async fn run_enrollment(h: &Harness, args: &Args) -> Result<()> {
    let account = voxauth_analysis::UserAccount {
        user_id: args.user.clone(),
        display_name: "Demo User".to_string(),
        email: format!("{}@example.com", args.user),
        active: true,
        verified: true,
        voice_auth_enabled: true,
        manager_email: Some("manager@example.com".to_string()),
    };
    // Face enrollment for non-default user ids.
    if args.user != "demo-user" {
        anyhow::bail!("custom user ids need a face record; use --user demo-user");
    }

    let profile = UserProfile {
        display_name: account.display_name.clone(),
        department: "Operations".to_string(),
        work_city: "Rotterdam".to_string(),
    };

    println!("=== Enrollment ===");
    let session = h.enroll.create_session(&account, Some(&profile)).await?;
    println!(
        "session {} with {} challenges",
        session.session_id,
        session.challenges.len()
    );

    for (i, challenge) in session.challenges.iter().enumerate() {
        let clip = AudioClip::new(vec![i as u8 + 1; 160]);
        let hash = clip.content_hash();
        h.transcriber.set(&hash, &answer_for(challenge));
        h.embedder.set(&hash, genuine_embedding(i));

        let out = h.enroll.collect_sample(&session.session_id, i, &clip).await?;
        println!(
            "  [{}] {} -> {}/{} collected",
            challenge.kind, challenge.phrase, out.samples_collected, out.required_samples
        );
    }

    let draft = h.enroll.generate_voiceprint(&session.session_id).await?;
    println!(
        "voiceprint drafted: consistency={:.3} avg_quality={:.2}",
        draft.consistency_score, draft.avg_quality
    );

    let request = h.enroll.request_approval(&account, &session.session_id).await?;
    println!(
        "approval: approver={} auto={}",
        request.approver, request.auto_approved
    );
    for n in h.notifier.sent() {
        println!("  notification to {}: {}", n.to, n.subject);
    }

    let result = h
        .enroll
        .finalize(&account, &session.session_id, ApprovalDecision::Approved)
        .await?;
    println!("finalized: {} ({} prints)", result.status, result.voiceprint_ids.len());
    Ok(())
}

async fn run_verification(h: &Harness, args: &Args) -> Result<()> {
    println!("\n=== Genuine verification ===");
    let challenge = h.generator.verification_challenge();
    println!("challenge [{}]: {}", challenge.kind, challenge.phrase);

    let clip = AudioClip::new(vec![200; 160]);
    let hash = clip.content_hash();
    h.transcriber.set(&hash, &answer_for(&challenge));
    h.embedder.set(&hash, genuine_embedding(1));

    let outcome = h
        .verify
        .verify(VerifyRequest {
            user_id: args.user.clone(),
            clip,
            challenge: Some(challenge),
            attendance_record_id: Some("att-1".to_string()),
            enable_anti_spoofing: true,
        })
        .await?;
    print_outcome(&outcome);
    Ok(())
}

async fn run_spoofed_attempt(h: &Harness, args: &Args) -> Result<()> {
    println!("\n=== Playback spoof attempt ===");
    let challenge = h.generator.verification_challenge();

    let clip = AudioClip::new(vec![201; 160]);
    let hash = clip.content_hash();
    h.transcriber.set(&hash, &answer_for(&challenge));
    h.embedder.set(&hash, genuine_embedding(1));
    h.spoof.set(
        &hash,
        SpoofReport {
            spoof_detected: true,
            spoof_type: Some(SpoofType::Playback),
            liveness_score: 0.08,
            fraud_indicators: vec![FraudIndicator::PlaybackDetected],
        },
    );

    let outcome = h
        .verify
        .verify(VerifyRequest {
            user_id: args.user.clone(),
            clip,
            challenge: Some(challenge),
            attendance_record_id: None,
            enable_anti_spoofing: true,
        })
        .await?;
    print_outcome(&outcome);
    Ok(())
}

async fn run_impostor_attempt(h: &Harness, args: &Args) -> Result<()> {
    println!("\n=== Impostor attempt ===");
    let challenge = h.generator.verification_challenge();

    let clip = AudioClip::new(vec![202; 160]);
    let hash = clip.content_hash();
    h.transcriber.set(&hash, &answer_for(&challenge));
    // A different speaker: orthogonal to the enrolled voice.
    let mut other = vec![0.0f32; 16];
    other[5] = 1.0;
    h.embedder.set(&hash, other);

    let outcome = h
        .verify
        .verify(VerifyRequest {
            user_id: args.user.clone(),
            clip,
            challenge: Some(challenge),
            attendance_record_id: None,
            enable_anti_spoofing: true,
        })
        .await?;
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &VerificationOutcome) {
    match outcome {
        VerificationOutcome::Verified(r) => println!(
            "VERIFIED: similarity={:.3} confidence={:.3} risk={:.2} primary={}",
            r.best_similarity, r.confidence, r.fraud_risk, r.matched_primary
        ),
        VerificationOutcome::RejectedLowQuality(q) => println!(
            "REJECTED (quality): score={:.2} snr={:.1}dB issues={:?}",
            q.quality_score, q.snr_db, q.issues
        ),
        VerificationOutcome::RejectedSpoof(s) => println!(
            "REJECTED (spoof): type={:?} liveness={:.2}",
            s.spoof_type, s.liveness_score
        ),
        VerificationOutcome::RejectedChallenge(c) => {
            println!("REJECTED (challenge): {}", c.reason())
        }
        VerificationOutcome::NoEnrolledVoiceprints => println!("REJECTED: no voiceprints on file"),
        VerificationOutcome::RejectedLowConfidence(r) => println!(
            "REJECTED (low confidence): similarity={:.3} confidence={:.3}",
            r.best_similarity, r.confidence
        ),
        VerificationOutcome::Error { message, indicator } => {
            println!("ERROR ({indicator}): {message}")
        }
    }
}
