//! Voice verification engine.
//!
//! [`VerifyEngine::verify`] decides whether a submitted audio clip is a
//! genuine live match for a claimed user. The pipeline is linear with
//! early exits, cheap gates first:
//!
//! 1. audio quality
//! 2. anti-spoofing (optional)
//! 3. challenge-response (optional)
//! 4. stored voiceprint lookup (cache-first)
//! 5. embedding extraction
//! 6. similarity + confidence + fraud-risk scoring
//!
//! Expected rejections come back as data ([`VerificationOutcome`]
//! variants), never as errors: verification is a high-frequency path and
//! callers branch on the outcome. Every call, however it terminates,
//! appends exactly one [`voxauth_store::VerificationLog`] row; that is
//! the compliance guarantee, and a failure to write it is the only error
//! `verify` returns.

mod config;
mod engine;
mod outcome;
mod scoring;

pub use config::VerifyConfig;
pub use engine::{VerifyEngine, VerifyRequest};
pub use outcome::{MatchReport, VerificationOutcome};
pub use scoring::{confidence_score, decide, fraud_risk};
