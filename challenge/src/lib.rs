//! Anti-replay challenge generation and response validation.
//!
//! A challenge is an unpredictable, time-bound prompt the speaker must
//! satisfy in the recorded audio. Because the prompt is generated at
//! request time and expires within 30-60 seconds, a pre-recorded clip
//! cannot answer it.
//!
//! # Pipeline
//!
//! 1. [`ChallengeGenerator::enrollment_set`] / [`ChallengeGenerator::verification_challenge`]
//!    produce [`Challenge`]s.
//! 2. The caller displays the prompt and records audio.
//! 3. [`validate_response`] checks the transcript against the expected
//!    content, expiry first. Validation never fails with an error; it
//!    always returns a [`ChallengeOutcome`].

mod generator;
mod rng;
mod types;
mod validate;

pub use generator::{ChallengeGenerator, GeneratorConfig, UserProfile};
pub use types::{Challenge, ChallengeKind, ChallengeOutcome, Difficulty, Expected};
pub use validate::validate_response;

use thiserror::Error;

/// Errors from per-kind challenge generation. The enrollment set builder
/// catches these and substitutes a temporal challenge, so callers of the
/// public generator API never see them.
#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("profile data missing for personal challenge: {0}")]
    MissingProfile(String),
}
