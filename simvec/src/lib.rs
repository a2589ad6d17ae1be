//! Embedding vector math shared by enrollment and verification scoring.
//!
//! All intermediate arithmetic runs in f64 to keep scores stable across
//! platforms; inputs and outputs stay f32 to match the embedding models.
//!
//! - [`cosine_similarity`]: clamped similarity in `[0, 1]`
//! - [`pairwise_consistency`]: mean pairwise similarity over a sample set
//! - [`l2_normalize`] / [`mean_embedding`]: voiceprint aggregation
//! - [`stddev`]: spread of per-print similarities for confidence scoring

mod cosine;
mod stats;

pub use cosine::{cosine_similarity, pairwise_consistency};
pub use stats::{l2_normalize, mean_embedding, stddev};

use thiserror::Error;

/// Errors returned by embedding aggregation.
#[derive(Debug, Error)]
pub enum SimvecError {
    #[error("empty embedding set")]
    Empty,

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}
