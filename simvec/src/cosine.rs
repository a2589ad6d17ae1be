/// Compute the cosine similarity between two vectors, clamped to `[0, 1]`.
///
/// 1.0 means identical direction; anti-correlated vectors clamp to 0.0
/// because a negative similarity carries no extra information for
/// speaker matching.
///
/// Uses f64 intermediate precision. Returns 0.0 for zero vectors or
/// dimension mismatches (worst possible match).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot: f64 = 0.0;
    let mut norm_a: f64 = 0.0;
    let mut norm_b: f64 = 0.0;

    for i in 0..a.len() {
        let ai = a[i] as f64;
        let bi = b[i] as f64;
        dot += ai * bi;
        norm_a += ai * ai;
        norm_b += bi * bi;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    // Clamp to [0, 1]: the upper bound handles floating point error,
    // the lower bound folds anti-correlation into "no match".
    similarity.clamp(0.0, 1.0) as f32
}

/// Mean pairwise cosine similarity over a set of embeddings.
///
/// This is the consistency score used to gate voiceprint generation:
/// samples from one live speaker score high, a mixed set (different
/// speakers, or real plus synthetic) drags the mean down.
///
/// Returns `None` for fewer than two embeddings.
pub fn pairwise_consistency(embeddings: &[Vec<f32>]) -> Option<f32> {
    if embeddings.len() < 2 {
        return None;
    }

    let mut sum: f64 = 0.0;
    let mut pairs: usize = 0;
    for i in 0..embeddings.len() {
        for j in (i + 1)..embeddings.len() {
            sum += cosine_similarity(&embeddings[i], &embeddings[j]) as f64;
            pairs += 1;
        }
    }
    Some((sum / pairs as f64) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_score_one() {
        let v = [0.3f32, -0.2, 0.9, 0.1];
        let s = cosine_similarity(&v, &v);
        assert!((s - 1.0).abs() < 1e-6, "self-similarity: got {s}");
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let s = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(s.abs() < 1e-6, "orthogonal: got {s}");
    }

    #[test]
    fn opposite_vectors_clamp_to_zero() {
        let s = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert_eq!(s, 0.0, "anti-correlated must clamp, got {s}");
    }

    #[test]
    fn bounds_hold_for_unit_vectors() {
        let a = [0.6f32, 0.8];
        let b = [-0.8f32, 0.6];
        let s = cosine_similarity(&a, &b);
        assert!((0.0..=1.0).contains(&s), "out of bounds: {s}");
    }

    #[test]
    fn dimension_mismatch_scores_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn consistency_of_identical_set_is_one() {
        let set = vec![vec![1.0f32, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]];
        let c = pairwise_consistency(&set).unwrap();
        assert!((c - 1.0).abs() < 1e-6, "got {c}");
    }

    #[test]
    fn consistency_needs_two_embeddings() {
        assert!(pairwise_consistency(&[vec![1.0, 0.0]]).is_none());
        assert!(pairwise_consistency(&[]).is_none());
    }

    #[test]
    fn outlier_drags_consistency_down() {
        // Four near-identical prints plus one orthogonal outlier.
        let mut set = vec![vec![1.0f32, 0.0, 0.0]; 4];
        set.push(vec![0.0, 1.0, 0.0]);
        let c = pairwise_consistency(&set).unwrap();
        // 6 of 10 pairs score 1.0, 4 pairs score 0.0 -> mean 0.6.
        assert!((c - 0.6).abs() < 1e-6, "got {c}");
        assert!(c < 0.85, "outlier set must fail the consistency gate");
    }
}
