use crate::SimvecError;

/// Normalize a vector to unit L2 length in place.
/// Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let mut norm: f64 = 0.0;
    for &x in v.iter() {
        norm += (x as f64) * (x as f64);
    }
    norm = norm.sqrt();
    if norm > 0.0 {
        let scale = (1.0 / norm) as f32;
        for x in v.iter_mut() {
            *x *= scale;
        }
    }
}

/// Element-wise mean of a set of equal-length embeddings, L2-normalized.
///
/// This is how an accepted enrollment sample set becomes a voiceprint.
pub fn mean_embedding(embeddings: &[Vec<f32>]) -> Result<Vec<f32>, SimvecError> {
    let first = embeddings.first().ok_or(SimvecError::Empty)?;
    let dim = first.len();
    if dim == 0 {
        return Err(SimvecError::Empty);
    }

    let mut acc = vec![0.0f64; dim];
    for e in embeddings {
        if e.len() != dim {
            return Err(SimvecError::DimensionMismatch {
                expected: dim,
                got: e.len(),
            });
        }
        for (a, &x) in acc.iter_mut().zip(e.iter()) {
            *a += x as f64;
        }
    }

    let n = embeddings.len() as f64;
    let mut mean: Vec<f32> = acc.into_iter().map(|a| (a / n) as f32).collect();
    l2_normalize(&mut mean);
    Ok(mean)
}

/// Population standard deviation of a score set.
/// Returns 0.0 for fewer than two values.
pub fn stddev(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean: f64 = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var: f64 = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    var.sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_normalize_unit() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize(&mut v);
        let norm: f64 = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_zero_untouched() {
        let mut v = vec![0.0f32, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }

    #[test]
    fn mean_embedding_is_normalized() {
        let set = vec![vec![2.0f32, 0.0], vec![0.0, 2.0]];
        let m = mean_embedding(&set).unwrap();
        let norm: f64 = m.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6, "mean must be unit length");
        assert!((m[0] - m[1]).abs() < 1e-6, "equal contribution expected");
    }

    #[test]
    fn mean_embedding_rejects_mixed_dimensions() {
        let set = vec![vec![1.0f32, 0.0], vec![1.0, 0.0, 0.0]];
        assert!(matches!(
            mean_embedding(&set),
            Err(SimvecError::DimensionMismatch { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn mean_embedding_rejects_empty() {
        assert!(matches!(mean_embedding(&[]), Err(SimvecError::Empty)));
    }

    #[test]
    fn stddev_of_constant_is_zero() {
        assert_eq!(stddev(&[0.7, 0.7, 0.7]), 0.0);
        assert_eq!(stddev(&[0.7]), 0.0);
    }

    #[test]
    fn stddev_of_spread_scores() {
        let s = stddev(&[0.0, 1.0]);
        assert!((s - 0.5).abs() < 1e-6, "got {s}");
    }
}
