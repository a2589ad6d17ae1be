//! Small OS-entropy helpers. Challenge unpredictability rests on these,
//! so they draw from `getrandom` rather than a seeded PRNG.

/// A uniform random u32 from OS entropy.
pub fn rand_u32() -> u32 {
    let mut buf = [0u8; 4];
    getrandom::fill(&mut buf).expect("os entropy unavailable");
    u32::from_le_bytes(buf)
}

/// A random value in `[0, n)`. `n` must be non-zero.
pub fn rand_below(n: u32) -> u32 {
    // Rejection sampling to avoid modulo bias.
    let limit = u32::MAX - (u32::MAX % n);
    loop {
        let v = rand_u32();
        if v < limit {
            return v % n;
        }
    }
}

/// A random value in `[lo, hi]` inclusive.
pub fn rand_range(lo: u32, hi: u32) -> u32 {
    lo + rand_below(hi - lo + 1)
}

/// Fisher-Yates shuffle.
pub fn shuffle<T>(items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rand_below((i + 1) as u32) as usize;
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rand_below_stays_in_range() {
        for _ in 0..200 {
            assert!(rand_below(7) < 7);
        }
    }

    #[test]
    fn rand_range_inclusive() {
        for _ in 0..200 {
            let v = rand_range(4, 6);
            assert!((4..=6).contains(&v));
        }
    }

    #[test]
    fn shuffle_preserves_elements() {
        let mut v = vec![1, 2, 3, 4, 5];
        shuffle(&mut v);
        v.sort_unstable();
        assert_eq!(v, vec![1, 2, 3, 4, 5]);
    }
}
