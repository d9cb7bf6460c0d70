//! Quantile calibration.

/// Threshold at the `q`-th quantile of `probs` (linear interpolation).
///
/// `None` for an empty sample, a non-finite score, or `q` outside `[0, 1]`;
/// callers keep their current threshold in that case.
pub fn calculate_th_from_test(probs: &[f64], q: f64) -> Option<f64> {
    if probs.iter().any(|p| !p.is_finite()) {
        return None;
    }
    jf_math::quantile(probs, q)
}

/// The trailing `n` items of `items`.
pub fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_even_sample_interpolates() {
        let th = calculate_th_from_test(&[0.1, 0.4, 0.2, 0.3], 0.5).unwrap();
        assert!((th - 0.25).abs() < 1e-12);
    }

    #[test]
    fn extremes_are_min_and_max() {
        let probs = [0.9, 0.05, 0.5];
        assert_eq!(calculate_th_from_test(&probs, 0.0), Some(0.05));
        assert_eq!(calculate_th_from_test(&probs, 1.0), Some(0.9));
    }

    #[test]
    fn rejects_degenerate_input() {
        assert_eq!(calculate_th_from_test(&[], 0.5), None);
        assert_eq!(calculate_th_from_test(&[0.1, f64::NAN], 0.5), None);
        assert_eq!(calculate_th_from_test(&[0.1], 1.5), None);
    }

    #[test]
    fn tail_clamps() {
        assert_eq!(tail(&[1, 2, 3], 2), &[2, 3]);
        assert_eq!(tail(&[1, 2, 3], 10), &[1, 2, 3]);
        assert!(tail::<u8>(&[], 4).is_empty());
    }
}
