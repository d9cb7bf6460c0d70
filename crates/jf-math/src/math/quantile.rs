//! Empirical quantiles with linear interpolation between order statistics.

/// The `q`-th quantile of `values`, interpolating linearly between the two
/// nearest order statistics (the numpy default).
///
/// Returns `None` for empty input, `q` outside `[0, 1]`, or any NaN value.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

/// Same as [`quantile`] for input already sorted ascending.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;
    let (a, b) = (sorted[lo], sorted[hi]);
    Some(a + frac * (b - a))
}

/// Fraction of `values` less than or equal to `x`.
pub fn empirical_cdf(values: &[f64], x: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|&&v| v <= x).count() as f64 / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn quantile_matches_linear_interpolation() {
        let v = [0.4, 0.1, 0.3, 0.2];
        assert!(approx_eq(quantile(&v, 0.0).unwrap(), 0.1));
        assert!(approx_eq(quantile(&v, 1.0).unwrap(), 0.4));
        // h = 3 * 0.5 = 1.5 -> halfway between 0.2 and 0.3
        assert!(approx_eq(quantile(&v, 0.5).unwrap(), 0.25));
        // h = 3 * 0.4 = 1.2
        assert!(approx_eq(quantile(&v, 0.4).unwrap(), 0.22));
    }

    #[test]
    fn quantile_single_value() {
        assert_eq!(quantile(&[0.7], 0.3), Some(0.7));
    }

    #[test]
    fn quantile_rejects_bad_input() {
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[0.1], 1.5), None);
        assert_eq!(quantile(&[0.1], -0.1), None);
        assert_eq!(quantile(&[0.1, f64::NAN], 0.5), None);
    }

    #[test]
    fn empirical_cdf_counts_inclusive() {
        let v = [0.1, 0.2, 0.2, 0.9];
        assert!(approx_eq(empirical_cdf(&v, 0.2), 0.75));
        assert_eq!(empirical_cdf(&[], 0.2), 0.0);
    }
}
