//! Pearson correlation and its significance test.
//!
//! The two-sided p-value comes from Student's t distribution with `n - 2`
//! degrees of freedom, `t = r * sqrt(df / (1 - r^2))`.

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Variance at or below this is treated as zero.
const VARIANCE_EPSILON: f64 = f64::EPSILON;

/// Arithmetic mean, or `None` for an empty slice.
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Pearson correlation over paired observations.
///
/// Returns `None` when fewer than two pairs exist or either side has zero
/// variance.
#[allow(clippy::cast_precision_loss)]
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx = dx.mul_add(dx, sxx);
        syy = dy.mul_add(dy, syy);
        sxy = dx.mul_add(dy, sxy);
    }

    if sxx <= VARIANCE_EPSILON || syy <= VARIANCE_EPSILON {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Pearson correlation over two nullable columns, using only rows where
/// both sides are present. Returns the coefficient and the pair count.
pub fn pearson_pairwise(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<(f64, usize)> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    pearson(&pairs).map(|r| (r, pairs.len()))
}

/// Two-sided p-value for a Pearson coefficient over `n` pairs.
///
/// Returns 1 when fewer than three pairs exist, and 0 for a perfect
/// correlation.
#[allow(clippy::cast_precision_loss)]
pub fn correlation_p_value(r: f64, n: usize) -> f64 {
    if n < 3 || !r.is_finite() {
        return 1.0;
    }
    let r2 = r * r;
    if r2 >= 1.0 {
        return 0.0;
    }
    let df = n.saturating_sub(2) as f64;
    let t = r * (df / (1.0 - r2)).sqrt();
    student_t_two_sided(t, df)
}

/// Two-sided tail probability of Student's t distribution.
///
/// Returns 1 when `df` is not a valid number of degrees of freedom.
pub fn student_t_two_sided(t: f64, df: f64) -> f64 {
    StudentsT::new(0.0, 1.0, df).map_or(1.0, |dist| (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    }

    #[test]
    fn perfect_linear_relationships() {
        let up: Vec<(f64, f64)> = (0..10).map(|i| (f64::from(i), 2.0 * f64::from(i) + 1.0)).collect();
        let down: Vec<(f64, f64)> = (0..10).map(|i| (f64::from(i), -f64::from(i))).collect();
        assert!(close(pearson(&up).unwrap_or(0.0), 1.0, 1e-12));
        assert!(close(pearson(&down).unwrap_or(0.0), -1.0, 1e-12));
    }

    #[test]
    fn known_coefficient() {
        // x = 1..5, y = [2, 4, 5, 4, 5]: r = 6 / sqrt(10 * 6) = 0.7745967
        let pairs = [(1.0, 2.0), (2.0, 4.0), (3.0, 5.0), (4.0, 4.0), (5.0, 5.0)];
        assert!(close(pearson(&pairs).unwrap_or(0.0), 0.774_596_669_241_483_4, 1e-12));
    }

    #[test]
    fn zero_variance_is_undefined() {
        let flat = [(1.0, 3.0), (2.0, 3.0), (3.0, 3.0)];
        assert_eq!(pearson(&flat), None);
        assert_eq!(pearson(&[(1.0, 2.0)]), None);
    }

    #[test]
    fn pairwise_skips_incomplete_rows() {
        let xs = [Some(1.0), None, Some(2.0), Some(3.0), Some(4.0)];
        let ys = [Some(2.0), Some(9.0), None, Some(6.0), Some(8.0)];
        let (r, n) = pearson_pairwise(&xs, &ys).unwrap_or((0.0, 0));
        assert_eq!(n, 3);
        assert!(close(r, 1.0, 1e-12));
    }

    #[test]
    fn p_value_matches_closed_forms() {
        let r = std::f64::consts::FRAC_1_SQRT_2;
        // One degree of freedom is the Cauchy distribution: t = 1 gives p = 0.5.
        assert!(close(correlation_p_value(r, 3), 0.5, 1e-10));
        // Two degrees of freedom: p = 1 - t / sqrt(2 + t^2) with t = sqrt(2).
        assert!(close(correlation_p_value(r, 4), 1.0 - std::f64::consts::SQRT_2 / 2.0, 1e-10));
    }

    #[test]
    fn p_value_matches_reference_table() {
        assert!(close(correlation_p_value(0.5, 12), 0.097_854_614_257_812_5, 1e-9));
        assert!(close(correlation_p_value(0.3, 30), 0.107_245_948_057_954_35, 1e-9));
        assert!(close(correlation_p_value(0.9, 8), 0.002_316_25, 1e-9));
        assert!(close(correlation_p_value(-0.9, 8), 0.002_316_25, 1e-9));
    }

    #[test]
    fn invalid_degrees_of_freedom_give_one() {
        assert!(close(student_t_two_sided(2.0, 0.0), 1.0, f64::EPSILON));
        assert!(close(student_t_two_sided(2.0, f64::NAN), 1.0, f64::EPSILON));
    }

    #[test]
    fn degenerate_p_values() {
        assert!(close(correlation_p_value(0.0, 20), 1.0, 1e-12));
        assert!(close(correlation_p_value(1.0, 20), 0.0, f64::EPSILON));
        assert!(close(correlation_p_value(0.8, 2), 1.0, f64::EPSILON));
    }
}
