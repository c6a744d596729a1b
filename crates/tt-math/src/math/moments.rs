//! Batch moments for feature standardisation.

/// Arithmetic mean. NAN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by N). NAN for an empty slice.
///
/// Two-pass: the mean is computed first, then squared deviations.
pub fn population_variance(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.is_nan() {
        return f64::NAN;
    }
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn population_std(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}

/// Weighted mean `Σ wᵢxᵢ / Σ wᵢ`. NAN when the weights sum to zero.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    debug_assert_eq!(values.len(), weights.len());
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return f64::NAN;
    }
    values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn mean_and_population_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(approx_eq(mean(&v), 5.0, 1e-12));
        assert!(approx_eq(population_variance(&v), 4.0, 1e-12));
        assert!(approx_eq(population_std(&v), 2.0, 1e-12));
    }

    #[test]
    fn empty_is_nan() {
        assert!(mean(&[]).is_nan());
        assert!(population_std(&[]).is_nan());
    }

    #[test]
    fn constant_has_zero_spread() {
        assert_eq!(population_std(&[3.5; 10]), 0.0);
    }

    #[test]
    fn weighted_mean_basic() {
        assert!(approx_eq(weighted_mean(&[1.0, 3.0], &[3.0, 1.0]), 1.5, 1e-12));
        assert!(weighted_mean(&[1.0], &[0.0]).is_nan());
    }
}
