//! Numerically stable primitives for log-domain mixture math.

/// ln(2*pi)
pub const LOG_2PI: f64 = 1.837_877_066_409_345_5;

/// Stable log(sum(exp(values))).
///
/// Returns NEG_INFINITY for empty input or all -inf inputs.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let mut sum = 0.0;
    for v in values {
        sum += (*v - max).exp();
    }
    max + sum.ln()
}

/// Convert log-weights into probabilities in place.
///
/// Returns the normaliser `log_sum_exp(log_weights)`. When the normaliser is
/// not finite the slice is left untouched and the caller decides on a
/// fallback.
pub fn normalize_log_weights(log_weights: &mut [f64]) -> f64 {
    let lse = log_sum_exp(log_weights);
    if !lse.is_finite() {
        return lse;
    }
    for w in log_weights.iter_mut() {
        *w = (*w - lse).exp();
    }
    lse
}

/// Natural log that maps 0 to NEG_INFINITY instead of producing NaN for
/// tiny negative rounding residue.
pub fn safe_ln(x: f64) -> f64 {
    if x <= 0.0 {
        f64::NEG_INFINITY
    } else {
        x.ln()
    }
}
