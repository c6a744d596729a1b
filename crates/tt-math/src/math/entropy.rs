//! Shannon entropy of discrete distributions.

/// Shannon entropy `-Σ p ln p` in nats, with `0 ln 0 = 0`.
///
/// Entries are used as given; callers normalise beforehand.
pub fn shannon_entropy(probs: &[f64]) -> f64 {
    probs
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.ln())
        .sum()
}

/// Shannon entropy divided by its maximum `ln(k)`, in `[0, 1]`.
///
/// A distribution over fewer than two outcomes carries no uncertainty and
/// returns 0.
pub fn normalized_entropy(probs: &[f64]) -> f64 {
    let k = probs.len();
    if k < 2 {
        return 0.0;
    }
    (shannon_entropy(probs) / (k as f64).ln()).clamp(0.0, 1.0)
}
