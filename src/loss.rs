//! Softmax, cross-entropy and argmax decoding.
//!
//! Typical training flow:
//!
//! - run `network.forward_with_cache(...)` to get logits
//! - `softmax` the logits into class probabilities
//! - score them with `cross_entropy` against the one-hot target
//! - hand the probabilities to `network.backward(...)`

use crate::{Error, Result};

/// Floor applied to probabilities before taking the logarithm.
pub const PROB_EPSILON: f64 = 1e-15;

/// Numerically stable softmax over a single sample.
///
/// The maximum logit is subtracted before exponentiating, so large magnitudes
/// cannot overflow. Returns an empty vector for empty input.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let Some(max_logit) = logits.iter().copied().reduce(f64::max) else {
        return Vec::new();
    };

    let mut out: Vec<f64> = logits.iter().map(|&x| (x - max_logit).exp()).collect();
    let sum_exp: f64 = out.iter().sum();
    let inv_sum = 1.0 / sum_exp;
    for v in &mut out {
        *v *= inv_sum;
    }
    out
}

/// Cross-entropy of a probability vector against a one-hot target.
///
/// `-sum_i target[i] * ln(max(probs[i], PROB_EPSILON))`
pub fn cross_entropy(probs: &[f64], target: &[f64]) -> Result<f64> {
    if probs.len() != target.len() {
        return Err(Error::InvalidShape(format!(
            "probs len {} does not match target len {}",
            probs.len(),
            target.len()
        )));
    }

    let mut loss = 0.0_f64;
    for (&p, &t) in probs.iter().zip(target) {
        if t != 0.0 {
            loss -= t * p.max(PROB_EPSILON).ln();
        }
    }
    Ok(loss)
}

/// Index of the largest entry; ties resolve to the lowest index.
///
/// Fails if `values.len() != classes`.
pub fn argmax(values: &[f64], classes: usize) -> Result<usize> {
    if values.len() != classes || classes == 0 {
        return Err(Error::InvalidShape(format!(
            "argmax expects a vector of {classes} classes, got len {}",
            values.len()
        )));
    }

    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_distribution(p: &[f64]) {
        let sum: f64 = p.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12, "sum={sum}");
        assert!(p.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn softmax_is_a_distribution() {
        let p = softmax(&[1.0, 2.0, 3.0]);
        assert_distribution(&p);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn softmax_handles_extreme_logits() {
        let p = softmax(&[1000.0, -1000.0, 999.0]);
        assert_distribution(&p);
        assert_eq!(p[1], 0.0);

        let p = softmax(&[-1e308, -1e308]);
        assert_distribution(&p);
        assert!((p[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn cross_entropy_is_negative_log_of_true_class() {
        let probs = [0.2, 0.5, 0.3];
        let target = [0.0, 1.0, 0.0];
        let loss = cross_entropy(&probs, &target).unwrap();
        assert!((loss - (-(0.5_f64).ln())).abs() < 1e-12);
        assert!(loss >= 0.0);
    }

    #[test]
    fn cross_entropy_floors_zero_probability() {
        let loss = cross_entropy(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(loss.is_finite());
        assert!((loss - (-PROB_EPSILON.ln())).abs() < 1e-9);
    }

    #[test]
    fn cross_entropy_rejects_length_mismatch() {
        assert!(matches!(
            cross_entropy(&[0.5, 0.5], &[1.0]),
            Err(Error::InvalidShape(_))
        ));
    }

    #[test]
    fn argmax_picks_largest() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2], 3).unwrap(), 1);
        assert_eq!(argmax(&[0.5, 0.5], 2).unwrap(), 0);
        assert!(matches!(
            argmax(&[0.1, 0.7, 0.2], 10),
            Err(Error::InvalidShape(_))
        ));
    }
}
