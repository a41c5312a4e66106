//! Scoring functions over (label, prediction) pairs. Pairs past the
//! shorter of the two slices are ignored.

use std::cmp::Ordering;

/// Labels above this count as the positive class.
pub const POSITIVE_THRESHOLD: f64 = 0.5;

/// Area under the ROC curve, by trapezoids over descending score
/// thresholds with tied scores taken together. Single-class or empty
/// input scores 0.5.
pub fn auc(labels: &[f64], scores: &[f64]) -> f64 {
    let mut pairs: Vec<(f64, bool)> = scores
        .iter()
        .zip(labels)
        .map(|(&s, &y)| (s, y > POSITIVE_THRESHOLD))
        .collect();

    let positives = pairs.iter().filter(|(_, p)| *p).count() as f64;
    let negatives = pairs.len() as f64 - positives;
    if positives == 0.0 || negatives == 0.0 {
        return 0.5;
    }

    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let (mut tp, mut fp) = (0.0, 0.0);
    let mut area = 0.0;
    let mut i = 0;
    while i < pairs.len() {
        let threshold = pairs[i].0;
        let (tp_prev, fp_prev) = (tp, fp);
        while i < pairs.len() && pairs[i].0 == threshold {
            if pairs[i].1 {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            i += 1;
        }
        area += (fp - fp_prev) * (tp + tp_prev) / 2.0;
    }

    area / (positives * negatives)
}

/// Mean binary log-loss with the ledger's legacy convention: the
/// complement `q = 1 - p` is clamped off exact 0 and 1 and stands in for
/// the positive-class probability.
pub fn log_loss(labels: &[f64], predictions: &[f64]) -> f64 {
    let n = labels.len().min(predictions.len());
    if n == 0 {
        return 0.0;
    }

    let sum: f64 = labels
        .iter()
        .zip(predictions)
        .map(|(&y, &p)| {
            let mut q = 1.0 - p;
            if q == 0.0 {
                q = next_up_from_zero();
            } else if q == 1.0 {
                q = next_down_from_one();
            }
            y * q.ln() + (1.0 - y) * (1.0 - q).ln()
        })
        .sum();

    -sum / n as f64
}

fn next_up_from_zero() -> f64 {
    f64::from_bits(1)
}

fn next_down_from_one() -> f64 {
    f64::from_bits(1.0f64.to_bits() - 1)
}

/// Element-wise mean, truncated to the shortest input.
pub fn mean_vector(vectors: &[&[f64]]) -> Vec<f64> {
    let Some(len) = vectors.iter().map(|v| v.len()).min() else {
        return Vec::new();
    };
    let k = vectors.len() as f64;
    (0..len)
        .map(|i| vectors.iter().map(|v| v[i]).sum::<f64>() / k)
        .collect()
}

pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
