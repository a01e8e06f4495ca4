//! Score post-processing: softmax, arg-max and top-k ranking.

use std::cmp::Ordering;

use crate::error::{Error, Result};

/// Numerically stable softmax.
///
/// The maximum score is subtracted before exponentiating so large logits
/// cannot overflow.
///
/// # Errors
///
/// Returns [`Error::EmptyScores`] for an empty slice.
pub fn softmax(scores: &[f32]) -> Result<Vec<f32>> {
    let max = scores
        .iter()
        .copied()
        .reduce(f32::max)
        .ok_or(Error::EmptyScores)?;

    let mut probs: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = probs.iter().sum();
    for p in &mut probs {
        *p /= sum;
    }

    Ok(probs)
}

/// Index and value of the largest element; ties resolve to the lowest index.
///
/// # Errors
///
/// Returns [`Error::EmptyScores`] for an empty slice.
pub fn argmax(values: &[f32]) -> Result<(usize, f32)> {
    let mut iter = values.iter().copied().enumerate();
    let first = iter.next().ok_or(Error::EmptyScores)?;

    Ok(iter.fold(first, |best, (i, v)| if v > best.1 { (i, v) } else { best }))
}

/// Up to `k` `(index, value)` pairs, highest value first, ties by lower index.
#[must_use]
pub fn top_k(values: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = values.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    ranked.truncate(k);
    ranked
}
