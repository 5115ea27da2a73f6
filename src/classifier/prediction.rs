use crate::error::{ClassificationError, Result};
use std::fmt;

/// Top class of a single classification
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub index: usize,
    pub label: String,
    pub confidence: f32,
}

impl Prediction {
    /// Pick the highest-scoring class.
    ///
    /// Raw logits go through softmax; outputs that already form a probability
    /// distribution are used as-is. NaN scores never win and the confidence
    /// always lies in `[0, 1]`.
    pub fn from_scores(scores: &[f32], labels: &[String]) -> Result<Self> {
        let probabilities = if is_distribution(scores) {
            scores.to_vec()
        } else {
            softmax(scores)
        };

        let (index, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .ok_or(ClassificationError::NoResult)?;

        let label = labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| index.to_string());

        Ok(Self {
            index,
            label,
            confidence,
        })
    }

    /// Text shown to the user
    #[must_use]
    pub fn render(&self, show_confidence: bool) -> String {
        if show_confidence {
            format!("{} ({:.1}%)", self.label, self.confidence * 100.0)
        } else {
            self.label.clone()
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

fn is_distribution(scores: &[f32]) -> bool {
    !scores.is_empty()
        && scores.iter().all(|p| (0.0..=1.0).contains(p))
        && (scores.iter().sum::<f32>() - 1.0).abs() < 1e-3
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    // Infinite logits share all of the mass
    let saturated = scores.iter().filter(|s| **s == f32::INFINITY).count();
    if saturated > 0 {
        #[allow(clippy::cast_precision_loss)]
        let share = 1.0 / saturated as f32;
        return scores
            .iter()
            .map(|s| if *s == f32::INFINITY { share } else { 0.0 })
            .collect();
    }

    let max = scores
        .iter()
        .copied()
        .filter(|s| s.is_finite())
        .fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().filter(|e| e.is_finite()).sum();
    exps.into_iter().map(|e| e / sum).collect()
}
