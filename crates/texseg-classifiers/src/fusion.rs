//! Turns the per-slot scores of one sample into a single label.
//!
//! Labels are 1-based class numbers; [`REJECTED`] means no class was
//! confident or dominant enough.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Label of a rejected sample.
pub const REJECTED: usize = 0;

/// Outcome of fusing the scores of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Zero-based dataset class.
    Class(usize),
    Rejected,
}

impl Decision {
    /// Output label: `class + 1`, or [`REJECTED`].
    pub const fn label(&self) -> usize {
        match self {
            Decision::Class(class) => *class + 1,
            Decision::Rejected => REJECTED,
        }
    }
}

/// Rank-with-margin fusion rule.
///
/// With several slots the best score must exceed `min_confidence`, and,
/// when `dominance_ratio` is set, the second best must stay below
/// `dominance_ratio * best`. A single slot is a plain threshold at
/// `min_confidence` and never rejects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionPolicy {
    pub min_confidence: f32,
    pub dominance_ratio: Option<f32>,
}

impl Default for FusionPolicy {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            dominance_ratio: Some(0.9),
        }
    }
}

impl FusionPolicy {
    pub fn new(min_confidence: f32, dominance_ratio: Option<f32>) -> Self {
        Self {
            min_confidence,
            dominance_ratio,
        }
    }

    /// The rule without the dominance margin.
    pub fn without_margin(min_confidence: f32) -> Self {
        Self::new(min_confidence, None)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_confidence.is_finite() {
            return Err(ConfigError::InvalidFusionPolicy(format!(
                "min_confidence must be finite, got {}",
                self.min_confidence
            )));
        }
        if let Some(ratio) = self.dominance_ratio {
            if !(ratio.is_finite() && ratio > 0.0 && ratio <= 1.0) {
                return Err(ConfigError::InvalidFusionPolicy(format!(
                    "dominance_ratio must be in (0, 1], got {}",
                    ratio
                )));
            }
        }
        Ok(())
    }

    /// Decides the class of one sample from its slot scores.
    ///
    /// With a single slot the positive side is dataset class 1, the negative
    /// side class 0, matching the one-vs-rest encoding of two classes.
    ///
    /// # Example
    ///
    /// ```
    /// use texseg_classifiers::fusion::{Decision, FusionPolicy};
    ///
    /// let policy = FusionPolicy::default();
    /// assert_eq!(policy.decide(&[0.95, 0.10, 0.05]).unwrap(), Decision::Class(0));
    /// assert_eq!(policy.decide(&[0.6, 0.55]).unwrap(), Decision::Rejected);
    /// ```
    pub fn decide(&self, scores: &[f32]) -> Result<Decision, ConfigError> {
        match scores {
            [] => Err(ConfigError::InvalidFusionPolicy(
                "cannot fuse an empty score vector".to_string(),
            )),
            [score] => Ok(if *score >= self.min_confidence {
                Decision::Class(1)
            } else {
                Decision::Class(0)
            }),
            _ => Ok(self.rank(scores)),
        }
    }

    /// Label of one sample, see [`FusionPolicy::decide`].
    pub fn fuse(&self, scores: &[f32]) -> Result<usize, ConfigError> {
        self.decide(scores).map(|decision| decision.label())
    }

    fn rank(&self, scores: &[f32]) -> Decision {
        let mut best = 0;
        for (i, score) in scores.iter().enumerate().skip(1) {
            if *score > scores[best] {
                best = i;
            }
        }
        let best_score = scores[best];
        let second_score = scores
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != best)
            .map(|(_, score)| *score)
            .fold(f32::NEG_INFINITY, f32::max);

        // NaN scores fail both comparisons and reject.
        if !(best_score > self.min_confidence) {
            return Decision::Rejected;
        }
        if let Some(ratio) = self.dominance_ratio {
            if !(second_score < ratio * best_score) {
                return Decision::Rejected;
            }
        }
        Decision::Class(best)
    }
}
