//! Dataset shuffling and ratio-based splitting.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::ConfigError;

/// A random source that is reproducible when `seed` is set.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// Permutes the samples of every class in place, each class independently
/// (Fisher-Yates).
pub fn shuffle<R: Rng + ?Sized>(dataset: &mut Dataset, rng: &mut R) {
    for class in dataset.classes_mut() {
        class.samples_mut().shuffle(rng);
    }
}

/// Proportion of every class that goes to the first part of a split.
///
/// # Example
///
/// ```
/// use texseg_classifiers::split::SplitRatio;
///
/// let ratio = SplitRatio::new(0.7).unwrap();
/// assert_eq!(ratio.sizes(10), (7, 3));
/// assert_eq!(ratio.sizes(5), (4, 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatio(f64);

impl SplitRatio {
    /// Accepts any finite ratio in `[0, 1]`; whether it empties a class is
    /// only known once class sizes are.
    pub fn new(ratio: f64) -> Result<Self, ConfigError> {
        if ratio.is_finite() && (0.0..=1.0).contains(&ratio) {
            Ok(Self(ratio))
        } else {
            Err(ConfigError::InvalidSplitRatio(ratio))
        }
    }

    pub const fn value(&self) -> f64 {
        self.0
    }

    /// `(first, second)` sizes for a class of `size` samples, the first size
    /// rounded half away from zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn sizes(&self, size: usize) -> (usize, usize) {
        let first = ((size as f64) * self.0).round() as usize;
        let first = first.min(size);
        (first, size - first)
    }
}

/// Splits every class at `round(n * ratio)`: the first samples, in the
/// class's current order, go to the first dataset and the rest to the second.
///
/// Both results keep the class count and feature length and share nothing
/// with `dataset`. Fails if any class would end up empty on either side.
pub fn split(dataset: &Dataset, ratio: f64) -> Result<(Dataset, Dataset), ConfigError> {
    let ratio = SplitRatio::new(ratio)?;
    if dataset.number_of_classes() == 0 {
        return Err(ConfigError::NoClasses);
    }

    let sizes = dataset
        .classes()
        .iter()
        .enumerate()
        .map(|(class, samples)| {
            let (first, second) = ratio.sizes(samples.len());
            if first == 0 || second == 0 {
                return Err(ConfigError::EmptySplit {
                    class,
                    size: samples.len(),
                    ratio: ratio.value(),
                    first,
                    second,
                });
            }
            Ok(first)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let number_of_classes = dataset.number_of_classes();
    let feature_length = dataset.feature_length();
    let mut first = Dataset::with_feature_length(number_of_classes, feature_length);
    let mut second = Dataset::with_feature_length(number_of_classes, feature_length);

    for (i, (class, cut)) in dataset.classes().iter().zip(sizes).enumerate() {
        let (head, tail) = class.samples().split_at(cut);
        log::debug!(
            "Class #{}: first set will be {} samples long, second set will be {} samples long",
            i,
            head.len(),
            tail.len()
        );
        first.class_mut(i).extend(head.iter().cloned());
        second.class_mut(i).extend(tail.iter().cloned());
    }

    Ok((first, second))
}
