//! One-vs-rest reduction of a class-grouped dataset to binary datasets.
//!
//! All slots share a single feature matrix holding every sample in
//! class-major order; each slot owns its own label vector.

use std::ops::Range;
use std::sync::Arc;

use crate::dataset::Dataset;
use crate::error::ConfigError;
use crate::math::{Array2, ShapeError};

/// Number of binary classifiers needed for `number_of_classes` classes.
///
/// Two classes need a single classifier, the second class being "not the
/// first".
pub const fn number_of_slots(number_of_classes: usize) -> usize {
    if number_of_classes == 2 {
        1
    } else {
        number_of_classes
    }
}

/// Class whose samples are labeled positive in `slot`.
pub const fn positive_class(number_of_classes: usize, slot: usize) -> usize {
    if number_of_classes == 2 {
        1
    } else {
        slot
    }
}

/// Feature rows with a 0/1 target per row.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryDataset {
    features: Arc<Array2<f32>>,
    labels: Vec<f32>,
}

impl BinaryDataset {
    /// `labels` holds one target per feature row.
    pub fn new(features: Arc<Array2<f32>>, labels: Vec<f32>) -> Result<Self, ShapeError> {
        ShapeError::check(features.nrows(), 1, labels.len())?;
        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Length of every sample.
    pub fn input_size(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> &Array2<f32> {
        &self.features
    }

    pub fn labels(&self) -> &[f32] {
        &self.labels
    }

    pub fn sample(&self, index: usize) -> &[f32] {
        self.features.row_slice(index)
    }

    pub fn label(&self, index: usize) -> f32 {
        self.labels[index]
    }

    /// Number of samples labeled 1.
    pub fn positive_count(&self) -> usize {
        self.labels.iter().filter(|&&label| label == 1.0).count()
    }

    /// `(sample, label)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (&[f32], f32)> + '_ {
        self.features.rows().zip(self.labels.iter().copied())
    }

    /// True when both datasets hold the very same feature buffer.
    pub fn shares_features_with(&self, other: &BinaryDataset) -> bool {
        Arc::ptr_eq(&self.features, &other.features)
    }
}

/// One binary dataset per classifier slot.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryDatasetEnsemble {
    slots: Vec<BinaryDataset>,
    number_of_classes: usize,
    positive_ranges: Vec<Range<usize>>,
}

impl BinaryDatasetEnsemble {
    pub fn number_of_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn number_of_classes(&self) -> usize {
        self.number_of_classes
    }

    pub fn input_size(&self) -> usize {
        self.slots.first().map_or(0, BinaryDataset::input_size)
    }

    pub fn slot(&self, index: usize) -> &BinaryDataset {
        &self.slots[index]
    }

    pub fn slots(&self) -> &[BinaryDataset] {
        &self.slots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BinaryDataset> {
        self.slots.iter()
    }

    /// Rows labeled positive in `slot`.
    pub fn positive_range(&self, slot: usize) -> Range<usize> {
        self.positive_ranges[slot].clone()
    }

    /// Dataset class labeled positive by each slot.
    pub fn positive_classes(&self) -> Vec<usize> {
        (0..self.slots.len())
            .map(|slot| positive_class(self.number_of_classes, slot))
            .collect()
    }
}

/// Derives the binary datasets of a one-vs-rest ensemble.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneVsRestEncoder;

impl OneVsRestEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encodes `dataset`, which must pass [`Dataset::check_valid`].
    ///
    /// Slot `s` labels the samples of class `s` with 1 and every other
    /// sample with 0, except for two classes where the single slot labels
    /// class 1 positive. A dataset must pass [`Dataset::check_valid`] and
    /// hold at least two classes.
    ///
    /// # Example
    ///
    /// ```
    /// use texseg_classifiers::dataset::Dataset;
    /// use texseg_classifiers::encoder::OneVsRestEncoder;
    ///
    /// let dataset = Dataset::from_classes(vec![
    ///     vec![vec![0.0], vec![0.1]],
    ///     vec![vec![1.0], vec![0.9], vec![0.8]],
    /// ])
    /// .unwrap();
    /// let ensemble = OneVsRestEncoder::new().encode(&dataset).unwrap();
    /// assert_eq!(ensemble.number_of_slots(), 1);
    /// assert_eq!(ensemble.slot(0).labels(), &[0.0, 0.0, 1.0, 1.0, 1.0]);
    /// ```
    pub fn encode(&self, dataset: &Dataset) -> Result<BinaryDatasetEnsemble, ConfigError> {
        dataset.check_valid()?;
        if dataset.number_of_classes() == 1 {
            return Err(ConfigError::SingleClass);
        }

        let number_of_classes = dataset.number_of_classes();
        let feature_length = dataset.feature_length();
        let mut features = Array2::with_capacity(dataset.total_samples(), feature_length);
        let mut class_ranges = Vec::with_capacity(number_of_classes);
        for class in dataset.classes() {
            let start = features.nrows();
            for sample in class.iter() {
                features.push_row(sample.as_slice());
            }
            class_ranges.push(start..features.nrows());
        }
        let features = Arc::new(features);
        let total = features.nrows();

        let slots = number_of_slots(number_of_classes);
        let mut binary = Vec::with_capacity(slots);
        let mut positive_ranges = Vec::with_capacity(slots);
        for slot in 0..slots {
            let range = class_ranges[positive_class(number_of_classes, slot)].clone();
            let mut labels = vec![0.0; total];
            labels[range.clone()].fill(1.0);
            log::debug!(
                "Slot #{}: {} positive samples out of {}",
                slot,
                range.len(),
                total
            );
            binary.push(BinaryDataset {
                features: Arc::clone(&features),
                labels,
            });
            positive_ranges.push(range);
        }

        Ok(BinaryDatasetEnsemble {
            slots: binary,
            number_of_classes,
            positive_ranges,
        })
    }
}
