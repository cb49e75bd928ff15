//! Class-grouped feature vectors.
//!
//! A [`Dataset`] owns one [`Class`] per output category; every [`Sample`] in
//! every class has the same feature length. The feature length is unknown
//! (reported as `0`) until the first sample is added.

use crate::error::ConfigError;

/// One immutable feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample(Box<[f32]>);

impl Sample {
    pub fn new(values: impl Into<Box<[f32]>>) -> Self {
        Self(values.into())
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f32>> for Sample {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

impl From<&[f32]> for Sample {
    fn from(values: &[f32]) -> Self {
        Self::new(values)
    }
}

impl AsRef<[f32]> for Sample {
    fn as_ref(&self) -> &[f32] {
        self.as_slice()
    }
}

/// Ordered samples of one category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Class {
    samples: Vec<Sample>,
}

impl Class {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub(crate) fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub(crate) fn extend(&mut self, samples: impl IntoIterator<Item = Sample>) {
        self.samples.extend(samples);
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [Sample] {
        &mut self.samples
    }
}

impl From<Vec<Sample>> for Class {
    fn from(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}

/// Ordered classes sharing one feature length.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    classes: Vec<Class>,
    feature_length: usize,
}

impl Dataset {
    /// `number_of_classes` empty classes with an unknown feature length.
    pub fn new(number_of_classes: usize) -> Self {
        Self::with_feature_length(number_of_classes, 0)
    }

    pub(crate) fn with_feature_length(number_of_classes: usize, feature_length: usize) -> Self {
        Self {
            classes: vec![Class::new(); number_of_classes],
            feature_length,
        }
    }

    /// Builds a dataset from raw per-class vectors, enforcing a uniform
    /// feature length.
    pub fn from_classes(classes: Vec<Vec<Vec<f32>>>) -> Result<Self, ConfigError> {
        let mut dataset = Self::new(classes.len());
        for (index, samples) in classes.into_iter().enumerate() {
            for values in samples {
                dataset.push_sample(index, Sample::from(values))?;
            }
        }
        Ok(dataset)
    }

    pub fn number_of_classes(&self) -> usize {
        self.classes.len()
    }

    /// Components per sample, `0` while no sample has been added.
    pub fn feature_length(&self) -> usize {
        self.feature_length
    }

    pub fn class(&self, index: usize) -> &Class {
        &self.classes[index]
    }

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    pub fn class_sizes(&self) -> Vec<usize> {
        self.classes.iter().map(Class::len).collect()
    }

    pub fn total_samples(&self) -> usize {
        self.classes.iter().map(Class::len).sum()
    }

    /// Succeeds iff there is at least one class and no class is empty.
    pub fn check_valid(&self) -> Result<(), ConfigError> {
        if self.classes.is_empty() {
            return Err(ConfigError::NoClasses);
        }
        if let Some(class) = self.classes.iter().position(Class::is_empty) {
            return Err(ConfigError::EmptyClass { class });
        }
        Ok(())
    }

    /// Checks that samples of `length` components may join this dataset.
    pub(crate) fn check_feature_length(&self, length: usize) -> Result<(), ConfigError> {
        if length == 0 {
            return Err(ConfigError::EmptyFeatures);
        }
        if self.feature_length != 0 && self.feature_length != length {
            return Err(ConfigError::FeatureLengthMismatch {
                expected: self.feature_length,
                found: length,
            });
        }
        Ok(())
    }

    /// Fixes the feature length on first use, rejects any other length after.
    pub(crate) fn accept_feature_length(&mut self, length: usize) -> Result<(), ConfigError> {
        self.check_feature_length(length)?;
        self.feature_length = length;
        Ok(())
    }

    pub(crate) fn push_sample(&mut self, class: usize, sample: Sample) -> Result<(), ConfigError> {
        self.accept_feature_length(sample.len())?;
        self.classes[class].push(sample);
        Ok(())
    }

    pub(crate) fn class_mut(&mut self, index: usize) -> &mut Class {
        &mut self.classes[index]
    }

    pub(crate) fn classes_mut(&mut self) -> &mut [Class] {
        &mut self.classes
    }
}
