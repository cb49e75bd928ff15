//! Error types for texseg-classifiers.
//!
//! Errors are split by who has to act on them: [`ConfigError`] means the
//! caller's inputs cannot produce a valid model, [`SourceError`] wraps a
//! failing image/feature collaborator, and [`ClassifierError`] comes from a
//! training primitive. [`Error`] is the tagged union returned by the
//! pipeline components.

use std::path::PathBuf;

use thiserror::Error;

use crate::source::Extent;

/// Inputs that cannot produce a valid model. Never retried or corrected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A dataset was declared with zero classes.
    #[error("dataset has no classes")]
    NoClasses,

    /// A one-vs-rest model needs at least two classes.
    #[error("a single class cannot be separated from anything, at least two are required")]
    SingleClass,

    /// A class holds no sample.
    #[error("class #{class} is empty")]
    EmptyClass {
        /// Zero-based class index.
        class: usize,
    },

    /// A feature source reported zero components per sample.
    #[error("feature source has zero components per sample")]
    EmptyFeatures,

    /// A sample does not have the dataset's feature length.
    #[error("feature length mismatch: dataset uses {expected} components, source has {found}")]
    FeatureLengthMismatch {
        /// Feature length fixed by the first ingested sample.
        expected: usize,
        /// Feature length of the offending source.
        found: usize,
    },

    /// The split ratio is not a finite number in `[0, 1]`.
    #[error("invalid split ratio: {0} (must be a number between 0 and 1)")]
    InvalidSplitRatio(f64),

    /// A split would leave one side of a class empty.
    #[error(
        "cannot split class #{class} of {size} samples with ratio {ratio}: \
         it would produce an empty class ({first} / {second})"
    )]
    EmptySplit {
        /// Zero-based class index.
        class: usize,
        /// Number of samples in the class.
        size: usize,
        /// Requested ratio.
        ratio: f64,
        /// Size of the first part.
        first: usize,
        /// Size of the second part.
        second: usize,
    },

    /// The number of masks does not match the number of classes.
    #[error("expected {expected} mask(s), got {found}")]
    MaskCountMismatch {
        /// Number of masks required.
        expected: usize,
        /// Number of masks supplied.
        found: usize,
    },

    /// Training and validation ensembles have a different slot count.
    #[error("training ensemble has {training} slot(s) but validation ensemble has {validation}")]
    SlotCountMismatch {
        /// Slots in the training ensemble.
        training: usize,
        /// Slots in the validation ensemble.
        validation: usize,
    },

    /// An ensemble does not have one classifier per binary dataset.
    #[error("ensemble has {classifiers} classifier(s) for {datasets} binary dataset(s)")]
    ClassifierCountMismatch {
        /// Classifiers in the ensemble.
        classifiers: usize,
        /// Slots in the binary dataset ensemble.
        datasets: usize,
    },

    /// Training parameters are unusable.
    #[error("invalid training parameters: {0}")]
    InvalidTrainingParams(String),

    /// Fusion policy constants are unusable.
    #[error("invalid fusion policy: {0}")]
    InvalidFusionPolicy(String),

    /// A model configuration is unusable.
    #[error("invalid model configuration: {0}")]
    InvalidModel(String),
}

/// Failures of the image/feature collaborators.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A file could not be read or decoded.
    #[error("unable to read {}: {reason}", path.display())]
    Read {
        /// Offending path.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// A mask does not cover the same extent as its feature source.
    #[error(
        "the dimensions of the mask {} ({mask}) differ from the dimensions of the features ({features})",
        path.display()
    )]
    DimensionMismatch {
        /// Mask path, or a placeholder for in-memory masks.
        path: PathBuf,
        /// Extent of the mask.
        mask: Extent,
        /// Extent of the feature source.
        features: Extent,
    },

    /// A directory meant to hold an image series holds no image.
    #[error("no image found in series directory {}", .0.display())]
    EmptySeries(PathBuf),

    /// Slices of a series or channels of a stack disagree on their size.
    #[error("inconsistent image size in {}: expected {expected}, found {found}", path.display())]
    InconsistentSlices {
        /// Offending path.
        path: PathBuf,
        /// Extent of the first slice.
        expected: Extent,
        /// Extent of the offending slice.
        found: Extent,
    },

    /// An output file could not be written.
    #[error("unable to write {}: {reason}", path.display())]
    Write {
        /// Offending path.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },
}

/// Failures of a trainable binary classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The sample length does not match the classifier input size.
    #[error("classifier expects {expected} inputs, got {found}")]
    InputSize {
        /// Classifier input size.
        expected: usize,
        /// Sample length.
        found: usize,
    },

    /// Training or evaluation was asked on an empty dataset.
    #[error("cannot train or evaluate on an empty dataset")]
    EmptyDataset,

    /// The error metric stopped being finite.
    #[error("training diverged at epoch {epoch}: error is {error}")]
    Diverged {
        /// Epoch (zero-based) at which divergence was detected.
        epoch: usize,
        /// The non-finite error.
        error: f32,
    },

    /// A checkpoint could not be written.
    #[error("cannot save the classifier in {}: {reason}", path.display())]
    Save {
        /// Checkpoint path.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// A checkpoint could not be read.
    #[error("cannot load the classifier from {}: {reason}", path.display())]
    Load {
        /// Checkpoint path.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },
}

/// A training failure confined to one ensemble slot.
#[derive(Debug, Error)]
#[error("slot #{slot} failed: {source}")]
pub struct SlotError {
    /// Zero-based slot index.
    pub slot: usize,
    /// Underlying primitive failure.
    #[source]
    pub source: ClassifierError,
}

/// Tagged error returned by the pipeline components.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller must fix its input.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A collaborator failed to provide or accept data.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A training primitive failed.
    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    /// One or more ensemble slots failed to train.
    #[error("{} slot(s) failed to train", .0.len())]
    Slots(Vec<SlotError>),
}

impl Error {
    /// Returns true when the error is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type for texseg-classifiers operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_class_names_the_class() {
        let err = ConfigError::EmptyClass { class: 3 };
        assert!(err.to_string().contains("#3"));
    }

    #[test]
    fn empty_split_reports_ratio_and_sizes() {
        let err = ConfigError::EmptySplit {
            class: 1,
            size: 1,
            ratio: 0.7,
            first: 1,
            second: 0,
        };
        let message = err.to_string();
        assert!(message.contains("0.7"));
        assert!(message.contains("empty class"));
    }

    #[test]
    fn dimension_mismatch_reports_both_extents() {
        let err = SourceError::DimensionMismatch {
            path: PathBuf::from("mask.png"),
            mask: Extent::new(4, 4, 1),
            features: Extent::new(8, 4, 1),
        };
        let message = err.to_string();
        assert!(message.contains("mask.png"));
        assert!(message.contains("4x4x1"));
        assert!(message.contains("8x4x1"));
    }

    #[test]
    fn config_errors_are_tagged() {
        let err: Error = ConfigError::NoClasses.into();
        assert!(err.is_config());

        let err: Error = ClassifierError::EmptyDataset.into();
        assert!(!err.is_config());
    }

    #[test]
    fn slot_error_names_the_slot() {
        let err = SlotError {
            slot: 2,
            source: ClassifierError::EmptyDataset,
        };
        assert!(err.to_string().contains("slot #2"));
    }
}
