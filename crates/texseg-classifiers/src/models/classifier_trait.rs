use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encoder::BinaryDataset;
use crate::error::ClassifierError;
use crate::models::logistic::LogisticRegression;
use crate::models::mlp::Mlp;

/// A trainable binary classifier filling one ensemble slot.
///
/// Scores are in `[0, 1]`, 1 meaning "positive class". Errors are mean
/// squared errors between scores and 0/1 labels.
pub trait BinaryClassifier: Send + Sync + fmt::Debug {
    /// Expected sample length.
    fn input_size(&self) -> usize;

    /// Epochs run since creation.
    fn epochs_trained(&self) -> usize;

    /// Runs one pass over `data` and returns the mean squared error seen
    /// during that pass.
    fn train_epoch(&mut self, data: &BinaryDataset) -> Result<f32, ClassifierError>;

    /// Score of one sample.
    fn infer(&self, sample: &[f32]) -> Result<f32, ClassifierError>;

    fn box_clone(&self) -> Box<dyn BinaryClassifier>;

    /// Serializable snapshot of the model.
    fn to_record(&self) -> ModelRecord;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }

    /// Trains until `max_epochs` epochs ran or the epoch error drops to
    /// `target_error`. Returns the last epoch error.
    fn train_until(
        &mut self,
        data: &BinaryDataset,
        max_epochs: usize,
        target_error: f32,
    ) -> Result<f32, ClassifierError> {
        check_dataset(self.input_size(), data)?;
        let mut error = f32::INFINITY;
        for epoch in 0..max_epochs {
            error = self.train_epoch(data)?;
            log::trace!("{} epoch {}: mse {}", self.name(), epoch + 1, error);
            if error <= target_error {
                log::debug!(
                    "{} reached target error {} after {} epochs",
                    self.name(),
                    target_error,
                    epoch + 1
                );
                break;
            }
        }
        Ok(error)
    }

    /// Mean squared error of the model on `data`.
    fn evaluate(&self, data: &BinaryDataset) -> Result<f32, ClassifierError> {
        check_dataset(self.input_size(), data)?;
        let mut sum = 0.0f64;
        for (sample, label) in data.iter() {
            let diff = f64::from(self.infer(sample)? - label);
            sum += diff * diff;
        }
        Ok((sum / data.len() as f64) as f32)
    }
}

impl Clone for Box<dyn BinaryClassifier> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Checks `data` is non-empty and holds samples of `input_size` components.
pub(crate) fn check_dataset(input_size: usize, data: &BinaryDataset) -> Result<(), ClassifierError> {
    if data.is_empty() {
        return Err(ClassifierError::EmptyDataset);
    }
    check_input(input_size, data.input_size())
}

pub(crate) fn check_input(expected: usize, found: usize) -> Result<(), ClassifierError> {
    if expected != found {
        return Err(ClassifierError::InputSize { expected, found });
    }
    Ok(())
}

/// Fails with [`ClassifierError::Diverged`] when `error` is not finite.
pub(crate) fn check_finite(error: f32, epoch: usize) -> Result<f32, ClassifierError> {
    if error.is_finite() {
        Ok(error)
    } else {
        Err(ClassifierError::Diverged { epoch, error })
    }
}

/// On-disk form of every supported classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model")]
pub enum ModelRecord {
    Mlp(Mlp),
    Logistic(LogisticRegression),
}

impl ModelRecord {
    /// Checks the record describes a usable model.
    pub fn check(&self) -> Result<(), String> {
        match self {
            ModelRecord::Mlp(mlp) => mlp.check(),
            ModelRecord::Logistic(logistic) => logistic.check(),
        }
    }

    pub fn into_classifier(self) -> Box<dyn BinaryClassifier> {
        match self {
            ModelRecord::Mlp(mlp) => Box::new(mlp),
            ModelRecord::Logistic(logistic) => Box::new(logistic),
        }
    }
}
