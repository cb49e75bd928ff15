//! Trains every slot of a classifier ensemble, one rayon task per slot.
//!
//! Without a validation set each slot trains until the epoch budget is spent
//! or the target error is reached. With one, each slot runs the full budget
//! and keeps the snapshot of the epoch with the lowest validation error.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::TrainingParams;
use crate::encoder::{BinaryDataset, BinaryDatasetEnsemble};
use crate::ensemble::ClassifierEnsemble;
use crate::error::{ClassifierError, ConfigError, Error, Result, SlotError};
use crate::models::classifier_trait::{check_dataset, check_finite};
use crate::models::BinaryClassifier;

/// Errors measured after one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochScore {
    pub train_error: f32,
    pub validation_error: f32,
}

/// Per-epoch scores of one slot and the epoch that was kept.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingHistory {
    epochs: Vec<EpochScore>,
    best_epoch: usize,
}

impl TrainingHistory {
    /// Selects the epoch with the lowest validation error, the earliest one
    /// on ties. Returns `None` for an empty history.
    pub fn new(epochs: Vec<EpochScore>) -> Option<Self> {
        let mut best: Option<usize> = None;
        for (epoch, score) in epochs.iter().enumerate() {
            match best {
                Some(b) if !(score.validation_error < epochs[b].validation_error) => {}
                _ => best = Some(epoch),
            }
        }
        best.map(|best_epoch| Self { epochs, best_epoch })
    }

    pub fn epochs(&self) -> &[EpochScore] {
        &self.epochs
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Zero-based index of the kept epoch.
    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }

    pub fn best_score(&self) -> EpochScore {
        self.epochs[self.best_epoch]
    }
}

/// Outcome of training one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotReport {
    pub slot: usize,
    /// Epochs run during this call.
    pub epochs_run: usize,
    /// Training error of the kept model.
    pub train_error: f32,
    /// Validation error of the kept model, when a validation set was given.
    pub validation_error: Option<f32>,
    /// Kept epoch (zero-based), when a validation set was given.
    pub best_epoch: Option<usize>,
}

/// Drives the training of a [`ClassifierEnsemble`].
#[derive(Debug, Clone, Copy)]
pub struct Trainer {
    params: TrainingParams,
}

impl Trainer {
    pub fn new(params: TrainingParams) -> std::result::Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Trains every slot of `ensemble` on the matching slot of `training`.
    ///
    /// Slots train in parallel and fail independently: when some slots fail,
    /// the others still receive their trained model and the failures are
    /// returned together as [`Error::Slots`]. Such an ensemble is only
    /// partially trained and should not be used for classification.
    pub fn train(
        &self,
        ensemble: &mut ClassifierEnsemble,
        training: &BinaryDatasetEnsemble,
        validation: Option<&BinaryDatasetEnsemble>,
    ) -> Result<Vec<SlotReport>> {
        self.check_shapes(ensemble, training, validation)?;

        log::info!(
            "Training {} slot(s) for {} epoch(s){}",
            training.number_of_slots(),
            self.params.max_epochs,
            if validation.is_some() {
                " with validation"
            } else {
                ""
            }
        );

        let outcomes: Vec<std::result::Result<(SlotReport, Option<TrainingHistory>), SlotError>> =
            ensemble
                .slots_mut()
                .par_iter_mut()
                .enumerate()
                .map(|(slot, classifier)| {
                    let data = training.slot(slot);
                    let outcome = match validation {
                        None => self.train_slot(slot, classifier, data),
                        Some(validation) => {
                            self.train_slot_with_validation(slot, classifier, data, validation.slot(slot))
                        }
                    };
                    outcome.map_err(|source| SlotError { slot, source })
                })
                .collect();

        let mut reports = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok((report, history)) => {
                    ensemble.set_history(report.slot, history);
                    reports.push(report);
                }
                Err(failure) => {
                    log::error!("{}", failure);
                    failures.push(failure);
                }
            }
        }

        if failures.is_empty() {
            Ok(reports)
        } else {
            Err(Error::Slots(failures))
        }
    }

    fn check_shapes(
        &self,
        ensemble: &ClassifierEnsemble,
        training: &BinaryDatasetEnsemble,
        validation: Option<&BinaryDatasetEnsemble>,
    ) -> std::result::Result<(), ConfigError> {
        if ensemble.number_of_slots() != training.number_of_slots() {
            return Err(ConfigError::ClassifierCountMismatch {
                classifiers: ensemble.number_of_slots(),
                datasets: training.number_of_slots(),
            });
        }
        if ensemble.input_size() != training.input_size() {
            return Err(ConfigError::FeatureLengthMismatch {
                expected: ensemble.input_size(),
                found: training.input_size(),
            });
        }
        if let Some(validation) = validation {
            if validation.number_of_slots() != training.number_of_slots() {
                return Err(ConfigError::SlotCountMismatch {
                    training: training.number_of_slots(),
                    validation: validation.number_of_slots(),
                });
            }
            if validation.input_size() != training.input_size() {
                return Err(ConfigError::FeatureLengthMismatch {
                    expected: training.input_size(),
                    found: validation.input_size(),
                });
            }
        }
        Ok(())
    }

    fn train_slot(
        &self,
        slot: usize,
        classifier: &mut Box<dyn BinaryClassifier>,
        data: &BinaryDataset,
    ) -> std::result::Result<(SlotReport, Option<TrainingHistory>), ClassifierError> {
        let start = classifier.epochs_trained();
        let error = classifier.train_until(data, self.params.max_epochs, self.params.target_error)?;
        let epochs_run = classifier.epochs_trained() - start;
        log::info!(
            "Slot #{}: {} epoch(s), training error {}",
            slot,
            epochs_run,
            error
        );
        Ok((
            SlotReport {
                slot,
                epochs_run,
                train_error: error,
                validation_error: None,
                best_epoch: None,
            },
            None,
        ))
    }

    fn train_slot_with_validation(
        &self,
        slot: usize,
        classifier: &mut Box<dyn BinaryClassifier>,
        training: &BinaryDataset,
        validation: &BinaryDataset,
    ) -> std::result::Result<(SlotReport, Option<TrainingHistory>), ClassifierError> {
        check_dataset(classifier.input_size(), training)?;
        check_dataset(classifier.input_size(), validation)?;

        let mut epochs = Vec::with_capacity(self.params.max_epochs);
        let mut best: Option<(f32, Box<dyn BinaryClassifier>)> = None;
        for epoch in 0..self.params.max_epochs {
            classifier.train_epoch(training)?;
            let train_error = check_finite(classifier.evaluate(training)?, epoch)?;
            let validation_error = check_finite(classifier.evaluate(validation)?, epoch)?;
            log::debug!(
                "Slot #{} epoch {}: train {} validation {}",
                slot,
                epoch + 1,
                train_error,
                validation_error
            );

            if best
                .as_ref()
                .map_or(true, |(error, _)| validation_error < *error)
            {
                best = Some((validation_error, classifier.box_clone()));
            }
            epochs.push(EpochScore {
                train_error,
                validation_error,
            });
        }

        if let Some((_, snapshot)) = best {
            *classifier = snapshot;
        }
        let history = TrainingHistory::new(epochs).ok_or(ClassifierError::EmptyDataset)?;
        let kept = history.best_score();
        log::info!(
            "Slot #{}: kept epoch {} of {} (train {}, validation {})",
            slot,
            history.best_epoch() + 1,
            history.len(),
            kept.train_error,
            kept.validation_error
        );

        Ok((
            SlotReport {
                slot,
                epochs_run: history.len(),
                train_error: kept.train_error,
                validation_error: Some(kept.validation_error),
                best_epoch: Some(history.best_epoch()),
            },
            Some(history),
        ))
    }
}
