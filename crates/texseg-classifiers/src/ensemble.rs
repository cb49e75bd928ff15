//! The trained one-vs-rest ensemble: one binary classifier per slot.
//!
//! On disk an ensemble is a directory holding `000001.json`, `000002.json`
//! ... (one checkpoint per slot), an `ensemble.json` manifest and, for
//! slots trained with validation, `000001-training-scores.tsv` ...

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::encoder::{number_of_slots, positive_class, BinaryDatasetEnsemble};
use crate::error::{ClassifierError, ConfigError, Result};
use crate::fusion::FusionPolicy;
use crate::models::{build_model, checkpoint, BinaryClassifier};
use crate::source::FeatureSource;
use crate::trainer::{EpochScore, TrainingHistory};

/// File name of the ensemble manifest.
pub const MANIFEST_FILE: &str = "ensemble.json";

/// Checkpoint file of `slot` (1-based, six digits).
pub fn checkpoint_file_name(slot: usize) -> String {
    format!("{:06}.json", slot + 1)
}

/// Training-score file of `slot`.
pub fn scores_file_name(slot: usize) -> String {
    format!("{:06}-training-scores.tsv", slot + 1)
}

/// True for names of the form `dddddd.json`.
fn is_checkpoint_name(name: &str) -> bool {
    name.strip_suffix(".json")
        .map_or(false, |stem| stem.len() == 6 && stem.bytes().all(|b| b.is_ascii_digit()))
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    number_of_classes: usize,
    input_size: usize,
    positive_classes: Vec<usize>,
    classifiers: Vec<String>,
    #[serde(default)]
    created: Option<String>,
}

/// Fixed-size indexed array of binary classifiers.
#[derive(Debug, Clone)]
pub struct ClassifierEnsemble {
    slots: Vec<Box<dyn BinaryClassifier>>,
    number_of_classes: usize,
    histories: Vec<Option<TrainingHistory>>,
}

impl ClassifierEnsemble {
    /// One untrained classifier per slot of `datasets`. Slot `s` is seeded
    /// with `config.seed + s`.
    pub fn create(
        config: &ModelConfig,
        datasets: &BinaryDatasetEnsemble,
    ) -> std::result::Result<Self, ConfigError> {
        Self::with_classes(config, datasets.number_of_classes(), datasets.input_size())
    }

    /// One untrained classifier per slot needed for `number_of_classes`,
    /// which must be at least two.
    pub fn with_classes(
        config: &ModelConfig,
        number_of_classes: usize,
        input_size: usize,
    ) -> std::result::Result<Self, ConfigError> {
        match number_of_classes {
            0 => return Err(ConfigError::NoClasses),
            1 => return Err(ConfigError::SingleClass),
            _ => {}
        }
        let slots = (0..number_of_slots(number_of_classes))
            .map(|slot| {
                let seeded = config.clone().with_seed(config.seed.wrapping_add(slot as u64));
                build_model(&seeded, input_size)
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        log::debug!(
            "Created {} {} classifier(s) for {} classes",
            slots.len(),
            config.model_type.name(),
            number_of_classes
        );
        Ok(Self::from_parts(slots, number_of_classes))
    }

    /// Wraps existing classifiers. Their count must match
    /// `number_of_classes` and they must agree on their input size.
    pub fn from_slots(
        slots: Vec<Box<dyn BinaryClassifier>>,
        number_of_classes: usize,
    ) -> std::result::Result<Self, ConfigError> {
        match number_of_classes {
            0 => return Err(ConfigError::NoClasses),
            1 => return Err(ConfigError::SingleClass),
            _ => {}
        }
        let expected = number_of_slots(number_of_classes);
        if slots.len() != expected {
            return Err(ConfigError::ClassifierCountMismatch {
                classifiers: slots.len(),
                datasets: expected,
            });
        }
        let input_size = slots[0].input_size();
        if let Some(other) = slots.iter().find(|slot| slot.input_size() != input_size) {
            return Err(ConfigError::FeatureLengthMismatch {
                expected: input_size,
                found: other.input_size(),
            });
        }
        Ok(Self::from_parts(slots, number_of_classes))
    }

    fn from_parts(slots: Vec<Box<dyn BinaryClassifier>>, number_of_classes: usize) -> Self {
        let histories = vec![None; slots.len()];
        Self {
            slots,
            number_of_classes,
            histories,
        }
    }

    pub fn number_of_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn number_of_classes(&self) -> usize {
        self.number_of_classes
    }

    pub fn input_size(&self) -> usize {
        self.slots.first().map_or(0, |slot| slot.input_size())
    }

    pub fn slot(&self, index: usize) -> &dyn BinaryClassifier {
        self.slots[index].as_ref()
    }

    /// Dataset class scored by each slot.
    pub fn positive_classes(&self) -> Vec<usize> {
        (0..self.slots.len())
            .map(|slot| positive_class(self.number_of_classes, slot))
            .collect()
    }

    /// Validation history of `slot`, if it was trained with one.
    pub fn history(&self, slot: usize) -> Option<&TrainingHistory> {
        self.histories.get(slot).and_then(Option::as_ref)
    }

    pub fn histories(&self) -> &[Option<TrainingHistory>] {
        &self.histories
    }

    /// Swaps the classifier of `slot`, dropping its history.
    pub fn replace_slot(
        &mut self,
        slot: usize,
        classifier: Box<dyn BinaryClassifier>,
    ) -> std::result::Result<(), ConfigError> {
        if classifier.input_size() != self.input_size() {
            return Err(ConfigError::FeatureLengthMismatch {
                expected: self.input_size(),
                found: classifier.input_size(),
            });
        }
        self.slots[slot] = classifier;
        self.histories[slot] = None;
        Ok(())
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [Box<dyn BinaryClassifier>] {
        &mut self.slots
    }

    pub(crate) fn set_history(&mut self, slot: usize, history: Option<TrainingHistory>) {
        self.histories[slot] = history;
    }

    /// Score of `sample` under every slot, in slot order.
    pub fn scores(&self, sample: &[f32]) -> std::result::Result<Vec<f32>, ClassifierError> {
        self.slots.iter().map(|slot| slot.infer(sample)).collect()
    }

    /// Fused label of one sample: `0` when rejected, `1..=C` otherwise.
    pub fn classify(&self, sample: &[f32], policy: &FusionPolicy) -> Result<usize> {
        let scores = self.scores(sample)?;
        Ok(policy.fuse(&scores)?)
    }

    /// Label map of a whole feature source, one label per location.
    pub fn classify_image<F>(&self, features: &F, policy: &FusionPolicy) -> Result<Vec<usize>>
    where
        F: FeatureSource + Sync + ?Sized,
    {
        policy.validate()?;
        if features.number_of_components_per_sample() != self.input_size() {
            return Err(ConfigError::FeatureLengthMismatch {
                expected: self.input_size(),
                found: features.number_of_components_per_sample(),
            }
            .into());
        }

        let extent = features.extent();
        log::info!(
            "Classifying {} locations ({}) with {} slot(s)",
            extent.len(),
            extent,
            self.slots.len()
        );
        let labels = (0..extent.len())
            .into_par_iter()
            .map(|location| self.classify(features.sample_at(location), policy))
            .collect::<Result<Vec<_>>>()?;

        if log::log_enabled!(log::Level::Debug) {
            let rejected = labels.iter().filter(|&&label| label == 0).count();
            log::debug!("{} of {} locations rejected", rejected, labels.len());
        }
        Ok(labels)
    }

    /// Writes the ensemble into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let save_error = |path: &Path, reason: String| ClassifierError::Save {
            path: path.to_path_buf(),
            reason,
        };
        fs::create_dir_all(dir).map_err(|e| save_error(dir, e.to_string()))?;

        let mut classifiers = Vec::with_capacity(self.slots.len());
        for (slot, classifier) in self.slots.iter().enumerate() {
            let name = checkpoint_file_name(slot);
            checkpoint::save(classifier.as_ref(), &dir.join(&name))?;
            classifiers.push(name);

            if let Some(history) = &self.histories[slot] {
                let path = dir.join(scores_file_name(slot));
                write_scores(&path, history.epochs()).map_err(|e| save_error(&path, e))?;
            }
        }

        let manifest = Manifest {
            number_of_classes: self.number_of_classes,
            input_size: self.input_size(),
            positive_classes: self.positive_classes(),
            classifiers,
            created: Some(chrono::Local::now().to_rfc3339()),
        };
        let path = dir.join(MANIFEST_FILE);
        let file = File::create(&path).map_err(|e| save_error(&path, e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &manifest)
            .map_err(|e| save_error(&path, e.to_string()))?;
        writer.flush().map_err(|e| save_error(&path, e.to_string()))?;

        log::info!(
            "Saved {} classifier(s) to {}",
            self.slots.len(),
            dir.display()
        );
        Ok(())
    }

    /// Reads an ensemble written by [`ClassifierEnsemble::save`].
    ///
    /// Without a manifest, every `dddddd.json` file of `dir` is loaded in
    /// name order and the class count is inferred from the file count, a
    /// single file meaning two classes.
    pub fn load(dir: &Path) -> Result<Self> {
        let load_error = |path: &Path, reason: String| ClassifierError::Load {
            path: path.to_path_buf(),
            reason,
        };

        let manifest_path = dir.join(MANIFEST_FILE);
        let (files, number_of_classes, manifest) = if manifest_path.is_file() {
            let file = File::open(&manifest_path)
                .map_err(|e| load_error(&manifest_path, e.to_string()))?;
            let manifest: Manifest = serde_json::from_reader(BufReader::new(file))
                .map_err(|e| load_error(&manifest_path, e.to_string()))?;
            let files: Vec<PathBuf> = manifest.classifiers.iter().map(|name| dir.join(name)).collect();
            (files, manifest.number_of_classes, Some(manifest))
        } else {
            let files = checkpoint_files(dir).map_err(|e| load_error(dir, e))?;
            let number_of_classes = if files.len() == 1 { 2 } else { files.len() };
            (files, number_of_classes, None)
        };

        if files.is_empty() {
            return Err(load_error(dir, "no classifier found".to_string()).into());
        }

        let mut slots = Vec::with_capacity(files.len());
        let mut histories = Vec::with_capacity(files.len());
        for (slot, file) in files.iter().enumerate() {
            log::debug!("Loading slot #{} from {}", slot, file.display());
            slots.push(checkpoint::load(file)?);

            let scores = dir.join(scores_file_name(slot));
            let history = if scores.is_file() {
                let epochs = read_scores(&scores).map_err(|e| load_error(&scores, e))?;
                TrainingHistory::new(epochs)
            } else {
                None
            };
            histories.push(history);
        }

        let mut ensemble = Self::from_slots(slots, number_of_classes)
            .map_err(|e| load_error(dir, e.to_string()))?;
        if let Some(manifest) = manifest {
            if manifest.input_size != ensemble.input_size() {
                let reason = format!(
                    "manifest declares {} input components, classifiers expect {}",
                    manifest.input_size,
                    ensemble.input_size()
                );
                return Err(load_error(&manifest_path, reason).into());
            }
            let positive_classes = ensemble.positive_classes();
            if manifest.positive_classes != positive_classes {
                let reason = format!(
                    "manifest declares positive classes {:?}, expected {:?} for {} classes",
                    manifest.positive_classes, positive_classes, number_of_classes
                );
                return Err(load_error(&manifest_path, reason).into());
            }
        }
        ensemble.histories = histories;
        log::info!(
            "Loaded {} classifier(s) for {} classes from {}",
            ensemble.number_of_slots(),
            ensemble.number_of_classes(),
            dir.display()
        );
        Ok(ensemble)
    }
}

fn checkpoint_files(dir: &Path) -> std::result::Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| e.to_string())? {
        let path = entry.map_err(|e| e.to_string())?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, is_checkpoint_name);
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn write_scores(path: &Path, epochs: &[EpochScore]) -> std::result::Result<(), String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|e| e.to_string())?;
    for epoch in epochs {
        writer.serialize(epoch).map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())
}

fn read_scores(path: &Path) -> std::result::Result<Vec<EpochScore>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|e| e.to_string())?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<EpochScore>, _>>()
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelType;
    use crate::models::LogisticRegression;
    use crate::source::{Extent, FeatureImage};

    /// A logistic model whose score is `sigmoid(bias)` for any sample.
    fn constant(score_logit: f32, input_size: usize) -> Box<dyn BinaryClassifier> {
        let record = serde_json::json!({
            "model": "Logistic",
            "weights": vec![0.0; input_size],
            "bias": score_logit,
            "learning_rate": 0.1,
            "l2": 0.0,
            "seed": 0,
            "epochs_trained": 0,
        });
        let model: LogisticRegression = serde_json::from_value(record).unwrap();
        Box::new(model)
    }

    #[test]
    fn checkpoint_names() {
        assert_eq!(checkpoint_file_name(0), "000001.json");
        assert_eq!(scores_file_name(11), "000012-training-scores.tsv");
        assert!(is_checkpoint_name("000003.json"));
        assert!(!is_checkpoint_name("ensemble.json"));
        assert!(!is_checkpoint_name("00003.json"));
        assert!(!is_checkpoint_name("000003.json.bak"));
    }

    #[test]
    fn slot_count_follows_class_count() {
        let config = ModelConfig::default();
        assert_eq!(ClassifierEnsemble::with_classes(&config, 2, 4).unwrap().number_of_slots(), 1);
        assert_eq!(ClassifierEnsemble::with_classes(&config, 5, 4).unwrap().number_of_slots(), 5);
        assert!(ClassifierEnsemble::with_classes(&config, 0, 4).is_err());
        assert!(matches!(
            ClassifierEnsemble::with_classes(&config, 1, 4),
            Err(ConfigError::SingleClass)
        ));
        assert!(matches!(
            ClassifierEnsemble::from_slots(vec![constant(1.0, 4)], 1),
            Err(ConfigError::SingleClass)
        ));
    }

    #[test]
    fn slots_get_distinct_seeds() {
        let ensemble = ClassifierEnsemble::with_classes(&ModelConfig::default(), 3, 2).unwrap();
        assert_ne!(ensemble.slot(0).to_record(), ensemble.slot(1).to_record());
    }

    #[test]
    fn from_slots_checks_count_and_input_size() {
        let err = ClassifierEnsemble::from_slots(vec![constant(0.0, 2), constant(0.0, 2)], 3)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ClassifierCountMismatch { .. }));

        let err = ClassifierEnsemble::from_slots(vec![constant(0.0, 2), constant(0.0, 3)], 2)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ClassifierCountMismatch { .. }));

        let err = ClassifierEnsemble::from_slots(
            vec![constant(0.0, 2), constant(0.0, 3), constant(0.0, 2)],
            3,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::FeatureLengthMismatch {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn classify_fuses_slot_scores() {
        // sigmoid(3) ~ 0.95, sigmoid(-2.2) ~ 0.10, sigmoid(-3) ~ 0.05
        let ensemble = ClassifierEnsemble::from_slots(
            vec![constant(3.0, 1), constant(-2.2, 1), constant(-3.0, 1)],
            3,
        )
        .unwrap();
        let policy = FusionPolicy::default();
        assert_eq!(ensemble.classify(&[0.0], &policy).unwrap(), 1);
        assert_eq!(ensemble.positive_classes(), vec![0, 1, 2]);

        let undecided = ClassifierEnsemble::from_slots(
            vec![constant(0.4, 1), constant(0.2, 1), constant(-3.0, 1)],
            3,
        )
        .unwrap();
        assert_eq!(undecided.classify(&[0.0], &policy).unwrap(), 0);
    }

    #[test]
    fn binary_ensemble_labels_both_classes() {
        let positive = ClassifierEnsemble::from_slots(vec![constant(2.0, 1)], 2).unwrap();
        let negative = ClassifierEnsemble::from_slots(vec![constant(-2.0, 1)], 2).unwrap();
        let policy = FusionPolicy::default();
        assert_eq!(positive.classify(&[0.0], &policy).unwrap(), 2);
        assert_eq!(negative.classify(&[0.0], &policy).unwrap(), 1);
        assert_eq!(positive.positive_classes(), vec![1]);
    }

    #[test]
    fn classify_image_labels_every_location() {
        // Scores rise with the single feature: slot 0 likes high values.
        let slot0: LogisticRegression = serde_json::from_value(serde_json::json!({
            "weights": [10.0], "bias": -5.0, "learning_rate": 0.1,
            "l2": 0.0, "seed": 0, "epochs_trained": 0
        }))
        .unwrap();
        let slot1: LogisticRegression = serde_json::from_value(serde_json::json!({
            "weights": [-10.0], "bias": 5.0, "learning_rate": 0.1,
            "l2": 0.0, "seed": 0, "epochs_trained": 0
        }))
        .unwrap();
        let slot2 = constant(-5.0, 1);
        let ensemble =
            ClassifierEnsemble::from_slots(vec![Box::new(slot0), Box::new(slot1), slot2], 3)
                .unwrap();

        let image = FeatureImage::new(Extent::new(3, 1, 1), 1, vec![1.0, 0.0, 0.5]).unwrap();
        let labels = ensemble
            .classify_image(&image, &FusionPolicy::default())
            .unwrap();
        assert_eq!(labels, vec![1, 2, 0]);

        let wide = FeatureImage::new(Extent::new(1, 1, 1), 2, vec![0.0, 0.0]).unwrap();
        assert!(ensemble
            .classify_image(&wide, &FusionPolicy::default())
            .unwrap_err()
            .is_config());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig::new(0.1, ModelType::Logistic { l2: 0.0 });
        let mut ensemble = ClassifierEnsemble::with_classes(&config, 3, 2).unwrap();
        let history = TrainingHistory::new(vec![
            EpochScore {
                train_error: 0.3,
                validation_error: 0.4,
            },
            EpochScore {
                train_error: 0.2,
                validation_error: 0.35,
            },
        ]);
        ensemble.set_history(1, history.clone());

        ensemble.save(dir.path()).unwrap();
        assert!(dir.path().join("000001.json").is_file());
        assert!(dir.path().join("000003.json").is_file());
        assert!(dir.path().join(MANIFEST_FILE).is_file());
        assert!(dir.path().join("000002-training-scores.tsv").is_file());
        assert!(!dir.path().join("000001-training-scores.tsv").exists());

        let loaded = ClassifierEnsemble::load(dir.path()).unwrap();
        assert_eq!(loaded.number_of_classes(), 3);
        assert_eq!(loaded.number_of_slots(), 3);
        assert_eq!(loaded.input_size(), 2);
        assert_eq!(loaded.history(1), history.as_ref());
        assert!(loaded.history(0).is_none());
        for slot in 0..3 {
            assert_eq!(loaded.slot(slot).to_record(), ensemble.slot(slot).to_record());
        }
    }

    #[test]
    fn load_without_manifest_infers_class_count() {
        let dir = tempfile::tempdir().unwrap();
        let single = ClassifierEnsemble::from_slots(vec![constant(1.0, 2)], 2).unwrap();
        single.save(dir.path()).unwrap();
        fs::remove_file(dir.path().join(MANIFEST_FILE)).unwrap();
        fs::write(dir.path().join("notes.json"), "{}").unwrap();

        let loaded = ClassifierEnsemble::load(dir.path()).unwrap();
        assert_eq!(loaded.number_of_classes(), 2);
        assert_eq!(loaded.number_of_slots(), 1);
    }

    #[test]
    fn manifest_must_agree_with_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let ensemble = ClassifierEnsemble::from_slots(
            vec![constant(0.0, 2), constant(0.0, 2), constant(0.0, 2)],
            3,
        )
        .unwrap();
        ensemble.save(dir.path()).unwrap();
        let manifest_path = dir.path().join(MANIFEST_FILE);
        let original: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();

        let mut wrong_size = original.clone();
        wrong_size["input_size"] = serde_json::json!(5);
        fs::write(&manifest_path, wrong_size.to_string()).unwrap();
        let err = ClassifierEnsemble::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("input components"));

        let mut wrong_classes = original.clone();
        wrong_classes["positive_classes"] = serde_json::json!([2, 1, 0]);
        fs::write(&manifest_path, wrong_classes.to_string()).unwrap();
        let err = ClassifierEnsemble::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("positive classes"));

        fs::write(&manifest_path, original.to_string()).unwrap();
        assert!(ClassifierEnsemble::load(dir.path()).is_ok());
    }

    #[test]
    fn load_from_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ClassifierEnsemble::load(dir.path()).is_err());
    }
}
