use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use texseg_classifiers::config::{ModelConfig, ModelType, TrainingParams};

use crate::util::validate_inputs;

/// Parameters of a `texseg train` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub images: Vec<PathBuf>,
    /// Class masks grouped by image: all masks of the first image, then all
    /// masks of the second, and so on.
    pub masks: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub model: ModelConfig,
    pub training: TrainingParams,
    /// When set, every class is shuffled and split with this ratio; the
    /// second part drives epoch selection.
    pub validation_ratio: Option<f64>,
    pub seed: Option<u64>,
    pub report: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            masks: Vec::new(),
            output_dir: PathBuf::from("texseg_model"),
            model: ModelConfig::default(),
            training: TrainingParams::default(),
            validation_ratio: None,
            seed: None,
            report: true,
        }
    }
}

impl TrainConfig {
    /// Load a training configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: TrainConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    /// Reads the optional config file, then applies the CLI overrides.
    pub fn from_arguments(config_path: Option<&PathBuf>, matches: &ArgMatches) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::load(path)?,
            None => {
                log::info!("No config provided; using defaults.");
                Self::default()
            }
        };

        if let Some(images) = matches.get_many::<PathBuf>("images") {
            config.images = images.cloned().collect();
        }
        if let Some(masks) = matches.get_many::<PathBuf>("masks") {
            config.masks = masks.cloned().collect();
        }
        if let Some(output_dir) = matches.get_one::<PathBuf>("output_dir") {
            config.output_dir = output_dir.clone();
        }
        if let Some(model_type) = matches.get_one::<String>("model_type") {
            config.model.model_type =
                ModelType::from_str(model_type).map_err(anyhow::Error::msg)?;
        }
        if let Some(max_epochs) = matches.get_one::<usize>("max_epochs") {
            config.training.max_epochs = *max_epochs;
        }
        if let Some(ratio) = matches.get_one::<f64>("validation_ratio") {
            config.validation_ratio = Some(*ratio);
        }
        if let Some(seed) = matches.get_one::<u64>("seed") {
            config.seed = Some(*seed);
            config.model.seed = *seed;
        }
        if matches.get_flag("no_report") {
            config.report = false;
        }

        if config_path.is_none() {
            let default_json = serde_json::to_string_pretty(&config).unwrap_or_default();
            log::info!("Effective config:\n{}", default_json);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_inputs("image", &self.images)?;
        validate_inputs("mask", &self.masks)?;
        if self.masks.len() % self.images.len() != 0 {
            anyhow::bail!(
                "{} mask(s) cannot be shared evenly between {} image(s)",
                self.masks.len(),
                self.images.len()
            );
        }
        if self.masks.len() == self.images.len() {
            anyhow::bail!(
                "{} mask(s) for {} image(s) describe a single class, at least two masks per image are required",
                self.masks.len(),
                self.images.len()
            );
        }
        if let Some(ratio) = self.validation_ratio {
            if !(ratio > 0.0 && ratio < 1.0) {
                anyhow::bail!("validation_ratio must be strictly between 0 and 1, got {}", ratio);
            }
        }
        self.model.validate()?;
        self.training.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::build_cli;

    fn train_matches(args: &[&str]) -> ArgMatches {
        let mut argv = vec!["texseg", "train"];
        argv.extend_from_slice(args);
        let matches = build_cli().try_get_matches_from(argv).unwrap();
        matches.subcommand_matches("train").unwrap().clone()
    }

    #[test]
    fn file_values_are_overridden_by_flags() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("image.png");
        let mask_a = dir.path().join("a.png");
        let mask_b = dir.path().join("b.png");
        for path in [&image, &mask_a, &mask_b] {
            fs::write(path, b"").unwrap();
        }

        let config_path = dir.path().join("train.json");
        let json = serde_json::json!({
            "images": [image],
            "masks": [mask_a, mask_b],
            "training": { "max_epochs": 40 },
            "model": { "learning_rate": 0.2, "Logistic": { "l2": 0.0 } }
        });
        fs::write(&config_path, json.to_string()).unwrap();

        let matches = train_matches(&[
            "--max-epochs",
            "7",
            "--model-type",
            "mlp",
            "--seed",
            "3",
            "--no-report",
        ]);
        let config = TrainConfig::from_arguments(Some(&config_path), &matches).unwrap();

        assert_eq!(config.masks.len(), 2);
        assert_eq!(config.training.max_epochs, 7);
        assert_eq!(config.training.target_error, 0.0001);
        assert_eq!(config.model.learning_rate, 0.2);
        assert_eq!(config.model.model_type, ModelType::default());
        assert_eq!(config.model.seed, 3);
        assert_eq!(config.seed, Some(3));
        assert!(!config.report);
    }

    #[test]
    fn missing_inputs_fail_validation() {
        let matches = train_matches(&["-i", "/nonexistent/image.png", "-m", "/nonexistent/m.png"]);
        assert!(TrainConfig::from_arguments(None, &matches).is_err());
    }

    #[test]
    fn invalid_validation_ratio_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("image.png");
        fs::write(&image, b"").unwrap();
        let config = TrainConfig {
            images: vec![image.clone()],
            masks: vec![image.clone(), image],
            validation_ratio: Some(1.0),
            ..TrainConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn one_mask_per_image_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("image.png");
        let mask = dir.path().join("mask.png");
        fs::write(&image, b"").unwrap();
        fs::write(&mask, b"").unwrap();
        let config = TrainConfig {
            images: vec![image],
            masks: vec![mask],
            ..TrainConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("single class"));
    }

    #[test]
    fn unreadable_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = TrainConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config"));
    }
}
