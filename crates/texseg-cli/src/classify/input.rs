use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use texseg_classifiers::fusion::FusionPolicy;

use crate::util::validate_inputs;

/// Parameters of a `texseg classify` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    pub images: Vec<PathBuf>,
    pub model_dir: PathBuf,
    pub output_dir: PathBuf,
    pub fusion: FusionPolicy,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            model_dir: PathBuf::from("texseg_model"),
            output_dir: PathBuf::from("texseg_labels"),
            fusion: FusionPolicy::default(),
        }
    }
}

impl ClassifyConfig {
    /// Load a classification configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: ClassifyConfig = serde_json::from_str(&content)
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
        if let Some(model_dir) = matches.get_one::<PathBuf>("model_dir") {
            config.model_dir = model_dir.clone();
        }
        if let Some(output_dir) = matches.get_one::<PathBuf>("output_dir") {
            config.output_dir = output_dir.clone();
        }
        if let Some(min_confidence) = matches.get_one::<f32>("min_confidence") {
            config.fusion.min_confidence = *min_confidence;
        }
        if let Some(ratio) = matches.get_one::<f32>("dominance_ratio") {
            config.fusion.dominance_ratio = Some(*ratio);
        }
        if matches.get_flag("no_margin") {
            config.fusion.dominance_ratio = None;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_inputs("image", &self.images)?;
        if !self.model_dir.is_dir() {
            anyhow::bail!("Model directory does not exist: {}", self.model_dir.display());
        }
        self.fusion.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::build_cli;

    #[test]
    fn flags_override_fusion_policy() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("image.png");
        fs::write(&image, b"").unwrap();
        let model_dir = dir.path().to_str().unwrap();
        let image_arg = image.to_str().unwrap();

        let matches = build_cli()
            .try_get_matches_from([
                "texseg",
                "classify",
                "-i",
                image_arg,
                "-n",
                model_dir,
                "--min-confidence",
                "0.7",
                "--no-margin",
            ])
            .unwrap();
        let matches = matches.subcommand_matches("classify").unwrap();
        let config = ClassifyConfig::from_arguments(None, matches).unwrap();

        assert_eq!(config.fusion, FusionPolicy::without_margin(0.7));
        assert_eq!(config.images, vec![image]);
    }

    #[test]
    fn config_file_defaults_fill_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classify.json");
        fs::write(&path, r#"{ "fusion": { "dominance_ratio": 0.8 } }"#).unwrap();

        let config = ClassifyConfig::load(&path).unwrap();
        assert_eq!(config.fusion, FusionPolicy::new(0.5, Some(0.8)));
        assert_eq!(config.output_dir, PathBuf::from("texseg_labels"));
        assert!(config.validate().is_err());
    }
}
