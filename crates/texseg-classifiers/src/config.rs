use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ConfigError;

pub use crate::fusion::FusionPolicy;

/// Central configuration for the binary classifiers of an ensemble.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub learning_rate: f32,

    /// Seed of the weight initialisation and of the per-epoch sample order.
    /// Slot `s` uses `seed + s`.
    #[serde(default)]
    pub seed: u64,

    #[serde(flatten)]
    pub model_type: ModelType,
}

/// Supported model types and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    /// Fully connected sigmoid network, one sigmoid output.
    Mlp {
        hidden_layers: Vec<usize>,
        momentum: f32,
    },
    /// Logistic regression with an L2 penalty.
    Logistic { l2: f32 },
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::Mlp {
            hidden_layers: vec![3],
            momentum: 0.0,
        }
    }
}

impl ModelType {
    /// Short lowercase name, the one accepted by `from_str`.
    pub fn name(&self) -> &'static str {
        match self {
            ModelType::Mlp { .. } => "mlp",
            ModelType::Logistic { .. } => "logistic",
        }
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mlp" => Ok(ModelType::default()),
            "logistic" => Ok(ModelType::Logistic { l2: 0.0 }),
            _ => Err(format!(
                "Unknown model type: {}. Expected one of: mlp, logistic",
                s
            )),
        }
    }
}

impl ModelConfig {
    pub fn new(learning_rate: f32, model_type: ModelType) -> Self {
        Self {
            learning_rate,
            seed: 0,
            model_type,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Rejects hyper-parameters no model can train with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::InvalidModel(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        match &self.model_type {
            ModelType::Mlp {
                hidden_layers,
                momentum,
            } => {
                if hidden_layers.contains(&0) {
                    return Err(ConfigError::InvalidModel(
                        "hidden layers cannot be empty".to_string(),
                    ));
                }
                if !(0.0..1.0).contains(momentum) {
                    return Err(ConfigError::InvalidModel(format!(
                        "momentum must be in [0, 1), got {}",
                        momentum
                    )));
                }
            }
            ModelType::Logistic { l2 } => {
                if !(l2.is_finite() && *l2 >= 0.0) {
                    return Err(ConfigError::InvalidModel(format!(
                        "l2 penalty must be non-negative, got {}",
                        l2
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            seed: 0,
            model_type: ModelType::default(),
        }
    }
}

/// Epoch budget and early-stop threshold of a training run.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct TrainingParams {
    pub max_epochs: usize,
    /// Training stops early once the epoch error is at most this value.
    /// Ignored when a validation set drives epoch selection.
    pub target_error: f32,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            max_epochs: 1000,
            target_error: 0.0001,
        }
    }
}

impl TrainingParams {
    pub fn new(max_epochs: usize, target_error: f32) -> Self {
        Self {
            max_epochs,
            target_error,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_epochs == 0 {
            return Err(ConfigError::InvalidTrainingParams(
                "max_epochs must be at least 1".to_string(),
            ));
        }
        if !(self.target_error.is_finite() && self.target_error >= 0.0) {
            return Err(ConfigError::InvalidTrainingParams(format!(
                "target_error must be a non-negative number, got {}",
                self.target_error
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_type_from_str() {
        assert_eq!("MLP".parse::<ModelType>().unwrap(), ModelType::default());
        assert_eq!(
            "logistic".parse::<ModelType>().unwrap(),
            ModelType::Logistic { l2: 0.0 }
        );
        assert!("svm".parse::<ModelType>().is_err());
    }

    #[test]
    fn model_config_json_is_flattened() {
        let json = r#"{"learning_rate": 0.5, "Logistic": {"l2": 0.01}}"#;
        let config: ModelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.learning_rate, 0.5);
        assert_eq!(config.seed, 0);
        assert_eq!(config.model_type, ModelType::Logistic { l2: 0.01 });

        let back = serde_json::to_string(&config).unwrap();
        assert!(back.contains("\"Logistic\""));
    }

    #[test]
    fn model_config_validation() {
        assert!(ModelConfig::default().validate().is_ok());
        assert!(ModelConfig::new(0.0, ModelType::default()).validate().is_err());
        let empty_layer = ModelType::Mlp {
            hidden_layers: vec![4, 0],
            momentum: 0.0,
        };
        assert!(ModelConfig::new(0.1, empty_layer).validate().is_err());
        let negative = ModelType::Logistic { l2: -1.0 };
        assert!(ModelConfig::new(0.1, negative).validate().is_err());
    }

    #[test]
    fn training_params_defaults_and_validation() {
        let params: TrainingParams = serde_json::from_str(r#"{"max_epochs": 5}"#).unwrap();
        assert_eq!(params, TrainingParams::new(5, 0.0001));
        assert!(params.validate().is_ok());
        assert!(TrainingParams::new(0, 0.1).validate().is_err());
        assert!(TrainingParams::new(10, f32::NAN).validate().is_err());
    }
}
