use crate::config::{ModelConfig, ModelType};
use crate::error::ConfigError;
use crate::models::classifier_trait::BinaryClassifier;
use crate::models::logistic::LogisticRegression;
use crate::models::mlp::Mlp;

/// Build a boxed, untrained classifier from a `ModelConfig`.
pub fn build_model(
    config: &ModelConfig,
    input_size: usize,
) -> Result<Box<dyn BinaryClassifier>, ConfigError> {
    config.validate()?;
    if input_size == 0 {
        return Err(ConfigError::EmptyFeatures);
    }

    Ok(match &config.model_type {
        ModelType::Mlp {
            hidden_layers,
            momentum,
        } => Box::new(Mlp::new(
            input_size,
            hidden_layers,
            config.learning_rate,
            *momentum,
            config.seed,
        )),
        ModelType::Logistic { l2 } => Box::new(LogisticRegression::new(
            input_size,
            config.learning_rate,
            *l2,
            config.seed,
        )),
    })
}
