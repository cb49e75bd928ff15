use serde::{Deserialize, Serialize};

use crate::encoder::BinaryDataset;
use crate::error::ClassifierError;
use crate::models::classifier_trait::{
    check_dataset, check_finite, check_input, BinaryClassifier, ModelRecord,
};
use crate::models::{epoch_order, sigmoid};

/// Logistic regression trained by stochastic gradient descent on the log
/// loss, with an optional L2 penalty on the weights (not the bias).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    weights: Vec<f32>,
    bias: f32,
    learning_rate: f32,
    l2: f32,
    seed: u64,
    epochs_trained: usize,
}

impl LogisticRegression {
    /// All weights start at zero, so the first score of any sample is 0.5.
    pub fn new(input_size: usize, learning_rate: f32, l2: f32, seed: u64) -> Self {
        LogisticRegression {
            weights: vec![0.0; input_size],
            bias: 0.0,
            learning_rate,
            l2,
            seed,
            epochs_trained: 0,
        }
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        if self.weights.is_empty() {
            return Err("logistic regression has no weight".to_string());
        }
        if !self.weights.iter().chain(std::iter::once(&self.bias)).all(|w| w.is_finite()) {
            return Err("logistic regression holds non-finite weights".to_string());
        }
        Ok(())
    }

    fn score(&self, sample: &[f32]) -> f32 {
        let z: f32 = self.weights.iter().zip(sample).map(|(w, x)| w * x).sum();
        sigmoid(z + self.bias)
    }
}

impl BinaryClassifier for LogisticRegression {
    fn input_size(&self) -> usize {
        self.weights.len()
    }

    fn epochs_trained(&self) -> usize {
        self.epochs_trained
    }

    fn train_epoch(&mut self, data: &BinaryDataset) -> Result<f32, ClassifierError> {
        check_dataset(self.input_size(), data)?;
        let mut sum = 0.0f64;
        for index in epoch_order(data.len(), self.seed, self.epochs_trained) {
            let sample = data.sample(index);
            let error = self.score(sample) - data.label(index);
            sum += f64::from(error * error);

            for (w, x) in self.weights.iter_mut().zip(sample) {
                *w -= self.learning_rate * (error * x + self.l2 * *w);
            }
            self.bias -= self.learning_rate * error;
        }
        let epoch = self.epochs_trained;
        self.epochs_trained += 1;
        check_finite((sum / data.len() as f64) as f32, epoch)
    }

    fn infer(&self, sample: &[f32]) -> Result<f32, ClassifierError> {
        check_input(self.input_size(), sample.len())?;
        Ok(self.score(sample))
    }

    fn box_clone(&self) -> Box<dyn BinaryClassifier> {
        Box::new(self.clone())
    }

    fn to_record(&self) -> ModelRecord {
        ModelRecord::Logistic(self.clone())
    }

    fn name(&self) -> &str {
        "logistic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Array2;
    use std::sync::Arc;

    fn threshold_data() -> BinaryDataset {
        let values: Vec<f32> = (0..10).map(|i| i as f32 / 10.0).collect();
        let labels = values.iter().map(|&x| if x > 0.45 { 1.0 } else { 0.0 }).collect();
        let features = Array2::from_shape_vec((10, 1), values).unwrap();
        BinaryDataset::new(Arc::new(features), labels).unwrap()
    }

    #[test]
    fn untrained_model_is_undecided() {
        let model = LogisticRegression::new(3, 0.1, 0.0, 0);
        assert_eq!(model.infer(&[1.0, 2.0, 3.0]).unwrap(), 0.5);
    }

    #[test]
    fn learns_a_threshold() {
        let data = threshold_data();
        let mut model = LogisticRegression::new(1, 1.0, 0.0, 4);
        model.train_until(&data, 500, 0.0).unwrap();

        assert!(model.weights()[0] > 0.0);
        assert!(model.infer(&[0.9]).unwrap() > 0.5);
        assert!(model.infer(&[0.0]).unwrap() < 0.5);
        assert!(model.evaluate(&data).unwrap() < 0.1);
    }

    #[test]
    fn l2_shrinks_weights() {
        let data = threshold_data();
        let mut free = LogisticRegression::new(1, 0.5, 0.0, 4);
        let mut penalized = LogisticRegression::new(1, 0.5, 0.1, 4);
        free.train_until(&data, 100, 0.0).unwrap();
        penalized.train_until(&data, 100, 0.0).unwrap();
        assert!(penalized.weights()[0].abs() < free.weights()[0].abs());
    }

    #[test]
    fn wrong_input_size_is_reported() {
        let mut model = LogisticRegression::new(2, 0.1, 0.0, 0);
        assert!(matches!(
            model.train_epoch(&threshold_data()),
            Err(ClassifierError::InputSize {
                expected: 2,
                found: 1
            })
        ));
    }
}
