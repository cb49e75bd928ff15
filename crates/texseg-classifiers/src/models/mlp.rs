//! Fully connected sigmoid network trained by incremental back-propagation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::encoder::BinaryDataset;
use crate::error::ClassifierError;
use crate::models::classifier_trait::{
    check_dataset, check_finite, check_input, BinaryClassifier, ModelRecord,
};
use crate::models::{epoch_order, sigmoid};

const INIT_RANGE: f32 = 0.1;

/// One dense layer. `weights` is row-major `outputs x (inputs + 1)`, the
/// last column being the bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Layer {
    inputs: usize,
    outputs: usize,
    weights: Vec<f32>,
    /// Previous weight update, for momentum.
    #[serde(default)]
    steps: Vec<f32>,
}

impl Layer {
    fn random(inputs: usize, outputs: usize, rng: &mut StdRng) -> Self {
        let len = outputs * (inputs + 1);
        Layer {
            inputs,
            outputs,
            weights: (0..len)
                .map(|_| rng.gen_range(-INIT_RANGE..=INIT_RANGE))
                .collect(),
            steps: vec![0.0; len],
        }
    }

    fn forward(&self, input: &[f32], output: &mut Vec<f32>) {
        output.clear();
        output.extend(self.weights.chunks_exact(self.inputs + 1).map(|row| {
            let (weights, bias) = row.split_at(self.inputs);
            let z: f32 = weights.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + bias[0];
            sigmoid(z)
        }));
    }
}

/// Multi-layer perceptron with a single sigmoid output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
    layers: Vec<Layer>,
    learning_rate: f32,
    momentum: f32,
    seed: u64,
    epochs_trained: usize,
}

impl Mlp {
    /// Layer sizes are `input_size`, then `hidden_layers`, then 1.
    /// Weights start uniform in `[-0.1, 0.1]`.
    pub fn new(
        input_size: usize,
        hidden_layers: &[usize],
        learning_rate: f32,
        momentum: f32,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let sizes: Vec<usize> = std::iter::once(input_size)
            .chain(hidden_layers.iter().copied())
            .chain(std::iter::once(1))
            .collect();
        let layers = sizes
            .windows(2)
            .map(|pair| Layer::random(pair[0], pair[1], &mut rng))
            .collect();
        Mlp {
            layers,
            learning_rate,
            momentum,
            seed,
            epochs_trained: 0,
        }
    }

    /// Neuron count of every layer, input layer first.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self.layers.iter().map(|layer| layer.inputs).collect();
        sizes.extend(self.layers.last().map(|layer| layer.outputs));
        sizes
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        if self.layers.is_empty() {
            return Err("network has no layer".to_string());
        }
        for (i, layer) in self.layers.iter().enumerate() {
            let len = layer.outputs * (layer.inputs + 1);
            if layer.weights.len() != len {
                return Err(format!(
                    "layer {} holds {} weights, expected {}",
                    i,
                    layer.weights.len(),
                    len
                ));
            }
            if !layer.steps.is_empty() && layer.steps.len() != len {
                return Err(format!("layer {} has a malformed momentum buffer", i));
            }
        }
        for pair in self.layers.windows(2) {
            if pair[0].outputs != pair[1].inputs {
                return Err("consecutive layers disagree on their size".to_string());
            }
        }
        if self.layers.last().map(|layer| layer.outputs) != Some(1) {
            return Err("the output layer must have a single neuron".to_string());
        }
        Ok(())
    }

    /// Activations of every layer for `sample`, the sample itself first.
    fn activations(&self, sample: &[f32]) -> Vec<Vec<f32>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(sample.to_vec());
        for layer in &self.layers {
            let mut output = Vec::with_capacity(layer.outputs);
            if let Some(input) = activations.last() {
                layer.forward(input, &mut output);
            }
            activations.push(output);
        }
        activations
    }

    /// Forward pass then one gradient step towards `target`. Returns the
    /// squared error before the step.
    fn learn(&mut self, sample: &[f32], target: f32) -> f32 {
        let activations = self.activations(sample);
        let output = activations.last().map_or(0.0, |out| out[0]);
        let error = output - target;

        let mut deltas = vec![error * output * (1.0 - output)];
        for (index, layer) in self.layers.iter_mut().enumerate().rev() {
            let input = &activations[index];

            let mut previous = vec![0.0; layer.inputs];
            if index > 0 {
                for (o, delta) in deltas.iter().enumerate() {
                    let row = &layer.weights[o * (layer.inputs + 1)..][..layer.inputs];
                    for (p, w) in previous.iter_mut().zip(row) {
                        *p += w * delta;
                    }
                }
                for (p, a) in previous.iter_mut().zip(input) {
                    *p *= a * (1.0 - a);
                }
            }

            if layer.steps.len() != layer.weights.len() {
                layer.steps = vec![0.0; layer.weights.len()];
            }
            let stride = layer.inputs + 1;
            for (o, delta) in deltas.iter().enumerate() {
                for i in 0..stride {
                    let x = if i < layer.inputs { input[i] } else { 1.0 };
                    let k = o * stride + i;
                    let step = -self.learning_rate * delta * x + self.momentum * layer.steps[k];
                    layer.weights[k] += step;
                    layer.steps[k] = step;
                }
            }

            deltas = previous;
        }

        error * error
    }
}

impl BinaryClassifier for Mlp {
    fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |layer| layer.inputs)
    }

    fn epochs_trained(&self) -> usize {
        self.epochs_trained
    }

    fn train_epoch(&mut self, data: &BinaryDataset) -> Result<f32, ClassifierError> {
        check_dataset(self.input_size(), data)?;
        let mut sum = 0.0f64;
        for index in epoch_order(data.len(), self.seed, self.epochs_trained) {
            sum += f64::from(self.learn(data.sample(index), data.label(index)));
        }
        let epoch = self.epochs_trained;
        self.epochs_trained += 1;
        check_finite((sum / data.len() as f64) as f32, epoch)
    }

    fn infer(&self, sample: &[f32]) -> Result<f32, ClassifierError> {
        check_input(self.input_size(), sample.len())?;
        let mut input = sample.to_vec();
        let mut output = Vec::new();
        for layer in &self.layers {
            layer.forward(&input, &mut output);
            std::mem::swap(&mut input, &mut output);
        }
        Ok(input.first().copied().unwrap_or(0.0))
    }

    fn box_clone(&self) -> Box<dyn BinaryClassifier> {
        Box::new(self.clone())
    }

    fn to_record(&self) -> ModelRecord {
        ModelRecord::Mlp(self.clone())
    }

    fn name(&self) -> &str {
        "mlp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Array2;
    use std::sync::Arc;

    fn separable() -> BinaryDataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let x = i as f32 / 20.0;
            rows.extend([x, 1.0 - x]);
            labels.push(if x >= 0.5 { 1.0 } else { 0.0 });
        }
        let features = Array2::from_shape_vec((20, 2), rows).unwrap();
        BinaryDataset::new(Arc::new(features), labels).unwrap()
    }

    #[test]
    fn layer_sizes_and_initial_weights() {
        let mlp = Mlp::new(4, &[3, 2], 0.1, 0.0, 1);
        assert_eq!(mlp.layer_sizes(), vec![4, 3, 2, 1]);
        assert_eq!(mlp.input_size(), 4);
        assert!(mlp
            .layers
            .iter()
            .flat_map(|layer| layer.weights.iter())
            .all(|w| w.abs() <= INIT_RANGE));
        assert!(mlp.check().is_ok());
    }

    #[test]
    fn same_seed_same_network() {
        assert_eq!(Mlp::new(3, &[4], 0.1, 0.0, 9), Mlp::new(3, &[4], 0.1, 0.0, 9));
        assert_ne!(Mlp::new(3, &[4], 0.1, 0.0, 9), Mlp::new(3, &[4], 0.1, 0.0, 10));
    }

    #[test]
    fn infer_is_a_probability() {
        let mlp = Mlp::new(2, &[3], 0.1, 0.0, 0);
        let score = mlp.infer(&[0.3, 0.7]).unwrap();
        assert!((0.0..=1.0).contains(&score));
        assert!(matches!(
            mlp.infer(&[0.3]),
            Err(ClassifierError::InputSize {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn training_reduces_error() {
        let data = separable();
        let mut mlp = Mlp::new(2, &[4], 0.5, 0.5, 3);
        let before = mlp.evaluate(&data).unwrap();
        mlp.train_until(&data, 300, 0.0).unwrap();
        let after = mlp.evaluate(&data).unwrap();
        assert_eq!(mlp.epochs_trained(), 300);
        assert!(after < before, "{} should be below {}", after, before);
        assert!(mlp.infer(&[0.95, 0.05]).unwrap() > mlp.infer(&[0.05, 0.95]).unwrap());
    }

    #[test]
    fn train_until_stops_at_target() {
        let data = separable();
        let mut mlp = Mlp::new(2, &[2], 0.1, 0.0, 3);
        mlp.train_until(&data, 50, 1.0).unwrap();
        assert_eq!(mlp.epochs_trained(), 1);
    }

    #[test]
    fn empty_dataset_is_an_error() {
        let features = Arc::new(Array2::with_capacity(0, 2));
        let data = BinaryDataset::new(features, Vec::new()).unwrap();
        let mut mlp = Mlp::new(2, &[2], 0.1, 0.0, 0);
        assert!(matches!(
            mlp.train_epoch(&data),
            Err(ClassifierError::EmptyDataset)
        ));
        assert_eq!(mlp.epochs_trained(), 0);
    }

    #[test]
    fn malformed_record_is_detected() {
        let mut mlp = Mlp::new(2, &[2], 0.1, 0.0, 0);
        mlp.layers[1].weights.pop();
        assert!(mlp.check().is_err());
    }
}
