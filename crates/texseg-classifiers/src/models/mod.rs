pub mod checkpoint;
pub mod classifier_trait;
pub mod factory;
pub mod logistic;
pub mod mlp;

pub use classifier_trait::{BinaryClassifier, ModelRecord};
pub use factory::build_model;
pub use logistic::LogisticRegression;
pub use mlp::Mlp;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Order in which epoch `epoch` visits `len` samples.
///
/// Derived from the model seed so training is reproducible without
/// reordering the shared dataset.
pub(crate) fn epoch_order(len: usize, seed: u64, epoch: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add((epoch as u64) << 32));
    order.shuffle(&mut rng);
    order
}

#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
