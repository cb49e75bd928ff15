pub mod classifier;
pub mod input;
