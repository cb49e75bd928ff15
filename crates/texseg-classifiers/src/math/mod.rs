//! Small dense containers used by the binary datasets.
//!
//! `Array2` keeps samples row-major in one contiguous buffer so that every
//! one-vs-rest slot can share the same feature storage.
pub mod matrix;

pub use matrix::{Array2, ShapeError};
