//! texseg-classifiers: one-vs-rest pixel classifier ensembles.
//!
//! This crate turns per-class collections of labeled feature vectors into an
//! ensemble of binary classifiers (one per class, or a single one for two
//! classes), trains that ensemble with optional validation-based epoch
//! selection, and fuses the per-class scores of a sample into one label with
//! an explicit reject outcome.
//!
//! The pipeline reads, leaves first:
//! [`builder::DatasetBuilder`] -> [`dataset::Dataset`] -> [`split`] ->
//! [`encoder::OneVsRestEncoder`] -> [`trainer::Trainer`] ->
//! [`ensemble::ClassifierEnsemble`] -> [`fusion::FusionPolicy`].
//!
//! The library never prints. Diagnostics go through the `log` facade and are
//! only visible when the caller installs a logger.
pub mod builder;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod ensemble;
pub mod error;
pub mod fusion;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod source;
pub mod split;
pub mod trainer;

pub use error::{ClassifierError, ConfigError, Error, Result, SlotError, SourceError};
