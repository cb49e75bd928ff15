//! Collaborator interfaces for feature and mask sources.
//!
//! A location is a linear index into an [`Extent`], x varying fastest, then
//! y, then z. Feature sources hand out one feature vector per location; mask
//! sources one byte per location, [`FOREGROUND`] selecting the location.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::math::ShapeError;

/// Mask value marking a selected location.
pub const FOREGROUND: u8 = 255;

/// Spatial extent of an image or volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl Extent {
    pub const fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Number of locations covered by the extent.
    pub const fn len(&self) -> usize {
        self.width * self.height * self.depth
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear location of `(x, y, z)`.
    pub const fn location(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.height + y) * self.width + x
    }

    /// Inverse of [`Extent::location`].
    pub const fn coordinates(&self, location: usize) -> (usize, usize, usize) {
        let x = location % self.width;
        let rest = location / self.width;
        (x, rest % self.height, rest / self.height)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// Dense per-location feature vectors.
pub trait FeatureSource {
    fn number_of_components_per_sample(&self) -> usize;

    fn extent(&self) -> Extent;

    /// Feature vector at `location`; its length is
    /// `number_of_components_per_sample()`.
    fn sample_at(&self, location: usize) -> &[f32];
}

/// Per-location class selection.
pub trait MaskSource {
    fn extent(&self) -> Extent;

    fn value_at(&self, location: usize) -> u8;

    /// Where the mask came from, used in error messages.
    fn origin(&self) -> Option<&Path> {
        None
    }
}

/// In-memory feature image.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureImage {
    extent: Extent,
    components: usize,
    data: Vec<f32>,
}

impl FeatureImage {
    /// `data` holds `components` values per location, locations in linear order.
    pub fn new(extent: Extent, components: usize, data: Vec<f32>) -> Result<Self, ShapeError> {
        ShapeError::check(extent.len(), components, data.len())?;
        Ok(Self {
            extent,
            components,
            data,
        })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

impl FeatureSource for FeatureImage {
    fn number_of_components_per_sample(&self) -> usize {
        self.components
    }

    fn extent(&self) -> Extent {
        self.extent
    }

    fn sample_at(&self, location: usize) -> &[f32] {
        let start = location * self.components;
        &self.data[start..start + self.components]
    }
}

/// In-memory mask.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskImage {
    extent: Extent,
    data: Vec<u8>,
    origin: Option<PathBuf>,
}

impl MaskImage {
    pub fn new(extent: Extent, data: Vec<u8>) -> Result<Self, ShapeError> {
        ShapeError::check(extent.len(), 1, data.len())?;
        Ok(Self {
            extent,
            data,
            origin: None,
        })
    }

    /// Records the file the mask was read from.
    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Number of foreground locations.
    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&v| v == FOREGROUND).count()
    }
}

impl MaskSource for MaskImage {
    fn extent(&self) -> Extent {
        self.extent
    }

    fn value_at(&self, location: usize) -> u8 {
        self.data[location]
    }

    fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }
}
