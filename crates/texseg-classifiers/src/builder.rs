//! Populates a [`Dataset`] from feature sources and per-class masks.
//!
//! Every ingest call is all-or-nothing: masks are loaded and checked against
//! the feature source before any class is touched, so a failing call leaves
//! the dataset exactly as it was.

use std::path::{Path, PathBuf};

use crate::dataset::{Dataset, Sample};
use crate::error::{ConfigError, Result, SourceError};
use crate::io;
use crate::source::{FeatureSource, MaskSource, FOREGROUND};

/// Incrementally builds a class-grouped dataset.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    dataset: Dataset,
}

impl DatasetBuilder {
    /// Allocates `number_of_classes` empty classes, feature length unknown.
    pub fn new(number_of_classes: usize) -> Self {
        Self {
            dataset: Dataset::new(number_of_classes),
        }
    }

    /// Builds a dataset from several feature images and their masks.
    ///
    /// `mask_paths` is packed by image: the masks of image `i` are
    /// `mask_paths[i * C .. (i + 1) * C]` where `C = masks / images` is the
    /// class count, which must be at least two.
    pub fn from_files<P, Q>(image_paths: &[P], mask_paths: &[Q]) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let number_of_classes = mask_paths.len().checked_div(image_paths.len()).unwrap_or(0);
        if number_of_classes == 0 {
            return Err(ConfigError::NoClasses.into());
        }
        if number_of_classes == 1 && mask_paths.len() == image_paths.len() {
            return Err(ConfigError::SingleClass.into());
        }
        if mask_paths.len() % image_paths.len() != 0 {
            return Err(ConfigError::MaskCountMismatch {
                expected: image_paths.len() * number_of_classes,
                found: mask_paths.len(),
            }
            .into());
        }

        let mut builder = Self::new(number_of_classes);

        for (i, (image_path, masks)) in image_paths
            .iter()
            .zip(mask_paths.chunks(number_of_classes))
            .enumerate()
        {
            log::info!(
                "Loading image #{} from {}",
                i,
                image_path.as_ref().display()
            );
            let features = io::load_feature_image(&[image_path])?;
            builder.ingest(&features, masks)?;
        }

        Ok(builder)
    }

    pub fn number_of_classes(&self) -> usize {
        self.dataset.number_of_classes()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Loads one mask per class from disk and ingests the selected samples.
    pub fn ingest<F, P>(&mut self, features: &F, mask_paths: &[P]) -> Result<()>
    where
        F: FeatureSource + ?Sized,
        P: AsRef<Path>,
    {
        self.check_mask_count(mask_paths.len())?;

        let masks = mask_paths
            .iter()
            .map(|path| {
                log::info!("Loading class from {}", path.as_ref().display());
                io::load_mask(path)
            })
            .collect::<Result<Vec<_>>>()?;

        self.ingest_masks(features, &masks)
    }

    /// Appends to class `i` the feature vector of every location where
    /// `masks[i]` equals [`FOREGROUND`].
    pub fn ingest_masks<F, M>(&mut self, features: &F, masks: &[M]) -> Result<()>
    where
        F: FeatureSource + ?Sized,
        M: MaskSource,
    {
        self.check_mask_count(masks.len())?;

        let components = features.number_of_components_per_sample();
        self.dataset.check_feature_length(components)?;

        let extent = features.extent();
        for (i, mask) in masks.iter().enumerate() {
            if mask.extent() != extent {
                return Err(SourceError::DimensionMismatch {
                    path: mask
                        .origin()
                        .map_or_else(|| PathBuf::from(format!("<mask #{i}>")), Path::to_path_buf),
                    mask: mask.extent(),
                    features: extent,
                }
                .into());
            }
        }

        let staged: Vec<Vec<Sample>> = masks
            .iter()
            .map(|mask| {
                (0..extent.len())
                    .filter(|&location| mask.value_at(location) == FOREGROUND)
                    .map(|location| Sample::from(features.sample_at(location)))
                    .collect()
            })
            .collect();

        self.dataset.accept_feature_length(components)?;
        for (i, samples) in staged.into_iter().enumerate() {
            log::debug!("Class #{}: {} new sample(s)", i, samples.len());
            self.dataset.class_mut(i).extend(samples);
        }

        Ok(())
    }

    /// Succeeds iff there is at least one class and none is empty.
    pub fn check_valid(&self) -> std::result::Result<(), ConfigError> {
        self.dataset.check_valid()
    }

    /// Returns the dataset once it passes [`DatasetBuilder::check_valid`].
    pub fn finish(self) -> Result<Dataset> {
        self.check_valid()?;
        log::info!(
            "Dataset ready: {} classes, {} components per sample, sizes {:?}",
            self.dataset.number_of_classes(),
            self.dataset.feature_length(),
            self.dataset.class_sizes()
        );
        Ok(self.dataset)
    }

    /// Returns the dataset without validation.
    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }

    fn check_mask_count(&self, found: usize) -> std::result::Result<(), ConfigError> {
        let expected = self.dataset.number_of_classes();
        if found != expected {
            return Err(ConfigError::MaskCountMismatch { expected, found });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::source::{Extent, FeatureImage, MaskImage};

    fn features(extent: Extent, components: usize) -> FeatureImage {
        let data = (0..extent.len() * components).map(|v| v as f32).collect();
        FeatureImage::new(extent, components, data).unwrap()
    }

    fn mask(extent: Extent, selected: &[usize]) -> MaskImage {
        let mut data = vec![0u8; extent.len()];
        for &location in selected {
            data[location] = FOREGROUND;
        }
        MaskImage::new(extent, data).unwrap()
    }

    #[test]
    fn ingest_appends_foreground_samples() {
        let extent = Extent::new(3, 2, 1);
        let image = features(extent, 2);
        let mut builder = DatasetBuilder::new(2);

        builder
            .ingest_masks(&image, &[mask(extent, &[0, 5]), mask(extent, &[2])])
            .unwrap();

        let dataset = builder.dataset();
        assert_eq!(dataset.feature_length(), 2);
        assert_eq!(dataset.class_sizes(), vec![2, 1]);
        assert_eq!(dataset.class(0).samples()[1].as_slice(), &[10.0, 11.0]);
        assert_eq!(dataset.class(1).samples()[0].as_slice(), &[4.0, 5.0]);
    }

    #[test]
    fn non_sentinel_values_are_ignored() {
        let extent = Extent::new(2, 1, 1);
        let image = features(extent, 1);
        let partial = MaskImage::new(extent, vec![254, 1]).unwrap();
        let mut builder = DatasetBuilder::new(1);

        builder.ingest_masks(&image, &[partial]).unwrap();
        assert_eq!(builder.dataset().total_samples(), 0);
    }

    #[test]
    fn dimension_mismatch_leaves_classes_untouched() {
        let extent = Extent::new(3, 2, 1);
        let image = features(extent, 2);
        let mut builder = DatasetBuilder::new(2);
        builder
            .ingest_masks(&image, &[mask(extent, &[0]), mask(extent, &[1])])
            .unwrap();
        let before = builder.dataset().clone();

        let small = Extent::new(2, 2, 1);
        let err = builder
            .ingest_masks(&image, &[mask(extent, &[2]), mask(small, &[0])])
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Source(SourceError::DimensionMismatch { .. })
        ));
        assert_eq!(builder.dataset(), &before);
    }

    #[test]
    fn feature_length_change_is_rejected() {
        let extent = Extent::new(2, 1, 1);
        let mut builder = DatasetBuilder::new(1);
        builder
            .ingest_masks(&features(extent, 3), &[mask(extent, &[0])])
            .unwrap();

        let err = builder
            .ingest_masks(&features(extent, 4), &[mask(extent, &[1])])
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Config(ConfigError::FeatureLengthMismatch {
                expected: 3,
                found: 4
            })
        ));
        assert_eq!(builder.dataset().total_samples(), 1);
    }

    #[test]
    fn mask_count_must_match_classes() {
        let extent = Extent::new(2, 1, 1);
        let mut builder = DatasetBuilder::new(3);
        let err = builder
            .ingest_masks(&features(extent, 1), &[mask(extent, &[0])])
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn finish_rejects_empty_class() {
        let extent = Extent::new(2, 1, 1);
        let mut builder = DatasetBuilder::new(2);
        builder
            .ingest_masks(&features(extent, 1), &[mask(extent, &[0]), mask(extent, &[])])
            .unwrap();

        let err = builder.finish().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::EmptyClass { class: 1 })
        ));
    }
}
