use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use texseg_classifiers::ensemble::ClassifierEnsemble;
use texseg_classifiers::io;
use texseg_classifiers::source::FeatureSource;

use crate::classify::input::ClassifyConfig;
use crate::util::prepare_output_dir;

/// Label counts of one classified image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationSummary {
    pub image: PathBuf,
    pub output_dir: PathBuf,
    /// Locations per label, index 0 being the rejected ones.
    pub label_counts: Vec<usize>,
}

/// Directory the label maps of `image` go to: `output_dir` itself for a
/// single image, a sub-directory named after the image otherwise.
fn image_output_dir(config: &ClassifyConfig, index: usize, image: &Path) -> PathBuf {
    if config.images.len() == 1 {
        return config.output_dir.clone();
    }
    let name = image
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{:06}", index + 1));
    config.output_dir.join(name)
}

/// Loads the ensemble and writes the label maps of every image.
pub fn run_classification(config: &ClassifyConfig) -> Result<Vec<ClassificationSummary>> {
    prepare_output_dir(&config.output_dir)?;

    let ensemble = ClassifierEnsemble::load(&config.model_dir)
        .with_context(|| format!("Failed to load the ensemble from {}", config.model_dir.display()))?;

    let mut summaries = Vec::with_capacity(config.images.len());
    for (index, image) in config.images.iter().enumerate() {
        log::info!("Classifying {}", image.display());
        let features = io::load_feature_image(&[image])
            .with_context(|| format!("Failed to load feature image {}", image.display()))?;
        let labels = ensemble
            .classify_image(&features, &config.fusion)
            .with_context(|| format!("Failed to classify {}", image.display()))?;

        let output_dir = image_output_dir(config, index, image);
        io::write_label_maps(
            &output_dir,
            features.extent(),
            &labels,
            ensemble.number_of_classes(),
        )?;

        let mut label_counts = vec![0; ensemble.number_of_classes() + 1];
        for &label in &labels {
            if let Some(count) = label_counts.get_mut(label) {
                *count += 1;
            }
        }
        log::info!(
            "{}: {} rejected, per class {:?}",
            image.display(),
            label_counts[0],
            &label_counts[1..]
        );
        summaries.push(ClassificationSummary {
            image: image.clone(),
            output_dir,
            label_counts,
        });
    }

    Ok(summaries)
}
