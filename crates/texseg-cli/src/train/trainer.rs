use anyhow::{Context, Result};
use std::time::Instant;

use texseg_classifiers::builder::DatasetBuilder;
use texseg_classifiers::encoder::OneVsRestEncoder;
use texseg_classifiers::ensemble::ClassifierEnsemble;
use texseg_classifiers::report::save_training_report;
use texseg_classifiers::split;
use texseg_classifiers::trainer::{SlotReport, Trainer};

use crate::train::input::TrainConfig;
use crate::util::{prepare_output_dir, write_bytes_to_file};

/// File the effective configuration is saved to, next to the ensemble.
pub const CONFIG_FILE: &str = "train_config.json";

/// File name of the HTML training report.
pub const REPORT_FILE: &str = "training_report.html";

/// Builds the dataset, trains the ensemble and writes it to
/// `config.output_dir`.
pub fn run_training(config: &TrainConfig) -> Result<(ClassifierEnsemble, Vec<SlotReport>)> {
    prepare_output_dir(&config.output_dir)?;

    let dataset = DatasetBuilder::from_files(&config.images, &config.masks)
        .context("Failed to build the training dataset")?
        .finish()
        .context("The training dataset is not usable")?;

    let encoder = OneVsRestEncoder::new();
    let (training, validation) = match config.validation_ratio {
        Some(ratio) => {
            let mut dataset = dataset;
            split::shuffle(&mut dataset, &mut split::seeded_rng(config.seed));
            let (training, validation) = split::split(&dataset, ratio)
                .with_context(|| format!("Failed to split the dataset with ratio {}", ratio))?;
            log::info!(
                "Training set sizes {:?}, validation set sizes {:?}",
                training.class_sizes(),
                validation.class_sizes()
            );
            (encoder.encode(&training)?, Some(encoder.encode(&validation)?))
        }
        None => (encoder.encode(&dataset)?, None),
    };

    let mut ensemble = ClassifierEnsemble::create(&config.model, &training)?;
    let trainer = Trainer::new(config.training)?;

    let start_time = Instant::now();
    let reports = trainer
        .train(&mut ensemble, &training, validation.as_ref())
        .with_context(|| "Training failed: an error occurred while training the classifiers")?;
    log::info!("Training completed in {:?}", start_time.elapsed());

    ensemble
        .save(&config.output_dir)
        .with_context(|| format!("Failed to save the ensemble to {}", config.output_dir.display()))?;

    let bytes = serde_json::to_vec_pretty(config)?;
    write_bytes_to_file(&config.output_dir.join(CONFIG_FILE), &bytes)
        .context("Failed to save the training configuration")?;

    if config.report {
        save_training_report(
            &config.output_dir.join(REPORT_FILE),
            "texseg training report",
            &ensemble,
        )?;
    }

    log::info!("Model saved to: {}", config.output_dir.display());
    Ok((ensemble, reports))
}
