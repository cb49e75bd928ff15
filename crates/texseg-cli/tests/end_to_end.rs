use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use texseg_classifiers::config::{ModelConfig, ModelType, TrainingParams};
use texseg_classifiers::fusion::FusionPolicy;
use texseg_cli::classify::classifier::run_classification;
use texseg_cli::classify::input::ClassifyConfig;
use texseg_cli::train::input::TrainConfig;
use texseg_cli::train::trainer::{run_training, CONFIG_FILE, REPORT_FILE};

const WIDTH: u32 = 8;
const HEIGHT: u32 = 4;

/// Left half dark (class 1), right half bright (class 2).
fn write_scene(dir: &Path) -> (PathBuf, Vec<PathBuf>) {
    let image = dir.join("features.png");
    GrayImage::from_fn(WIDTH, HEIGHT, |x, _| Luma([if x < WIDTH / 2 { 20 } else { 230 }]))
        .save(&image)
        .unwrap();

    let masks = (0..2)
        .map(|class| {
            let path = dir.join(format!("mask{class}.png"));
            GrayImage::from_fn(WIDTH, HEIGHT, |x, _| {
                let selected = (x < WIDTH / 2) == (class == 0);
                Luma([if selected { 255 } else { 0 }])
            })
            .save(&path)
            .unwrap();
            path
        })
        .collect();
    (image, masks)
}

fn train_config(dir: &Path, image: PathBuf, masks: Vec<PathBuf>) -> TrainConfig {
    TrainConfig {
        images: vec![image],
        masks,
        output_dir: dir.join("model"),
        model: ModelConfig::new(0.5, ModelType::Logistic { l2: 0.0 }).with_seed(1),
        training: TrainingParams::new(100, 0.0),
        validation_ratio: Some(0.75),
        seed: Some(7),
        report: true,
    }
}

#[test]
fn train_then_classify() {
    let dir = tempfile::tempdir().unwrap();
    let (image, masks) = write_scene(dir.path());
    let config = train_config(dir.path(), image.clone(), masks);
    config.validate().unwrap();

    let (ensemble, reports) = run_training(&config).unwrap();
    assert_eq!(ensemble.number_of_slots(), 1);
    assert_eq!(reports[0].epochs_run, 100);
    assert!(reports[0].best_epoch.is_some());

    let model_dir = &config.output_dir;
    assert!(model_dir.join("000001.json").is_file());
    assert!(model_dir.join("ensemble.json").is_file());
    assert!(model_dir.join("000001-training-scores.tsv").is_file());
    assert!(model_dir.join(CONFIG_FILE).is_file());
    assert!(model_dir.join(REPORT_FILE).is_file());

    let classify = ClassifyConfig {
        images: vec![image.clone()],
        model_dir: model_dir.clone(),
        output_dir: dir.path().join("labels"),
        fusion: FusionPolicy::default(),
    };
    classify.validate().unwrap();
    let summaries = run_classification(&classify).unwrap();

    assert_eq!(summaries.len(), 1);
    let half = (WIDTH * HEIGHT / 2) as usize;
    assert_eq!(summaries[0].label_counts, vec![0, half, half]);
    for name in ["classmap", "rejected", "000001", "000002"] {
        assert!(classify.output_dir.join(name).join("000000.bmp").is_file());
    }
}

#[test]
fn training_refuses_a_non_empty_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let (image, masks) = write_scene(dir.path());
    let config = train_config(dir.path(), image, masks);
    std::fs::create_dir_all(&config.output_dir).unwrap();
    std::fs::write(config.output_dir.join("keep.txt"), "x").unwrap();

    let err = run_training(&config).unwrap_err();
    assert!(err.to_string().contains("not empty"));
}

#[test]
fn training_reports_an_empty_class() {
    let dir = tempfile::tempdir().unwrap();
    let (image, mut masks) = write_scene(dir.path());
    let empty = dir.path().join("empty.png");
    GrayImage::new(WIDTH, HEIGHT).save(&empty).unwrap();
    masks[1] = empty;

    let mut config = train_config(dir.path(), image, masks);
    config.validation_ratio = None;
    let err = run_training(&config).unwrap_err();
    assert!(format!("{:#}", err).contains("class #1 is empty"));
}

#[test]
fn training_refuses_a_single_class() {
    let dir = tempfile::tempdir().unwrap();
    let (image, mut masks) = write_scene(dir.path());
    masks.truncate(1);

    let config = train_config(dir.path(), image, masks);
    let err = run_training(&config).unwrap_err();
    assert!(format!("{:#}", err).contains("single class"));
    assert!(!dir.path().join("model").join("000001.json").exists());
}
