use anyhow::Result;
use clap::ArgMatches;
use log::LevelFilter;
use std::path::PathBuf;

use texseg_cli::classify::classifier::run_classification;
use texseg_cli::classify::input::ClassifyConfig;
use texseg_cli::cli::build_cli;
use texseg_cli::train::input::TrainConfig;
use texseg_cli::train::trainer::run_training;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("TEXSEG_LOG", "error,texseg=info"))
        .init();

    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("classify", sub_m)) => handle_classify(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config_path: Option<&PathBuf> = matches.get_one("config");
    log::info!("[texseg::train] Training from config: {:?}", config_path);

    let config = TrainConfig::from_arguments(config_path, matches)?;

    match run_training(&config) {
        Ok((_, reports)) => {
            for report in reports {
                log::info!(
                    "Slot #{}: {} epoch(s), train error {}, validation error {:?}",
                    report.slot + 1,
                    report.epochs_run,
                    report.train_error,
                    report.validation_error
                );
            }
            Ok(())
        }
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_classify(matches: &ArgMatches) -> Result<()> {
    let config_path: Option<&PathBuf> = matches.get_one("config");
    log::info!("[texseg::classify] Classifying with config: {:?}", config_path);

    let config = ClassifyConfig::from_arguments(config_path, matches)?;

    match run_classification(&config) {
        Ok(summaries) => {
            for summary in summaries {
                log::info!(
                    "Label maps of {} written to {}",
                    summary.image.display(),
                    summary.output_dir.display()
                );
            }
            Ok(())
        }
        Err(e) => {
            log::error!("Classification failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
