use clap::{Arg, ArgAction, Command, ValueHint};
use std::path::PathBuf;

fn config_arg() -> Arg {
    Arg::new("config")
        .help("Path to the JSON configuration file. Defaults are used when omitted.")
        .required(false)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn images_arg(help: &'static str) -> Arg {
    Arg::new("images")
        .short('i')
        .long("image")
        .help(help)
        .action(ArgAction::Append)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::AnyPath)
}

fn output_arg(help: &'static str) -> Arg {
    Arg::new("output_dir")
        .short('o')
        .long("output")
        .help(help)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::DirPath)
}

/// Command line definition of the `texseg` binary.
pub fn build_cli() -> Command {
    Command::new("texseg")
        .version(clap::crate_version!())
        .about("texseg - one-vs-rest pixel classifiers for texture segmentation")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Train a classifier ensemble from feature images and class masks")
                .arg(config_arg())
                .arg(images_arg(
                    "Feature image (file or directory of slices). Repeat for several images. \
                     Overrides the images of the configuration file.",
                ))
                .arg(
                    Arg::new("masks")
                        .short('m')
                        .long("mask")
                        .help(
                            "Class mask (file or directory of slices), one per class and per \
                             image, grouped by image. Overrides the masks of the configuration file.",
                        )
                        .action(ArgAction::Append)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::AnyPath),
                )
                .arg(output_arg(
                    "Directory the trained ensemble is written to. Must be empty or missing.",
                ))
                .arg(
                    Arg::new("model_type")
                        .long("model-type")
                        .help("Override the model type from the JSON config.")
                        .value_parser(["mlp", "logistic"])
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("max_epochs")
                        .long("max-epochs")
                        .help("Override the maximum number of epochs.")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("validation_ratio")
                        .long("validation-ratio")
                        .help(
                            "Share of every class kept for training; the rest validates each \
                             epoch and the best epoch is kept.",
                        )
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Seed of the shuffle and of the model initialisation.")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("no_report")
                        .long("no-report")
                        .help("Disable HTML report generation.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("classify")
                .about("Classify feature images with a trained ensemble")
                .arg(config_arg())
                .arg(images_arg(
                    "Feature image to classify. Repeat for several images. \
                     Overrides the images of the configuration file.",
                ))
                .arg(
                    Arg::new("model_dir")
                        .short('n')
                        .long("model")
                        .help("Directory holding the trained ensemble.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::DirPath),
                )
                .arg(output_arg(
                    "Directory the label maps are written to. Must be empty or missing.",
                ))
                .arg(
                    Arg::new("min_confidence")
                        .long("min-confidence")
                        .help("Override the score the best class must exceed.")
                        .value_parser(clap::value_parser!(f32)),
                )
                .arg(
                    Arg::new("dominance_ratio")
                        .long("dominance-ratio")
                        .help("Override the ratio of the best score the second best must stay under.")
                        .value_parser(clap::value_parser!(f32))
                        .conflicts_with("no_margin"),
                )
                .arg(
                    Arg::new("no_margin")
                        .long("no-margin")
                        .help("Fuse scores without the dominance margin check.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
}
