//! HTML training report: one error curve per slot trained with validation.

use std::fs;
use std::path::Path;

use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::common::{Marker, Mode};
use plotly::layout::Axis;
use plotly::{Layout, Plot, Scatter};

use crate::ensemble::ClassifierEnsemble;
use crate::error::{Result, SourceError};
use crate::trainer::TrainingHistory;

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

/// Training and validation error over epochs, with the kept epoch marked.
pub fn plot_training_history(slot: usize, history: &TrainingHistory) -> Plot {
    let epochs: Vec<f64> = (1..=history.len()).map(|e| e as f64).collect();
    let train: Vec<f64> = history
        .epochs()
        .iter()
        .map(|score| f64::from(score.train_error))
        .collect();
    let validation: Vec<f64> = history
        .epochs()
        .iter()
        .map(|score| f64::from(score.validation_error))
        .collect();
    let best = history.best_score();

    let mut plot = Plot::new();
    plot.add_trace(
        Scatter::new(epochs.clone(), train)
            .name("Train MSE")
            .mode(Mode::Lines)
            .line(plotly::common::Line::new().color("rgba(31, 119, 180, 1.0)")),
    );
    plot.add_trace(
        Scatter::new(epochs, validation)
            .name("Validation MSE")
            .mode(Mode::Lines)
            .line(plotly::common::Line::new().color("rgba(255, 127, 14, 1.0)")),
    );
    plot.add_trace(
        Scatter::new(
            vec![(history.best_epoch() + 1) as f64],
            vec![f64::from(best.validation_error)],
        )
        .name("Kept epoch")
        .mode(Mode::Markers)
        .marker(Marker::new().size(10).color("red")),
    );

    plot.set_layout(
        Layout::new()
            .title(format!("Slot #{} training and validation error", slot + 1).as_str())
            .x_axis(Axis::new().title("Epoch"))
            .y_axis(Axis::new().title("Mean squared error")),
    );
    plot
}

fn summary(ensemble: &ClassifierEnsemble) -> Markup {
    let positive = ensemble.positive_classes();
    html! {
        table {
            thead {
                tr {
                    th { "Slot" }
                    th { "Positive class" }
                    th { "Model" }
                    th { "Epochs" }
                    th { "Kept epoch" }
                    th { "Train MSE" }
                    th { "Validation MSE" }
                }
            }
            tbody {
                @for slot in 0..ensemble.number_of_slots() {
                    tr {
                        td { (slot + 1) }
                        td { (positive[slot] + 1) }
                        td { (ensemble.slot(slot).name()) }
                        @match ensemble.history(slot) {
                            Some(history) => {
                                td { (history.len()) }
                                td { (history.best_epoch() + 1) }
                                td { (format!("{:.6}", history.best_score().train_error)) }
                                td { (format!("{:.6}", history.best_score().validation_error)) }
                            }
                            None => {
                                td { (ensemble.slot(slot).epochs_trained()) }
                                td { "-" }
                                td { "-" }
                                td { "-" }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Renders the training report of `ensemble` as a standalone HTML page.
pub fn training_report(title: &str, ensemble: &ClassifierEnsemble) -> String {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (title) }
                script src=(PLOTLY_JS) {}
                style {
                    "body { font-family: sans-serif; margin: 2em; }
                    table { border-collapse: collapse; }
                    th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: right; }"
                }
            }
            body {
                h1 { (title) }
                p {
                    (ensemble.number_of_classes()) " classes, "
                    (ensemble.number_of_slots()) " classifier(s), "
                    (ensemble.input_size()) " features per sample."
                }
                h2 { "Summary" }
                (summary(ensemble))
                @for (slot, history) in ensemble.histories().iter().enumerate() {
                    @if let Some(history) = history {
                        h2 { "Slot #" (slot + 1) }
                        (PreEscaped(plot_training_history(slot, history)
                            .to_inline_html(Some(format!("slot-{}", slot + 1).as_str()))))
                    }
                }
            }
        }
    }
    .into_string()
}

/// Writes [`training_report`] to `path`.
pub fn save_training_report(path: &Path, title: &str, ensemble: &ClassifierEnsemble) -> Result<()> {
    fs::write(path, training_report(title, ensemble)).map_err(|e| SourceError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    log::info!("Training report written to {}", path.display());
    Ok(())
}
