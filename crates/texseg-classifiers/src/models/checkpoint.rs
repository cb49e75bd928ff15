//! JSON checkpoints of single classifiers.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::ClassifierError;
use crate::models::classifier_trait::{BinaryClassifier, ModelRecord};

/// Writes `classifier` to `path`, replacing any existing file.
pub fn save(classifier: &dyn BinaryClassifier, path: &Path) -> Result<(), ClassifierError> {
    let save_error = |reason: String| ClassifierError::Save {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::create(path).map_err(|e| save_error(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &classifier.to_record())
        .map_err(|e| save_error(e.to_string()))?;
    writer.flush().map_err(|e| save_error(e.to_string()))?;
    log::trace!("Saved {} to {}", classifier.name(), path.display());
    Ok(())
}

/// Reads a classifier written by [`save`].
pub fn load(path: &Path) -> Result<Box<dyn BinaryClassifier>, ClassifierError> {
    let load_error = |reason: String| ClassifierError::Load {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| load_error(e.to_string()))?;
    let record: ModelRecord =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| load_error(e.to_string()))?;
    record.check().map_err(load_error)?;
    Ok(record.into_classifier())
}
