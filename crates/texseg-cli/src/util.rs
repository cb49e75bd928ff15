use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Makes `dir` ready to receive results: it must not be a file nor a
/// non-empty directory. Missing directories are created.
pub fn prepare_output_dir(dir: &Path) -> Result<()> {
    if dir.is_file() {
        anyhow::bail!("Output path is an existing file: {}", dir.display());
    }
    if dir.is_dir() {
        let mut entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read output directory: {}", dir.display()))?;
        if entries.next().is_some() {
            anyhow::bail!("Output directory is not empty: {}", dir.display());
        }
        return Ok(());
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

/// Checks every path exists, as a file or as a series directory.
pub fn validate_inputs<P: AsRef<Path>>(kind: &str, paths: &[P]) -> Result<()> {
    if paths.is_empty() {
        anyhow::bail!("No {} given", kind);
    }
    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("{} does not exist: {}", kind, path.display());
        }
    }
    Ok(())
}

pub fn write_bytes_to_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a").join("b");
        prepare_output_dir(&out).unwrap();
        assert!(out.is_dir());
        // An existing empty directory is fine too.
        prepare_output_dir(&out).unwrap();
    }

    #[test]
    fn non_empty_dir_or_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        assert!(prepare_output_dir(&file).is_err());
        assert!(prepare_output_dir(dir.path()).is_err());
    }

    #[test]
    fn missing_inputs_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        let err = validate_inputs("mask", &[&missing]).unwrap_err();
        assert!(err.to_string().contains("missing.png"));
        assert!(validate_inputs::<&Path>("image", &[]).is_err());
    }
}
