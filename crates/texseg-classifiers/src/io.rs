//! Image file collaborators: masks, feature stacks and label map export.
//!
//! A path is either a single 2D image or a directory holding a series of
//! 2D slices, read in file name order and stacked along z.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ColorType, DynamicImage};

use crate::error::{Result, SourceError};
use crate::source::{Extent, FeatureImage, MaskImage, FOREGROUND};

const IMAGE_EXTENSIONS: &[&str] = &["png", "bmp", "tif", "tiff"];

/// Name of the label map directory written by [`write_label_maps`].
pub const CLASSMAP_DIR: &str = "classmap";

/// Name of the reject mask directory written by [`write_label_maps`].
pub const REJECTED_DIR: &str = "rejected";

fn read_error(path: &Path, reason: impl ToString) -> SourceError {
    SourceError::Read {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn write_error(path: &Path, reason: impl ToString) -> SourceError {
    SourceError::Write {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn is_image_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

/// Files making up the series at `path`, sorted by name.
pub fn series_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = fs::read_dir(path)
        .map_err(|e| read_error(path, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| read_error(path, e))?;
    files.retain(|file| is_image_file(file));
    files.sort();

    if files.is_empty() {
        return Err(SourceError::EmptySeries(path.to_path_buf()).into());
    }
    Ok(files)
}

/// Decodes every slice of the series at `path`, checking they share one size.
fn read_slices(path: &Path) -> Result<(Extent, Vec<DynamicImage>)> {
    let files = series_files(path)?;
    log::trace!("{} slice(s) in {}", files.len(), path.display());

    let mut slices = Vec::with_capacity(files.len());
    let mut plane: Option<(u32, u32)> = None;
    for file in &files {
        let slice = image::open(file).map_err(|e| read_error(file, e))?;
        let size = (slice.width(), slice.height());
        match plane {
            None => plane = Some(size),
            Some(expected) if expected != size => {
                return Err(SourceError::InconsistentSlices {
                    path: file.clone(),
                    expected: Extent::new(expected.0 as usize, expected.1 as usize, 1),
                    found: Extent::new(size.0 as usize, size.1 as usize, 1),
                }
                .into());
            }
            Some(_) => {}
        }
        slices.push(slice);
    }

    let (width, height) = plane.unwrap_or((0, 0));
    Ok((
        Extent::new(width as usize, height as usize, slices.len()),
        slices,
    ))
}

/// Loads a binary mask; [`FOREGROUND`] pixels select their location.
pub fn load_mask(path: impl AsRef<Path>) -> Result<MaskImage> {
    let path = path.as_ref();
    let (extent, slices) = read_slices(path)?;

    let mut data = Vec::with_capacity(extent.len());
    for slice in slices {
        data.extend_from_slice(slice.to_luma8().as_raw());
    }

    let mask = MaskImage::new(extent, data).map_err(|e| read_error(path, e))?;
    log::debug!(
        "Mask {} is {} with {} foreground locations",
        path.display(),
        extent,
        mask.foreground_count()
    );
    Ok(mask.with_origin(path))
}

/// Pixel values of one slice scaled to `[0, 1]`, with the number of
/// components per pixel: 3 for color images, 1 otherwise. Alpha is dropped.
fn slice_components(slice: &DynamicImage) -> (usize, Vec<f32>) {
    if slice.color().has_color() {
        (3, slice.to_rgb32f().into_raw())
    } else {
        (1, slice.to_luma32f().into_raw())
    }
}

/// Loads a feature image by stacking the channels of every path.
///
/// All paths must cover the same extent. The feature vector of a location
/// lists the components of the first path, then those of the second, and so
/// on.
pub fn load_feature_image<P: AsRef<Path>>(paths: &[P]) -> Result<FeatureImage> {
    let mut stack: Option<Extent> = None;
    let mut channels: Vec<(usize, Vec<f32>)> = Vec::with_capacity(paths.len());

    for path in paths {
        let path = path.as_ref();
        let (extent, slices) = read_slices(path)?;
        if let Some(expected) = stack {
            if expected != extent {
                return Err(SourceError::InconsistentSlices {
                    path: path.to_path_buf(),
                    expected,
                    found: extent,
                }
                .into());
            }
        }
        stack = Some(extent);

        let mut components = 0;
        let mut values = Vec::new();
        for slice in &slices {
            let (count, data) = slice_components(slice);
            if components != 0 && components != count {
                return Err(read_error(path, "slices mix grayscale and color images").into());
            }
            components = count;
            values.extend(data);
        }
        channels.push((components, values));
    }

    let extent = stack.ok_or_else(|| read_error(Path::new(""), "no feature image given"))?;
    let total: usize = channels.iter().map(|(components, _)| components).sum();

    let mut data = vec![0.0; extent.len() * total];
    let mut offset = 0;
    for (components, values) in &channels {
        for (location, sample) in values.chunks_exact(*components).enumerate() {
            let start = location * total + offset;
            data[start..start + components].copy_from_slice(sample);
        }
        offset += components;
    }

    log::debug!(
        "Feature image is {} with {} component(s) per sample",
        extent,
        total
    );
    let first = paths.first().map(|p| p.as_ref().to_path_buf()).unwrap_or_default();
    FeatureImage::new(extent, total, data).map_err(|e| read_error(&first, e).into())
}

/// Writes a 3D byte volume as a series of `%06d.bmp` slices (zero-based).
pub fn write_series(dir: &Path, extent: Extent, data: &[u8]) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| write_error(dir, e))?;

    let plane = extent.width * extent.height;
    for (z, slice) in data.chunks(plane.max(1)).take(extent.depth).enumerate() {
        let path = dir.join(format!("{z:06}.bmp"));
        image::save_buffer(
            &path,
            slice,
            extent.width as u32,
            extent.height as u32,
            ColorType::L8,
        )
        .map_err(|e| write_error(&path, e))?;
    }
    Ok(())
}

/// Exports a label map and its per-label binary masks under `dir`.
///
/// Writes `classmap/` holding the raw labels, `rejected/` selecting label 0,
/// and `000001/` .. for each class label, every mask using [`FOREGROUND`]
/// for selected locations.
pub fn write_label_maps(
    dir: &Path,
    extent: Extent,
    labels: &[usize],
    number_of_classes: usize,
) -> Result<()> {
    if labels.len() != extent.len() {
        return Err(write_error(
            dir,
            format!("{} labels for an extent of {}", labels.len(), extent),
        )
        .into());
    }
    if number_of_classes > usize::from(u8::MAX) {
        return Err(write_error(
            dir,
            format!("{number_of_classes} classes do not fit an 8-bit label map"),
        )
        .into());
    }

    #[allow(clippy::cast_possible_truncation)]
    let classmap: Vec<u8> = labels.iter().map(|&label| label as u8).collect();
    write_series(&dir.join(CLASSMAP_DIR), extent, &classmap)?;

    for label in 0..=number_of_classes {
        let name = if label == 0 {
            REJECTED_DIR.to_string()
        } else {
            format!("{label:06}")
        };
        let mask: Vec<u8> = labels
            .iter()
            .map(|&l| if l == label { FOREGROUND } else { 0 })
            .collect();
        write_series(&dir.join(name), extent, &mask)?;
    }

    log::info!("Label maps written to {}", dir.display());
    Ok(())
}
