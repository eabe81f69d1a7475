use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use ndarray::prelude::*;

use crate::error::{ExportError, Result};
use crate::mnist_dataset::{Split, HEIGHT, NUM_CLASSES, PIXELS, TEST_LEN, TRAIN_LEN, WIDTH};
use crate::serialize::{TEST_IMAGES_FILE, TEST_LABELS_FILE, TRAIN_IMAGES_FILE, TRAIN_LABELS_FILE};

/// Reads a raw f32 file as a (rows, cols) matrix. Bytes past `rows * cols` floats are ignored.
pub fn load_matrix(path: &Path, rows: usize, cols: usize) -> Result<Array2<f32>> {
    let bytes = fs::read(path)?;
    let needed = rows * cols * std::mem::size_of::<f32>();
    if bytes.len() < needed {
        return Err(ExportError::Shape(format!(
            "{} holds {} bytes, expected at least {needed} for a {rows}x{cols} f32 matrix",
            path.display(),
            bytes.len()
        )));
    }

    let values: Vec<f32> = bytes[..needed]
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(Array2::from_shape_vec((rows, cols), values)?)
}

/// Expands an (n, 1) label column into (n, classes) one-hot rows.
pub fn one_hot(labels: &Array2<f32>, classes: usize) -> Result<Array2<f32>> {
    let mut encoded = Array2::zeros((labels.nrows(), classes));
    for (i, &label) in labels.column(0).iter().enumerate() {
        if label.fract() != 0.0 || label < 0.0 || label as usize >= classes {
            return Err(ExportError::Shape(format!(
                "label {label} at row {i} is not a class in 0..{classes}"
            )));
        }
        encoded[[i, label as usize]] = 1.0;
    }
    Ok(encoded)
}

/// Draws a 28x28 image with ANSI 256-colour grey backgrounds, two spaces per pixel.
pub fn render_digit(pixels: ArrayView1<f32>) -> String {
    let mut out = String::new();
    for row in pixels.exact_chunks(WIDTH).into_iter().take(HEIGHT) {
        for &v in row.iter() {
            let colour = (232 + (v.clamp(0.0, 1.0) * 24.0) as u32).min(255);
            let _ = write!(out, "\x1b[48;5;{colour}m  ");
        }
        out.push('\n');
    }
    out.push_str("\x1b[0m");
    out
}

/// Saves a 28x28 image as an 8-bit greyscale PNG.
pub fn save_png(pixels: ArrayView1<f32>, path: &Path) -> Result<()> {
    let raw: Vec<u8> = pixels
        .iter()
        .take(PIXELS)
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    let img = image::GrayImage::from_raw(WIDTH as u32, HEIGHT as u32, raw)
        .ok_or_else(|| ExportError::Shape(format!("expected {PIXELS} pixels")))?;
    img.save(path)?;
    Ok(())
}

/// An export read back as matrices.
pub struct ExportedSplit {
    /// (n, 784)
    pub images: Array2<f32>,
    /// (n, 10)
    pub labels: Array2<f32>,
}

pub fn load_exported(dir: &Path, split: Split) -> Result<ExportedSplit> {
    let (images_file, labels_file, rows) = match split {
        Split::Train => (TRAIN_IMAGES_FILE, TRAIN_LABELS_FILE, TRAIN_LEN),
        Split::Test => (TEST_IMAGES_FILE, TEST_LABELS_FILE, TEST_LEN),
    };
    load_exported_files(&dir.join(images_file), &dir.join(labels_file), rows)
}

pub fn load_exported_files(images: &Path, labels: &Path, rows: usize) -> Result<ExportedSplit> {
    let images = load_matrix(images, rows, PIXELS)?;
    let labels = one_hot(&load_matrix(labels, rows, 1)?, NUM_CLASSES)?;
    Ok(ExportedSplit { images, labels })
}

pub struct InspectOptions {
    pub dir: PathBuf,
    pub split: Split,
    pub index: usize,
    pub png: Option<PathBuf>,
}

/// Loads an export back, then shows one digit and its one-hot label on `out`.
pub fn run_inspect<W: Write>(options: &InspectOptions, out: &mut W) -> Result<()> {
    let exported = load_exported(&options.dir, options.split)?;
    log::info!(
        "{} split: images {:?}, labels {:?}",
        options.split,
        exported.images.dim(),
        exported.labels.dim()
    );

    let index = options.index;
    if index >= exported.images.nrows() {
        return Err(ExportError::Shape(format!(
            "index {index} out of range for {} samples",
            exported.images.nrows()
        )));
    }

    let image = exported.images.row(index);
    write!(out, "{}", render_digit(image))?;

    let label_row = exported.labels.row(index);
    let encoded: String = label_row.iter().map(|v| format!("{v:.0}")).collect();
    let digit = label_row.iter().position(|&v| v == 1.0).unwrap_or_default();
    writeln!(out, "{encoded}")?;
    writeln!(out, "{} sample {index} is a {digit}", options.split)?;

    if let Some(path) = &options.png {
        save_png(image, path)?;
        log::info!("saved {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_f32s(path: &Path, values: &[f32]) {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn load_matrix_reads_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.mat");
        write_f32s(&path, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 99.0]);

        let m = load_matrix(&path, 2, 3).unwrap();
        assert_eq!(m, array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn load_matrix_rejects_short_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.mat");
        write_f32s(&path, &[1.0, 2.0]);

        assert!(matches!(load_matrix(&path, 2, 2), Err(ExportError::Shape(_))));
    }

    #[test]
    fn one_hot_sets_label_column() {
        let labels = array![[3.0], [0.0], [9.0]];
        let encoded = one_hot(&labels, 10).unwrap();

        assert_eq!(encoded.dim(), (3, 10));
        assert_eq!(encoded[[0, 3]], 1.0);
        assert_eq!(encoded[[1, 0]], 1.0);
        assert_eq!(encoded[[2, 9]], 1.0);
        assert_eq!(encoded.sum(), 3.0);
    }

    #[test]
    fn one_hot_rejects_non_classes() {
        assert!(one_hot(&array![[10.0]], 10).is_err());
        assert!(one_hot(&array![[2.5]], 10).is_err());
        assert!(one_hot(&array![[-1.0]], 10).is_err());
    }

    #[test]
    fn render_uses_grey_ramp() {
        let mut pixels = Array1::<f32>::zeros(PIXELS);
        pixels[0] = 1.0;
        pixels[1] = 0.5;
        let drawn = render_digit(pixels.view());

        assert_eq!(drawn.lines().count(), HEIGHT + 1);
        let first = drawn.lines().next().unwrap();
        assert!(first.starts_with("\x1b[48;5;255m  \x1b[48;5;244m  \x1b[48;5;232m  "));
        assert!(drawn.ends_with("\x1b[0m"));
    }

    #[test]
    fn png_round_trips_intensities() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digit.png");
        let pixels = Array1::from_iter((0..PIXELS).map(|i| if i % 2 == 0 { 1.0f32 } else { 0.0 }));

        save_png(pixels.view(), &path).unwrap();

        let img = image::open(&path).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (28, 28));
        assert_eq!(img.get_pixel(0, 0).0, [255]);
        assert_eq!(img.get_pixel(1, 0).0, [0]);
    }
}
