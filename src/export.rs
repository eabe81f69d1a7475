use std::io::Write;
use std::path::PathBuf;

use crate::convert::to_arrays;
use crate::error::Result;
use crate::mnist_dataset::{load, MnistItem, Source, Split};
use crate::normalize::{labels_to_f32, normalize_images};
use crate::report::{print_shapes, ArrayReport, ExportManifest};
use crate::serialize::{
    output_path, write_array, TEST_IMAGES_FILE, TEST_LABELS_FILE, TRAIN_IMAGES_FILE,
    TRAIN_LABELS_FILE,
};

/// Resolved settings of one export run.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub source: Source,
    pub out_dir: PathBuf,
    /// Also write a JSON description of the outputs here.
    pub manifest: Option<PathBuf>,
}

fn file_names(split: Split) -> (&'static str, &'static str) {
    match split {
        Split::Train => (TRAIN_IMAGES_FILE, TRAIN_LABELS_FILE),
        Split::Test => (TEST_IMAGES_FILE, TEST_LABELS_FILE),
    }
}

/// Converts, normalizes and writes one split. Returns the image and label reports.
fn export_split(
    config: &ExportConfig,
    split: Split,
    items: Vec<MnistItem>,
) -> Result<[ArrayReport; 2]> {
    let (images, labels) = to_arrays(items)?;
    let images = normalize_images(&images);
    let labels = labels_to_f32(&labels);

    let (images_file, labels_file) = file_names(split);
    let images_bytes = write_array(&images, &output_path(&config.out_dir, images_file)?)?;
    let labels_bytes = write_array(&labels, &output_path(&config.out_dir, labels_file)?)?;

    Ok([
        ArrayReport::new(&format!("{split} images"), images_file, images.shape(), images_bytes),
        ArrayReport::new(&format!("{split} labels"), labels_file, labels.shape(), labels_bytes),
    ])
}

/// Runs the whole export: load, convert, normalize, write, then report shapes on `out`.
pub fn run_export<W: Write>(config: &ExportConfig, out: &mut W) -> Result<ExportManifest> {
    log::info!("loading mnist from {}", config.source.describe());
    let splits = [Split::Train, Split::Test];
    let names = splits.map(|s| s.name());
    let loaded = load(&config.source, &names, true)?;

    let mut arrays = Vec::with_capacity(4);
    for (split, items) in splits.into_iter().zip(loaded) {
        arrays.extend(export_split(config, split, items)?);
        log::info!("{split} split written to {}", config.out_dir.display());
    }

    print_shapes(out, &arrays)?;

    let manifest = ExportManifest {
        dataset: "mnist".to_string(),
        source: config.source.describe(),
        arrays,
    };
    if let Some(path) = &config.manifest {
        manifest.to_file(path)?;
        log::info!("manifest written to {}", path.display());
    }

    Ok(manifest)
}
