use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use mnist::MnistBuilder;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::download::fetch_cached;
use crate::error::{ExportError, Result};
use crate::idx;

pub const WIDTH: usize = 28;
pub const HEIGHT: usize = 28;
pub const CHANNELS: usize = 1;
pub const PIXELS: usize = WIDTH * HEIGHT;
pub const NUM_CLASSES: usize = 10;

pub const TRAIN_LEN: usize = 60_000;
pub const TEST_LEN: usize = 10_000;

// CVDF mirror of http://yann.lecun.com/exdb/mnist/
pub const MIRROR_URL: &str = "https://storage.googleapis.com/cvdf-datasets/mnist/";
const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }

    /// IDX file names of the split: (images, labels)
    pub fn file_names(&self) -> (&'static str, &'static str) {
        match self {
            Split::Train => (TRAIN_IMAGES, TRAIN_LABELS),
            Split::Test => (TEST_IMAGES, TEST_LABELS),
        }
    }

    pub fn expected_len(&self) -> usize {
        match self {
            Split::Train => TRAIN_LEN,
            Split::Test => TEST_LEN,
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Split {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(Split::Train),
            "test" => Ok(Split::Test),
            other => Err(ExportError::UnknownSplit(other.to_string())),
        }
    }
}

/// One supervised MNIST sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MnistItem {
    /// Raw pixel intensities, shape (28, 28, 1).
    pub image: Array3<u8>,
    /// Digit class 0-9.
    pub label: u8,
}

impl MnistItem {
    pub fn from_bytes(bytes: &[u8], label: u8) -> Result<MnistItem> {
        let image = Array3::from_shape_vec((HEIGHT, WIDTH, CHANNELS), bytes.to_vec())?;
        Ok(MnistItem { image, label })
    }
}

pub trait DatasetSource {
    /// Returns the (image, label) pairs of `split`, in dataset order.
    fn load_split(&self, split: Split) -> Result<Vec<MnistItem>>;

    /// Loads several splits at once, in the order given.
    fn load_splits(&self, splits: &[Split]) -> Result<Vec<Vec<MnistItem>>> {
        splits.iter().map(|&split| self.load_split(split)).collect()
    }
}

/// Downloads the IDX files from a mirror, caching the decompressed files on disk.
#[derive(Debug, Clone)]
pub struct MirrorSource {
    pub base_url: String,
    pub cache_dir: PathBuf,
}

impl MirrorSource {
    pub fn new(cache_dir: impl Into<PathBuf>) -> MirrorSource {
        MirrorSource {
            base_url: MIRROR_URL.to_string(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Platform cache directory, e.g. `~/.cache/mnist-export` on Linux.
    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("mnist-export")
    }

    pub fn split_dir(&self, split: Split) -> PathBuf {
        self.cache_dir.join("mnist").join(split.name())
    }
}

impl DatasetSource for MirrorSource {
    fn load_split(&self, split: Split) -> Result<Vec<MnistItem>> {
        let split_dir = self.split_dir(split);
        let (images_name, labels_name) = split.file_names();
        let images_path = fetch_cached(&self.base_url, images_name, &split_dir)?;
        let labels_path = fetch_cached(&self.base_url, labels_name, &split_dir)?;

        let images = idx::read_images(&images_path)?;
        let labels = idx::read_labels(&labels_path)?;
        if images.len() != labels.len() {
            return Err(ExportError::Idx {
                path: labels_path,
                reason: format!("{} labels for {} images", labels.len(), images.len()),
            });
        }

        images
            .iter()
            .zip(labels)
            .map(|(bytes, label)| MnistItem::from_bytes(bytes, label))
            .collect()
    }
}

/// Reads already decompressed IDX files from a local directory with the `mnist` crate.
#[derive(Debug, Clone)]
pub struct LocalSource {
    pub data_dir: PathBuf,
}

impl LocalSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> LocalSource {
        LocalSource {
            data_dir: data_dir.into(),
        }
    }

    fn existing(&self, name: &str) -> Result<PathBuf> {
        let path = self.data_dir.join(name);
        if !path.is_file() {
            return Err(ExportError::MissingFile(path));
        }
        Ok(path)
    }

    /// Checks both files of a split hold exactly the full MNIST split.
    fn check_split(&self, split: Split) -> Result<()> {
        let (images_name, labels_name) = split.file_names();
        let images_path = self.existing(images_name)?;
        let labels_path = self.existing(labels_name)?;
        idx::check_layout(&images_path, idx::IMAGES_MAGIC, split.expected_len())?;
        idx::check_layout(&labels_path, idx::LABELS_MAGIC, split.expected_len())
    }
}

impl DatasetSource for LocalSource {
    fn load_split(&self, split: Split) -> Result<Vec<MnistItem>> {
        let mut loaded = self.load_splits(&[split])?;
        Ok(loaded.pop().unwrap_or_default())
    }

    fn load_splits(&self, splits: &[Split]) -> Result<Vec<Vec<MnistItem>>> {
        // The builder panics on anything but the full-size 28x28 files, and it
        // always reads both splits.
        self.check_split(Split::Train)?;
        self.check_split(Split::Test)?;
        let base_path = format!("{}/", self.data_dir.display());

        let mnist = MnistBuilder::new()
            .base_path(&base_path)
            .training_set_length(TRAIN_LEN as u32)
            .validation_set_length(0)
            .test_set_length(TEST_LEN as u32)
            .finalize();

        splits
            .iter()
            .map(|&split| {
                let (images, labels) = match split {
                    Split::Train => (&mnist.trn_img, &mnist.trn_lbl),
                    Split::Test => (&mnist.tst_img, &mnist.tst_lbl),
                };
                let labels_path = self.data_dir.join(split.file_names().1);
                images
                    .chunks_exact(PIXELS)
                    .zip(labels)
                    .enumerate()
                    .map(|(i, (bytes, &label))| {
                        if label as usize >= NUM_CLASSES {
                            return Err(ExportError::Idx {
                                path: labels_path.clone(),
                                reason: format!("label {label} at index {i} is not a digit"),
                            });
                        }
                        MnistItem::from_bytes(bytes, label)
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect()
    }
}

/// Where the dataset comes from.
#[derive(Debug, Clone)]
pub enum Source {
    Mirror(MirrorSource),
    Local(LocalSource),
}

impl DatasetSource for Source {
    fn load_split(&self, split: Split) -> Result<Vec<MnistItem>> {
        match self {
            Source::Mirror(s) => s.load_split(split),
            Source::Local(s) => s.load_split(split),
        }
    }

    fn load_splits(&self, splits: &[Split]) -> Result<Vec<Vec<MnistItem>>> {
        match self {
            Source::Mirror(s) => s.load_splits(splits),
            Source::Local(s) => s.load_splits(splits),
        }
    }
}

impl Source {
    pub fn describe(&self) -> String {
        match self {
            Source::Mirror(s) => format!("{} (cache {})", s.base_url, s.cache_dir.display()),
            Source::Local(s) => format!("local files in {}", s.data_dir.display()),
        }
    }
}

/// Loads the named splits of MNIST as (image, label) sequences, in the order requested.
pub fn load(
    source: &impl DatasetSource,
    split_names: &[&str],
    as_supervised: bool,
) -> Result<Vec<Vec<MnistItem>>> {
    if !as_supervised {
        return Err(ExportError::Unsupervised);
    }

    let splits = split_names
        .iter()
        .map(|name| name.parse::<Split>())
        .collect::<Result<Vec<_>>>()?;
    let mut seen = HashSet::new();
    if let Some(dup) = splits.iter().find(|s| !seen.insert(**s)) {
        return Err(ExportError::DuplicateSplit(dup.to_string()));
    }

    let loaded = source.load_splits(&splits)?;
    for (split, items) in splits.iter().zip(&loaded) {
        if items.len() != split.expected_len() {
            log::warn!(
                "{split} split has {} samples, MNIST has {}",
                items.len(),
                split.expected_len()
            );
        }
        log::info!("loaded {} {split} samples", items.len());
    }
    Ok(loaded)
}
