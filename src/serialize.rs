use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::prelude::*;

use crate::error::Result;

pub const TRAIN_IMAGES_FILE: &str = "train_images.mat";
pub const TRAIN_LABELS_FILE: &str = "train_labels.mat";
pub const TEST_IMAGES_FILE: &str = "test_images.mat";
pub const TEST_LABELS_FILE: &str = "test_labels.mat";

/// Writes the elements of `array` as raw native-endian f32, row-major, no header.
///
/// An existing file at `path` is overwritten. Returns the number of bytes written.
pub fn write_array<D: Dimension>(array: &Array<f32, D>, path: &Path) -> Result<u64> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut written = 0u64;
    for value in array.iter() {
        writer.write_all(&value.to_ne_bytes())?;
        written += std::mem::size_of::<f32>() as u64;
    }
    writer.flush()?;
    log::debug!("wrote {written} bytes to {}", path.display());
    Ok(written)
}

/// `dir/name`, creating `dir` when needed.
pub fn output_path(dir: &Path, name: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    Ok(dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_row_major_native_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.mat");
        let a = array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]];

        assert_eq!(write_array(&a, &path).unwrap(), 24);

        let bytes = fs::read(&path).unwrap();
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn transposed_view_is_written_in_logical_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.mat");
        let a = array![[1.0f32, 2.0], [3.0, 4.0]].reversed_axes();

        write_array(&a, &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[4..8], &3.0f32.to_ne_bytes());
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.mat");
        fs::write(&path, vec![0xffu8; 1000]).unwrap();

        write_array(&array![7.0f32], &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), 7.0f32.to_ne_bytes());
    }

    #[test]
    fn output_path_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let path = output_path(&nested, TEST_LABELS_FILE).unwrap();
        assert!(nested.is_dir());
        assert_eq!(path, nested.join("test_labels.mat"));
    }
}
