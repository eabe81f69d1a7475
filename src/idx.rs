//! Decoding of the IDX format the MNIST files are distributed in.
//!
//! Layout (all integers big-endian):
//! - images: magic `2051`, count, rows, cols, then `count * rows * cols` pixel bytes
//! - labels: magic `2049`, count, then `count` label bytes
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{ExportError, Result};
use crate::mnist_dataset::{HEIGHT, NUM_CLASSES, PIXELS, WIDTH};

pub const IMAGES_MAGIC: u32 = 2051;
pub const LABELS_MAGIC: u32 = 2049;

fn idx_error(path: &Path, reason: impl Into<String>) -> ExportError {
    ExportError::Idx {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn read_u32<R: Read>(reader: &mut R, path: &Path) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|_| idx_error(path, "truncated header"))?;
    Ok(u32::from_be_bytes(buf))
}

fn check_magic<R: Read>(reader: &mut R, path: &Path, expected: u32) -> Result<()> {
    let magic = read_u32(reader, path)?;
    if magic != expected {
        return Err(idx_error(
            path,
            format!("incorrect magic number {magic} != {expected}"),
        ));
    }
    Ok(())
}

fn read_payload<R: Read>(reader: &mut R, path: &Path, len: usize) -> Result<Vec<u8>> {
    let mut data = vec![0u8; len];
    reader
        .read_exact(&mut data)
        .map_err(|_| idx_error(path, format!("expected {len} bytes of data")))?;
    Ok(data)
}

fn check_dims<R: Read>(reader: &mut R, path: &Path) -> Result<()> {
    let rows = read_u32(reader, path)? as usize;
    let cols = read_u32(reader, path)? as usize;
    if (rows, cols) != (HEIGHT, WIDTH) {
        return Err(idx_error(
            path,
            format!("expected {HEIGHT}x{WIDTH} images, found {rows}x{cols}"),
        ));
    }
    Ok(())
}

/// Checks that an IDX file holds exactly `count` items and no other bytes.
///
/// `magic` selects the layout: images (16-byte header, `PIXELS` bytes per item)
/// or labels (8-byte header, one byte per item).
pub fn check_layout(path: &Path, magic: u32, count: usize) -> Result<()> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    check_magic(&mut reader, path, magic)?;
    let found = read_u32(&mut reader, path)? as usize;

    let (header_len, item_len) = if magic == IMAGES_MAGIC {
        check_dims(&mut reader, path)?;
        (16, PIXELS)
    } else {
        (8, 1)
    };

    if found != count {
        return Err(idx_error(path, format!("expected {count} items, header says {found}")));
    }
    let expected_len = (header_len + count * item_len) as u64;
    if file_len != expected_len {
        return Err(idx_error(
            path,
            format!("file holds {file_len} bytes, expected {expected_len}"),
        ));
    }
    Ok(())
}

/// Reads an image file, returning one `PIXELS`-long buffer per image.
pub fn read_images(path: &Path) -> Result<Vec<Vec<u8>>> {
    let mut reader = BufReader::new(File::open(path)?);
    check_magic(&mut reader, path, IMAGES_MAGIC)?;
    let count = read_u32(&mut reader, path)? as usize;
    check_dims(&mut reader, path)?;

    let data = read_payload(&mut reader, path, count * PIXELS)?;
    Ok(data.chunks_exact(PIXELS).map(|c| c.to_vec()).collect())
}

/// Reads a label file. Every label must be a digit class.
pub fn read_labels(path: &Path) -> Result<Vec<u8>> {
    let mut reader = BufReader::new(File::open(path)?);
    check_magic(&mut reader, path, LABELS_MAGIC)?;
    let count = read_u32(&mut reader, path)? as usize;
    let labels = read_payload(&mut reader, path, count)?;

    if let Some((i, bad)) = labels
        .iter()
        .enumerate()
        .find(|(_, &l)| l as usize >= NUM_CLASSES)
    {
        return Err(idx_error(path, format!("label {bad} at index {i} is not a digit")));
    }
    Ok(labels)
}

/// Encodes images in the IDX layout. Used to seed caches and in tests.
pub fn encode_images(images: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + images.len() * PIXELS);
    out.extend_from_slice(&IMAGES_MAGIC.to_be_bytes());
    out.extend_from_slice(&(images.len() as u32).to_be_bytes());
    out.extend_from_slice(&(HEIGHT as u32).to_be_bytes());
    out.extend_from_slice(&(WIDTH as u32).to_be_bytes());
    for image in images {
        out.extend_from_slice(image);
    }
    out
}

pub fn encode_labels(labels: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + labels.len());
    out.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
    out.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    out.extend_from_slice(labels);
    out
}
