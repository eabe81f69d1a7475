pub mod convert;
pub mod download;
pub mod error;
pub mod export;
pub mod idx;
pub mod inspect;
pub mod mnist_dataset;
pub mod normalize;
pub mod report;
pub mod serialize;

pub use crate::error::{ExportError, Result};
