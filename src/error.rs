use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Malformed IDX content (bad magic, wrong dimensions, truncated payload...)
    #[error("invalid IDX file {}: {reason}", .path.display())]
    Idx { path: PathBuf, reason: String },

    #[error("missing dataset file {}", .0.display())]
    MissingFile(PathBuf),

    #[error("unknown split '{0}', expected 'train' or 'test'")]
    UnknownSplit(String),

    #[error("split '{0}' requested more than once")]
    DuplicateSplit(String),

    #[error("MNIST is exported as (image, label) pairs, load it with as_supervised = true")]
    Unsupervised,

    #[error("shape error: {0}")]
    Shape(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl From<ndarray::ShapeError> for ExportError {
    fn from(err: ndarray::ShapeError) -> ExportError {
        ExportError::Shape(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
