//! Error types for image2tensor.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to decode or encode an image.
    #[error("image error on {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The metadata file is not valid YAML or a consumed field is missing or mistyped.
    #[error("invalid input meta: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// `input_meta.databases[..].ports[..]` does not exist.
    #[error("input meta has no {0}")]
    MissingEntry(&'static str),

    #[error("unknown layout axis `{0}`, expected one of n, h, w, c")]
    UnknownAxis(String),

    #[error("invalid layout `{0}`: each of n, h, w, c must appear exactly once")]
    InvalidLayout(String),

    /// `mean` or `scale` is neither a scalar nor a per-channel vector.
    #[error("preprocess.{name} must have 1 or 3 values, got {len}")]
    InvalidChannelParams { name: &'static str, len: usize },

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Ratio-preserving resize only supports square targets.
    #[error(
        "target {width}x{height} is not square; set keep_ratio to false to resize to a non-square target"
    )]
    NonSquareTarget { width: u32, height: u32 },

    #[error("tensor shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A startup path check failed. The path is absolute.
    #[error("invalid {kind} `{}`", path.display())]
    InvalidPath { kind: &'static str, path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
