use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning an input image into a dark-area measurement.
#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("failed to decode image '{name}': {source}")]
    Decode {
        name: String,
        source: image::ImageError,
    },

    #[error("image has no pixels ({width}x{height})")]
    ImageShape { width: u32, height: u32 },

    #[error("threshold must lie in 0..=255, got {0}")]
    ThresholdOutOfRange(i64),

    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MeasureError>;
