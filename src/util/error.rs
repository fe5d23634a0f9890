//! Error types for padmatch.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for padmatch operations.
pub type PadMatchResult<T> = std::result::Result<T, PadMatchError>;

/// Errors that can occur while loading templates or scoring an image.
///
/// Detection itself never surfaces these to the caller; the facade turns
/// them into a "no candidate" vote or a "no detection" outcome.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PadMatchError {
    /// Width or height is zero or overflows the address space.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is too small for the requested view.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Template does not fit inside the searched image.
    #[error("template {tpl_width}x{tpl_height} exceeds image {img_width}x{img_height}")]
    TemplateTooLarge {
        tpl_width: usize,
        tpl_height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// An image could not be opened or decoded.
    #[error("failed to read image {path:?}: {reason}")]
    ImageIo { path: Option<PathBuf>, reason: String },
    /// The template root could not be listed.
    #[error("cannot read template directory {path:?}: {reason}")]
    TemplateRoot { path: PathBuf, reason: String },
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}
