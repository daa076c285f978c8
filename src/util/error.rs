//! Error types for freedet.

use thiserror::Error;

/// Result alias for freedet operations.
pub type FreeDetResult<T> = std::result::Result<T, FreeDetError>;

/// Errors reported by the decoding pipeline.
///
/// Every variant is raised during input validation at the pipeline boundary;
/// the decoding loops themselves are infallible.
#[derive(Debug, Error, PartialEq)]
pub enum FreeDetError {
    /// The stride list and the per-level prediction list disagree in length.
    #[error("level count mismatch: {strides} strides, {levels} prediction levels")]
    LevelCountMismatch { strides: usize, levels: usize },
    /// A prediction buffer is shorter than its declared shape requires.
    #[error("{buffer} buffer too small: needed {needed}, got {got}")]
    BufferTooSmall {
        needed: usize,
        got: usize,
        buffer: &'static str,
    },
    /// A feature-map shape overflows the address space.
    #[error("invalid feature-map dimensions: {width}x{height}")]
    InvalidDimensions { height: usize, width: usize },
    /// A level carries a different class count than the decoder expects.
    #[error("class count mismatch at level {level}: expected {expected}, got {got}")]
    ClassCountMismatch {
        level: usize,
        expected: usize,
        got: usize,
    },
    /// A level stride is zero.
    #[error("invalid stride at level {level}: strides must be positive")]
    InvalidStride { level: usize },
    /// A threshold lies outside `[0, 1]` or is not finite.
    #[error("invalid {name}: {value} is outside [0, 1]")]
    InvalidThreshold { name: &'static str, value: f32 },
    /// The configured class count is zero.
    #[error("num_classes must be positive")]
    InvalidClassCount,
    /// The image dimensions are zero.
    #[error("invalid image size: {width}x{height}")]
    InvalidImageSize { height: usize, width: usize },
}
