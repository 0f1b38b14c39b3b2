//! Error types for smartsight.

use thiserror::Error;

/// Result alias for smartsight operations.
pub type SmartSightResult<T> = std::result::Result<T, SmartSightError>;

/// Errors that can occur while post-processing a detection frame.
///
/// Every variant is contained to the frame that produced it: the pipeline
/// reports it and moves on to the next frame.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SmartSightError {
    /// The inference engine is missing or failed to initialize.
    #[error("model unavailable: {reason}")]
    ModelUnavailable {
        /// Human-readable cause reported by the engine.
        reason: String,
    },
    /// A tensor read addressed a slot or channel past the declared shape.
    #[error("{context} index {index} out of range (len {len})")]
    OutOfRange {
        /// Requested index.
        index: usize,
        /// Number of valid indices.
        len: usize,
        /// Which axis was addressed.
        context: &'static str,
    },
    /// The output buffer length disagrees with the declared `(N, C)` shape.
    #[error("output shape mismatch: expected {expected} values, got {got}")]
    ShapeMismatch { expected: usize, got: usize },
    /// The label table has no entries.
    #[error("label table is empty")]
    EmptyLabels,
    /// Frame dimensions are zero or overflow.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is shorter than a row of pixels.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Pixel buffer is shorter than the declared frame.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A configuration value is outside its valid range.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    /// Reading the label file failed.
    #[error("label io: {reason}")]
    LabelsIo { reason: String },
    /// Decoding an image file failed.
    #[error("image io: {reason}")]
    ImageIo { reason: String },
    /// The detection worker thread is gone.
    #[error("detection worker stopped")]
    WorkerStopped,
}
