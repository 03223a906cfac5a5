//! Error types for the thumbnail renderer

use crate::feature_gate::FeatureEntry;
use thiserror::Error;

/// Result type alias for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing the process or rendering a thumbnail
#[derive(Error, Debug)]
pub enum Error {
    /// The platform refused to change a feature flag. Fatal at startup.
    #[error("Failed to disable {entry:?}: platform status {code:#010x}")]
    PlatformFeatureError { entry: FeatureEntry, code: i32 },

    /// Requested (or measured) box is outside `(0, max]`
    #[error("Box {width}x{height} is out of range (max {max})")]
    InvalidBoxError { width: u32, height: u32, max: u32 },

    /// No root `<svg>` element was found after the document loaded
    #[error("Malformed document: {0}")]
    MalformedDocumentError(String),

    /// Resize target is outside `(0, max]`
    #[error("Resize target {width}x{height} is out of range (max {max})")]
    InvalidDimensionError { width: u32, height: u32, max: u32 },

    /// Resize source has no pixels
    #[error("Cannot resize an empty image")]
    NullImageError,

    /// Failed to read input or write output
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unknown text encoding label
    #[error("Failed to decode input: {0}")]
    DecodeError(String),

    /// Failed to encode the raster image
    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    /// The backend could not load the document
    #[error("Failed to load document: {0}")]
    LoadError(String),

    /// The backend failed while laying out or capturing
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Backend did not report ready in time
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// The render was cancelled through its `CancelToken`
    #[error("Render cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::IoError(e),
            other => Error::EncodeError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}
