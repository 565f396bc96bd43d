//! Error types for media import and link previews.

use thiserror::Error;

/// Failure to turn picked media into a board object.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("Image data could not be read: {0}")]
    Unreadable(String),
    #[error("Unsupported image format")]
    UnsupportedFormat,
    #[error("Image source failed: {0}")]
    Source(String),
}

/// Failure to fetch link metadata.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkPreviewError {
    #[error("Link preview was cancelled")]
    Cancelled,
    #[error("Link preview failed: {0}")]
    Failed(String),
    #[error("Link preview timed out")]
    TimedOut,
    #[error("Link preview is not allowed for this URL")]
    NotAllowed,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<image::ImageError> for ImportError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(_) => ImportError::UnsupportedFormat,
            other => ImportError::Unreadable(other.to_string()),
        }
    }
}

impl From<url::ParseError> for LinkPreviewError {
    fn from(err: url::ParseError) -> Self {
        LinkPreviewError::InvalidUrl(err.to_string())
    }
}
