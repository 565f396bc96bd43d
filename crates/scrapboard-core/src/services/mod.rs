//! External collaborators: image sources and link metadata providers.
//!
//! Both are driven off the owning thread by [`BackgroundWorker`], which hands
//! results back through a channel.

mod worker;

pub use worker::{BackgroundWorker, WorkerMessage};

use crate::error::{ImportError, LinkPreviewError};
use crate::storage::BoxFuture;
use std::path::PathBuf;
use url::Url;

/// Metadata for a link card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPreview {
    pub title: Option<String>,
    /// Preview image bytes.
    pub image: Option<Vec<u8>>,
}

/// Fetches link metadata (title and preview image).
pub trait LinkPreviewProvider: Send + Sync {
    fn fetch(&self, url: Url) -> BoxFuture<'_, Result<LinkPreview, LinkPreviewError>>;
}

/// One picked image, loaded lazily.
pub trait ImageSource: Send {
    /// Name used in logs.
    fn name(&self) -> String;

    fn load(&self) -> BoxFuture<'_, Result<Vec<u8>, ImportError>>;
}

/// Image bytes already in memory.
pub struct BytesSource {
    name: String,
    bytes: Vec<u8>,
}

impl BytesSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

impl ImageSource for BytesSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn load(&self) -> BoxFuture<'_, Result<Vec<u8>, ImportError>> {
        Box::pin(async move { Ok(self.bytes.clone()) })
    }
}

/// An image file on disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ImageSource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> BoxFuture<'_, Result<Vec<u8>, ImportError>> {
        Box::pin(async move {
            std::fs::read(&self.path)
                .map_err(|e| ImportError::Source(format!("Failed to read {}: {}", self.path.display(), e)))
        })
    }
}

/// Check that `link` is an absolute http(s) URL.
pub fn parse_link(link: &str) -> Result<Url, LinkPreviewError> {
    let url = Url::parse(link.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(LinkPreviewError::NotAllowed),
    }
}
