use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::LuminaResult;

/// Descriptor of one remote image.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RemoteImage {
    /// Source-assigned identifier.
    pub id: String,
    /// Credited author.
    pub author: String,
    /// Where the full image can be downloaded.
    pub download_url: String,
}

/// Read-only provider of remote image descriptors.
pub trait ImageSource {
    /// Fetch the current descriptors, in source order.
    fn fetch(&self) -> LuminaResult<Vec<RemoteImage>>;
}

impl<S: ImageSource + ?Sized> ImageSource for &S {
    fn fetch(&self) -> LuminaResult<Vec<RemoteImage>> {
        (**self).fetch()
    }
}

impl<S: ImageSource + ?Sized> ImageSource for Box<S> {
    fn fetch(&self) -> LuminaResult<Vec<RemoteImage>> {
        (**self).fetch()
    }
}

/// Source reading a JSON array of descriptors from a file.
#[derive(Clone, Debug)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Read from `path` on every fetch.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File this source reads.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for JsonFileSource {
    fn fetch(&self) -> LuminaResult<Vec<RemoteImage>> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read feed file '{}'", self.path.display()))?;
        let entries: Vec<RemoteImage> = serde_json::from_str(&text)
            .with_context(|| format!("parse feed file '{}'", self.path.display()))?;
        Ok(entries)
    }
}
