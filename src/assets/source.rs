use std::path::PathBuf;
use std::sync::Arc;

use crate::assets::decode::{decode_raster, load_raster};
use crate::foundation::core::RasterImage;
use crate::foundation::error::LuminaResult;

/// Reference to a photo or template chosen by the caller.
///
/// Encoded and path references are decoded lazily, on the blocking pool, when the pipeline
/// processes them.
#[derive(Clone, Debug)]
pub enum ImageRef {
    /// Already-decoded pixels.
    Raster(RasterImage),
    /// Encoded image bytes (PNG, JPEG, ...).
    Encoded(Arc<[u8]>),
    /// Image file on disk.
    Path(PathBuf),
}

impl ImageRef {
    /// Produce pixels for this reference, decoding when necessary.
    pub fn materialize(&self) -> LuminaResult<RasterImage> {
        match self {
            Self::Raster(img) => Ok(img.clone()),
            Self::Encoded(bytes) => decode_raster(bytes),
            Self::Path(path) => load_raster(path),
        }
    }

    /// Short description used in logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Raster(img) => format!("raster {}x{}", img.width(), img.height()),
            Self::Encoded(bytes) => format!("{} encoded bytes", bytes.len()),
            Self::Path(path) => format!("file '{}'", path.display()),
        }
    }
}

impl From<RasterImage> for ImageRef {
    fn from(img: RasterImage) -> Self {
        Self::Raster(img)
    }
}

impl From<PathBuf> for ImageRef {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<u8>> for ImageRef {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Encoded(bytes.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
