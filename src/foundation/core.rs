use std::sync::Arc;

use crate::foundation::error::{LuminaError, LuminaResult};

pub use kurbo::Rect;

/// Channel count of every [`RasterImage`] buffer (RGBA8).
pub const CHANNELS: usize = 4;

/// Immutable in-memory raster: straight-alpha RGBA8, row-major.
///
/// The pixel buffer is reference counted, so clones share storage and a pass-through composition
/// hands back the very same buffer it was given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    rgba8: Arc<Vec<u8>>,
}

impl RasterImage {
    /// Create a raster from raw RGBA8 bytes.
    ///
    /// Fails with [`LuminaError::InvalidInput`] when `rgba8.len() != width * height * 4`.
    pub fn new(width: u32, height: u32, rgba8: Vec<u8>) -> LuminaResult<Self> {
        let expected = buffer_len(width, height)?;
        if rgba8.len() != expected {
            return Err(LuminaError::invalid_input(format!(
                "raster buffer length {} does not match {width}x{height}x{CHANNELS} = {expected}",
                rgba8.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8: Arc::new(rgba8),
        })
    }

    /// Create a raster where every pixel is `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> LuminaResult<Self> {
        let len = buffer_len(width, height)?;
        let mut data = Vec::with_capacity(len);
        for _ in 0..(len / CHANNELS) {
            data.extend_from_slice(&rgba);
        }
        Self::new(width, height, data)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` pair.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.rgba8
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// Return `true` when both rasters share the same pixel storage.
    pub fn shares_buffer_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.rgba8, &other.rgba8)
    }

    /// Pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.stride() + x as usize * CHANNELS;
        let px = &self.rgba8[i..i + CHANNELS];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Copy into an `image` crate buffer.
    pub fn to_rgba_image(&self) -> LuminaResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.rgba8.as_ref().clone())
            .ok_or_else(|| LuminaError::invalid_input("raster does not fit an RGBA8 image buffer"))
    }

    /// Take ownership of an `image` crate buffer.
    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            rgba8: Arc::new(img.into_raw()),
        }
    }
}

fn buffer_len(width: u32, height: u32) -> LuminaResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(CHANNELS))
        .ok_or_else(|| LuminaError::invalid_input(format!("raster {width}x{height} is too large")))
}

/// Opaque, stable reference to an artifact in external storage.
///
/// Assigned by the storage backend when an artifact is committed and never reused.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    /// Wrap a storage-assigned reference.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
