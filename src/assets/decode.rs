use std::path::Path;

use crate::foundation::core::RasterImage;
use crate::foundation::error::{LuminaError, LuminaResult};

/// Decode an encoded image (PNG, JPEG, ...) into a straight-alpha RGBA8 raster.
pub fn decode_raster(bytes: &[u8]) -> LuminaResult<RasterImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| LuminaError::decode(format!("decode image from memory: {e}")))?;
    Ok(RasterImage::from_rgba_image(dyn_img.to_rgba8()))
}

/// Read and decode an image file.
pub fn load_raster(path: &Path) -> LuminaResult<RasterImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| LuminaError::decode(format!("read image '{}': {e}", path.display())))?;
    decode_raster(&bytes)
        .map_err(|e| LuminaError::decode(format!("'{}': {e}", path.display())))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
