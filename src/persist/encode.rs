use std::io::Write;

use image::codecs::jpeg::JpegEncoder;

use crate::foundation::core::{CHANNELS, RasterImage};
use crate::foundation::error::{LuminaError, LuminaResult};

/// MIME type of every encoded artifact.
pub const JPEG_MIME: &str = "image/jpeg";

/// Maximum JPEG quality accepted by the encoder.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Encode `img` as JPEG into `out`.
///
/// JPEG has no alpha channel, so pixels are flattened over the opaque `bg_rgb` first.
pub fn encode_jpeg_into<W: Write>(
    out: W,
    img: &RasterImage,
    quality: u8,
    bg_rgb: [u8; 3],
) -> LuminaResult<()> {
    if quality == 0 || quality > MAX_JPEG_QUALITY {
        return Err(LuminaError::persist(format!(
            "jpeg quality must be in 1..={MAX_JPEG_QUALITY}, got {quality}"
        )));
    }
    if img.width() == 0 || img.height() == 0 {
        return Err(LuminaError::persist(format!(
            "cannot encode an empty {}x{} image",
            img.width(),
            img.height()
        )));
    }

    let rgb = flatten_rgba8_over_bg(img.data(), bg_rgb);
    let mut encoder = JpegEncoder::new_with_quality(out, quality);
    encoder
        .encode(&rgb, img.width(), img.height(), image::ExtendedColorType::Rgb8)
        .map_err(|e| LuminaError::persist(format!("jpeg encode failed: {e}")))
}

/// Encode `img` as JPEG into a fresh buffer.
pub fn encode_jpeg(img: &RasterImage, quality: u8, bg_rgb: [u8; 3]) -> LuminaResult<Vec<u8>> {
    let mut buf = Vec::new();
    encode_jpeg_into(&mut buf, img, quality, bg_rgb)?;
    Ok(buf)
}

/// Composite straight-alpha RGBA8 over an opaque background, producing packed RGB8.
fn flatten_rgba8_over_bg(rgba: &[u8], bg_rgb: [u8; 3]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / CHANNELS * 3);
    for px in rgba.chunks_exact(CHANNELS) {
        let a = u16::from(px[3]);
        if a == 255 {
            rgb.extend_from_slice(&px[..3]);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let v = (u32::from(px[c]) * u32::from(a) + u32::from(bg_rgb[c]) * u32::from(inv) + 127)
                / 255;
            rgb.push(v as u8);
        }
    }
    rgb
}

#[cfg(test)]
#[path = "../../tests/unit/persist/encode.rs"]
mod tests;
