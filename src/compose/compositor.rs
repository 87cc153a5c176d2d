use image::imageops::{self, FilterType};
use rayon::prelude::*;

use crate::foundation::core::{CHANNELS, RasterImage, Rect};
use crate::foundation::error::{LuminaError, LuminaResult};

/// Where a photo lands on a template.
///
/// The photo is scaled to half the template width (aspect preserved) and centered. `rect` is the
/// exact, possibly fractional, destination; pixel writes start at [`Placement::origin`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// `floor(template.width / 2)`.
    pub target_width: u32,
    /// `round(photo.height * scale)`. May exceed the template height (and `u32`); only the
    /// visible rows are ever materialized.
    pub target_height: u64,
    /// `target_width / photo.width`.
    pub scale: f64,
    /// Destination `[left, top, left + target_width, top + target_height]`.
    pub rect: Rect,
}

impl Placement {
    /// Top-left destination pixel, rounded to nearest (half away from zero).
    ///
    /// Only the origin is rounded; the extent is always `target_width x target_height`.
    pub fn origin(&self) -> (i64, i64) {
        (self.rect.x0.round() as i64, self.rect.y0.round() as i64)
    }

    /// Return `true` when nothing would be drawn.
    pub fn is_empty(&self) -> bool {
        self.target_width == 0 || self.target_height == 0
    }

    /// Rows `[first, last)` of the scaled photo that fall inside a canvas `canvas_h` rows tall.
    pub fn visible_rows(&self, canvas_h: u32) -> (u64, u64) {
        let (_, top) = self.origin();
        let h = i64::try_from(self.target_height).unwrap_or(i64::MAX);
        let first = top.saturating_neg().clamp(0, h);
        let last = i64::from(canvas_h).saturating_sub(top).clamp(0, h);
        (first as u64, last.max(first) as u64)
    }
}

/// Compute the placement of a `photo_w x photo_h` photo on a `template_w x template_h` canvas.
pub fn placement(
    template_w: u32,
    template_h: u32,
    photo_w: u32,
    photo_h: u32,
) -> LuminaResult<Placement> {
    if photo_w == 0 {
        return Err(LuminaError::invalid_input(
            "photo width must be > 0 to compute a scale",
        ));
    }

    let target_width = template_w / 2;
    let scale = f64::from(target_width) / f64::from(photo_w);
    // photo_h * scale < 2^63, so the conversion is exact up to f64 precision.
    let target_height = (f64::from(photo_h) * scale).round() as u64;

    let left = f64::from(template_w - target_width) / 2.0;
    let top = (f64::from(template_h) - target_height as f64) / 2.0;

    Ok(Placement {
        target_width,
        target_height,
        scale,
        rect: Rect::new(
            left,
            top,
            left + f64::from(target_width),
            top + target_height as f64,
        ),
    })
}

/// Overlay `photo`, scaled and centered, onto `template`.
///
/// Without a template the photo is returned unchanged (same pixel storage). With one, the output
/// has exactly the template's dimensions: the template is the base layer and the bilinear-resampled
/// photo overwrites the pixels under its destination rectangle, clipped to the canvas. Only the
/// visible part of the scaled photo is resampled, so memory stays bounded by the inputs.
#[tracing::instrument(skip_all, fields(
    photo_w = photo.width(),
    photo_h = photo.height(),
    template = ?template.map(RasterImage::dimensions),
))]
pub fn compose(template: Option<&RasterImage>, photo: &RasterImage) -> LuminaResult<RasterImage> {
    if photo.width() == 0 || photo.height() == 0 {
        return Err(LuminaError::invalid_input(format!(
            "photo must have positive dimensions, got {}x{}",
            photo.width(),
            photo.height()
        )));
    }

    let Some(template) = template else {
        tracing::debug!("no template, passing photo through");
        return Ok(photo.clone());
    };
    if template.width() == 0 || template.height() == 0 {
        return Err(LuminaError::invalid_input(format!(
            "template must have positive dimensions, got {}x{}",
            template.width(),
            template.height()
        )));
    }

    let place = placement(
        template.width(),
        template.height(),
        photo.width(),
        photo.height(),
    )?;

    let mut out = template.data().to_vec();
    let (first, last) = place.visible_rows(template.height());
    if !place.is_empty() && first < last {
        if place.scale >= 1.0 {
            sample_bilinear(&mut out, template.width(), photo, &place);
        } else {
            resample_window(&mut out, template.width(), photo, &place, first, last)?;
        }
    }

    tracing::debug!(
        target_w = place.target_width,
        target_h = place.target_height,
        visible_rows = last - first,
        scale = place.scale,
        "composited photo onto template"
    );
    RasterImage::new(template.width(), template.height(), out)
}

/// Magnification: sample every visible destination pixel straight from the photo.
///
/// Pixel centers map as `(d + 0.5) * src / dst - 0.5`, the same tent the `Triangle` filter
/// uses when enlarging.
fn sample_bilinear(dst: &mut [u8], dst_w: u32, photo: &RasterImage, place: &Placement) {
    let (left, top) = place.origin();
    let x0 = left.clamp(0, i64::from(dst_w));
    let x1 = (left + i64::from(place.target_width)).clamp(0, i64::from(dst_w));
    if x0 >= x1 {
        return;
    }

    let taps = |d: u64, src_len: u32, dst_len: u64| -> (usize, usize, f32) {
        let s = ((d as f64 + 0.5) * f64::from(src_len) / dst_len as f64 - 0.5)
            .clamp(0.0, f64::from(src_len - 1));
        let i0 = s.floor() as usize;
        let i1 = (i0 + 1).min(src_len as usize - 1);
        (i0, i1, (s - i0 as f64) as f32)
    };
    let cols: Vec<(usize, usize, f32)> = (x0..x1)
        .map(|x| taps((x - left) as u64, photo.width(), u64::from(place.target_width)))
        .collect();

    let src = photo.data();
    let src_stride = photo.stride();
    let dst_stride = dst_w as usize * CHANNELS;
    dst.par_chunks_mut(dst_stride)
        .enumerate()
        .for_each(|(y, row)| {
            let dy = y as i64 - top;
            if dy < 0 || dy as u64 >= place.target_height {
                return;
            }
            let (r0, r1, fy) = taps(dy as u64, photo.height(), place.target_height);
            let top_row = &src[r0 * src_stride..(r0 + 1) * src_stride];
            let bot_row = &src[r1 * src_stride..(r1 + 1) * src_stride];
            for (i, &(c0, c1, fx)) in cols.iter().enumerate() {
                let d = (x0 as usize + i) * CHANNELS;
                for ch in 0..CHANNELS {
                    let upper = lerp(top_row[c0 * CHANNELS + ch], top_row[c1 * CHANNELS + ch], fx);
                    let lower = lerp(bot_row[c0 * CHANNELS + ch], bot_row[c1 * CHANNELS + ch], fx);
                    row[d + ch] = (upper + (lower - upper) * fy).round().clamp(0.0, 255.0) as u8;
                }
            }
        });
}

fn lerp(a: u8, b: u8, t: f32) -> f32 {
    f32::from(a) + (f32::from(b) - f32::from(a)) * t
}

/// Minification: resample only the photo rows that cover visible rows `[first, last)`.
fn resample_window(
    dst: &mut [u8],
    dst_w: u32,
    photo: &RasterImage,
    place: &Placement,
    first: u64,
    last: u64,
) -> LuminaResult<()> {
    // Shrinking keeps target_height <= photo height, which fits u32.
    let target_h = u32::try_from(place.target_height)
        .map_err(|_| LuminaError::invalid_input("scaled photo height does not fit u32"))?;
    let ratio = f64::from(target_h) / f64::from(photo.height());
    let src_y0 = ((first as f64 / ratio).floor() as u32).min(photo.height());
    let src_y1 = ((last as f64 / ratio).ceil() as u32).min(photo.height());
    let dst_y0 = (f64::from(src_y0) * ratio).round() as u32;
    let dst_y1 = (f64::from(src_y1) * ratio).round() as u32;
    if src_y0 >= src_y1 || dst_y0 >= dst_y1 {
        return Ok(());
    }

    let view = image::ImageBuffer::<image::Rgba<u8>, &[u8]>::from_raw(
        photo.width(),
        photo.height(),
        photo.data(),
    )
    .ok_or_else(|| LuminaError::invalid_input("photo buffer does not match its dimensions"))?;
    let window = imageops::crop_imm(&view, 0, src_y0, photo.width(), src_y1 - src_y0);
    let scaled = imageops::resize(
        &*window,
        place.target_width,
        dst_y1 - dst_y0,
        FilterType::Triangle,
    );

    let (left, top) = place.origin();
    blit_opaque(
        dst,
        dst_w,
        scaled.as_raw(),
        place.target_width,
        (left, top + i64::from(dst_y0)),
    );
    Ok(())
}

/// Copy `src` rows over `dst` starting at `origin`, clipping against the destination canvas.
fn blit_opaque(dst: &mut [u8], dst_w: u32, src: &[u8], src_w: u32, origin: (i64, i64)) {
    let dst_stride = dst_w as usize * CHANNELS;
    let src_stride = src_w as usize * CHANNELS;
    if dst_stride == 0 || src_stride == 0 {
        return;
    }
    let src_h = (src.len() / src_stride) as i64;
    let (left, top) = origin;

    let x0 = left.clamp(0, i64::from(dst_w));
    let x1 = (left + i64::from(src_w)).clamp(0, i64::from(dst_w));
    if x0 >= x1 {
        return;
    }
    let src_x = (x0 - left) as usize * CHANNELS;
    let span = (x1 - x0) as usize * CHANNELS;

    dst.par_chunks_mut(dst_stride)
        .enumerate()
        .for_each(|(y, row)| {
            let sy = y as i64 - top;
            if sy < 0 || sy >= src_h {
                return;
            }
            let s = sy as usize * src_stride + src_x;
            let d = x0 as usize * CHANNELS;
            row[d..d + span].copy_from_slice(&src[s..s + span]);
        });
}

#[cfg(test)]
#[path = "../../tests/unit/compose/compositor.rs"]
mod tests;
