use std::io::Cursor;

use super::*;
use crate::foundation::error::LuminaError;

#[test]
fn raster_reference_shares_pixels() {
    let img = RasterImage::filled(3, 2, [1, 2, 3, 255]).unwrap();
    let r = ImageRef::from(img.clone());
    let out = r.materialize().unwrap();
    assert!(out.shares_buffer_with(&img));
    assert_eq!(r.describe(), "raster 3x2");
}

#[test]
fn encoded_reference_decodes_lazily() {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        4,
        5,
        image::Rgba([9, 8, 7, 255]),
    ))
    .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
    .unwrap();

    let r = ImageRef::from(buf);
    assert!(matches!(r, ImageRef::Encoded(_)));
    let out = r.materialize().unwrap();
    assert_eq!(out.dimensions(), (4, 5));
    assert_eq!(out.pixel(3, 4), Some([9, 8, 7, 255]));
}

#[test]
fn broken_references_are_decode_errors() {
    let bytes = ImageRef::from(b"nope".to_vec());
    assert!(matches!(bytes.materialize(), Err(LuminaError::Decode(_))));

    let path = ImageRef::from(std::env::temp_dir().join(format!(
        "lumina_source_missing_{}.png",
        std::process::id()
    )));
    assert!(path.describe().starts_with("file '"));
    assert!(matches!(path.materialize(), Err(LuminaError::Decode(_))));
}
