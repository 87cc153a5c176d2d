use std::io::Cursor;

use super::*;

fn png_bytes(img: image::RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_png_keeps_straight_alpha() {
    let img = image::RgbaImage::from_raw(1, 1, vec![100u8, 50, 200, 128]).unwrap();
    let raster = decode_raster(&png_bytes(img)).unwrap();
    assert_eq!(raster.dimensions(), (1, 1));
    assert_eq!(raster.data(), &[100, 50, 200, 128]);
}

#[test]
fn decode_garbage_is_decode_error() {
    let err = decode_raster(b"definitely not an image").unwrap_err();
    assert!(matches!(err, LuminaError::Decode(_)));
}

#[test]
fn load_missing_file_is_decode_error() {
    let path = std::env::temp_dir().join(format!("lumina_missing_{}.png", std::process::id()));
    let err = load_raster(&path).unwrap_err();
    assert!(matches!(err, LuminaError::Decode(_)));
    assert!(err.to_string().contains("lumina_missing_"));
}
