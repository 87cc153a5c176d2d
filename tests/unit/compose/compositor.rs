use super::*;

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RasterImage {
    RasterImage::filled(w, h, rgba).unwrap()
}

fn is_blue(px: [u8; 4]) -> bool {
    px[0] <= 5 && px[2] >= 250 && px[3] >= 250
}

#[test]
fn placement_matches_reference_scenario() {
    let p = placement(800, 600, 400, 300).unwrap();
    assert_eq!(p.target_width, 400);
    assert_eq!(p.target_height, 300);
    assert_eq!(p.scale, 1.0);
    assert_eq!(p.rect, Rect::new(200.0, 150.0, 600.0, 450.0));
    assert_eq!(p.origin(), (200, 150));
}

#[test]
fn target_width_is_half_template_width_floored() {
    for tw in [1u32, 2, 3, 7, 100, 101, 1279] {
        let p = placement(tw, 50, 13, 9).unwrap();
        assert_eq!(p.target_width, tw / 2, "template width {tw}");
    }
}

#[test]
fn target_height_rounds_to_nearest() {
    // scale = 50 / 3, 2 * 50 / 3 = 33.33 -> 33
    assert_eq!(placement(100, 100, 3, 2).unwrap().target_height, 33);
    // scale = 5 / 2, 3 * 2.5 = 7.5 -> 8
    assert_eq!(placement(10, 10, 2, 3).unwrap().target_height, 8);
}

#[test]
fn placement_rejects_zero_width_photo() {
    let err = placement(100, 100, 0, 10).unwrap_err();
    assert!(matches!(err, LuminaError::InvalidInput(_)));
}

#[test]
fn compose_without_template_passes_photo_through() {
    let photo = solid(7, 3, BLUE);
    let out = compose(None, &photo).unwrap();
    assert_eq!(out, photo);
    assert!(out.shares_buffer_with(&photo));
}

#[test]
fn compose_zero_width_photo_is_invalid_input() {
    let photo = RasterImage::new(0, 4, Vec::new()).unwrap();
    let template = solid(8, 8, RED);
    assert!(matches!(
        compose(Some(&template), &photo),
        Err(LuminaError::InvalidInput(_))
    ));
    assert!(matches!(
        compose(None, &photo),
        Err(LuminaError::InvalidInput(_))
    ));
}

#[test]
fn compose_output_has_template_dimensions() {
    let cases = [
        ((800, 600), (400, 300)),
        ((33, 17), (5, 40)),
        ((2, 2), (9, 9)),
        ((1, 1), (3, 3)),
        ((64, 48), (1, 1)),
    ];
    for ((tw, th), (pw, ph)) in cases {
        let out = compose(Some(&solid(tw, th, RED)), &solid(pw, ph, BLUE)).unwrap();
        assert_eq!(out.dimensions(), (tw, th));
    }
}

#[test]
fn compose_overwrites_only_destination_rect() {
    let template = solid(800, 600, RED);
    let photo = solid(400, 300, BLUE);
    let out = compose(Some(&template), &photo).unwrap();

    for (x, y) in [(200, 150), (599, 449), (400, 300)] {
        assert!(is_blue(out.pixel(x, y).unwrap()), "({x},{y}) inside rect");
    }
    for (x, y) in [(199, 150), (600, 300), (400, 149), (400, 450), (0, 0), (799, 599)] {
        assert_eq!(out.pixel(x, y).unwrap(), RED, "({x},{y}) outside rect");
    }
}

#[test]
fn compose_does_not_blend_with_template() {
    let template = solid(4, 4, RED);
    let photo = solid(2, 2, [0, 0, 255, 0]);
    let out = compose(Some(&template), &photo).unwrap();
    let px = out.pixel(1, 1).unwrap();
    assert_eq!(px[0], 0, "template colour must not survive under the photo");
}

#[test]
fn compose_rounds_fractional_origin() {
    // left = (101 - 50) / 2 = 25.5 -> 26
    let out = compose(Some(&solid(101, 100, RED)), &solid(1, 1, BLUE)).unwrap();
    assert_eq!(out.pixel(25, 50).unwrap(), RED);
    assert!(is_blue(out.pixel(26, 50).unwrap()));
    assert!(is_blue(out.pixel(75, 50).unwrap()));
    assert_eq!(out.pixel(76, 50).unwrap(), RED);
}

#[test]
fn compose_clips_photo_taller_than_template() {
    // target 50x500 centered at top = -200: every row is covered between x = 25 and 75.
    let out = compose(Some(&solid(100, 100, RED)), &solid(10, 100, BLUE)).unwrap();
    assert_eq!(out.dimensions(), (100, 100));
    for y in [0, 50, 99] {
        assert_eq!(out.pixel(24, y).unwrap(), RED);
        assert!(is_blue(out.pixel(25, y).unwrap()));
        assert!(is_blue(out.pixel(74, y).unwrap()));
        assert_eq!(out.pixel(75, y).unwrap(), RED);
    }
}

#[test]
fn compose_one_pixel_template_keeps_template() {
    let template = solid(1, 1, RED);
    let out = compose(Some(&template), &solid(3, 3, BLUE)).unwrap();
    assert_eq!(out.pixel(0, 0).unwrap(), RED);
}

#[test]
fn compose_leaves_inputs_untouched() {
    let template = solid(10, 10, RED);
    let photo = solid(4, 4, BLUE);
    let before_t = template.data().to_vec();
    let before_p = photo.data().to_vec();
    let a = compose(Some(&template), &photo).unwrap();
    let b = compose(Some(&template), &photo).unwrap();
    assert_eq!(template.data(), before_t.as_slice());
    assert_eq!(photo.data(), before_p.as_slice());
    assert_eq!(a, b);
}

#[test]
fn visible_rows_clip_to_canvas() {
    let p = placement(100, 100, 10, 100).unwrap();
    assert_eq!(p.target_height, 500);
    assert_eq!(p.origin(), (25, -200));
    assert_eq!(p.visible_rows(100), (200, 300));

    let p = placement(800, 600, 400, 300).unwrap();
    assert_eq!(p.visible_rows(600), (0, 300));
}

#[test]
fn extreme_aspect_photo_only_materializes_visible_rows() {
    // Scaled photo is 10000 x 20_000_000_000; only two rows land on the canvas.
    let template = solid(20_000, 2, RED);
    let photo = solid(1, 2_000_000, BLUE);
    let p = placement(20_000, 2, 1, 2_000_000).unwrap();
    assert_eq!(p.target_height, 20_000_000_000);

    let out = compose(Some(&template), &photo).unwrap();
    assert_eq!(out.dimensions(), (20_000, 2));
    for y in 0..2 {
        assert_eq!(out.pixel(4_999, y).unwrap(), RED);
        assert!(is_blue(out.pixel(5_000, y).unwrap()));
        assert!(is_blue(out.pixel(14_999, y).unwrap()));
        assert_eq!(out.pixel(15_000, y).unwrap(), RED);
    }
}

#[test]
fn shrunk_photo_taller_than_canvas_keeps_its_middle() {
    // 200x4000 shrinks to 50x1000 at top = -495; canvas rows map to photo rows near 2000.
    let (pw, ph) = (200u32, 4000u32);
    let mut data = Vec::with_capacity((pw * ph * 4) as usize);
    for r in 0..ph {
        let g = (u64::from(r) * 255 / u64::from(ph - 1)) as u8;
        for _ in 0..pw {
            data.extend_from_slice(&[0, g, 0, 255]);
        }
    }
    let photo = RasterImage::new(pw, ph, data).unwrap();
    let out = compose(Some(&solid(100, 10, RED)), &photo).unwrap();

    assert_eq!(out.pixel(24, 0).unwrap(), RED);
    assert_eq!(out.pixel(75, 9).unwrap(), RED);
    let px = out.pixel(50, 5).unwrap();
    assert_eq!(px[0], 0);
    assert!(px[1].abs_diff(128) <= 3, "middle row sampled, got {px:?}");
    assert_eq!(px[3], 255);
}

#[test]
fn enlarged_photo_is_bilinear() {
    // 2x1 black/white doubles to 4x2 at origin (2, 3).
    let photo = RasterImage::new(2, 1, vec![0, 0, 0, 255, 255, 255, 255, 255]).unwrap();
    let out = compose(Some(&solid(8, 8, RED)), &photo).unwrap();
    let reds: Vec<u8> = (2..6).map(|x| out.pixel(x, 3).unwrap()[0]).collect();
    assert_eq!(reds, vec![0, 64, 191, 255]);
    assert_eq!(out.pixel(3, 4).unwrap(), [64, 64, 64, 255]);
    assert_eq!(out.pixel(1, 3).unwrap(), RED);
    assert_eq!(out.pixel(3, 5).unwrap(), RED);
}
