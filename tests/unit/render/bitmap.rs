use super::*;

fn white() -> [u8; 4] {
    [255, 255, 255, 255]
}

#[test]
fn alpha_part_rejects_wrong_length() {
    assert!(SubBitmap::alpha(0, 0, 4, 2, white(), vec![0; 7]).is_err());
    let p = SubBitmap::alpha(0, 0, 4, 2, white(), vec![0; 8]).unwrap();
    assert_eq!(p.stride, 4);
    assert_eq!((p.dw, p.dh), (4, 2));
}

#[test]
fn change_indicator_zero_means_unchanged() {
    assert!(SubBitmaps::empty(0).is_unchanged());
    assert!(!SubBitmaps::empty(7).is_unchanged());
    assert!(SubBitmaps::empty(7).is_empty());
}

#[test]
fn bounding_box_unions_parts() {
    let a = SubBitmap::alpha(10, 10, 2, 2, white(), vec![255; 4]).unwrap();
    let b = SubBitmap::alpha(20, 5, 3, 1, white(), vec![255; 3]).unwrap();
    let frame = SubBitmaps {
        format: BitmapFormat::Alpha8,
        parts: vec![a, b],
        change_id: 1,
    };
    assert_eq!(frame.bounding_box(), Some(Rect::new(10.0, 5.0, 23.0, 12.0)));
    assert_eq!(frame.byte_len(), 7);
    assert_eq!(SubBitmaps::empty(1).bounding_box(), None);
}

#[test]
fn composite_tints_coverage_and_clips() {
    let part = SubBitmap::alpha(-1, 0, 2, 1, [255, 0, 0, 255], vec![255, 255]).unwrap();
    let frame = SubBitmaps {
        format: BitmapFormat::Alpha8,
        parts: vec![part],
        change_id: 1,
    };
    let px = frame.composite_rgba(2, 1);
    // Left source pixel falls outside the canvas.
    assert_eq!(&px[0..4], &[255, 0, 0, 255]);
    assert_eq!(&px[4..8], &[0, 0, 0, 0]);
}

#[test]
fn composite_scales_with_display_size() {
    let part = SubBitmap::alpha(0, 0, 1, 1, white(), vec![255])
        .unwrap()
        .scaled_to(2, 2);
    let frame = SubBitmaps {
        format: BitmapFormat::Alpha8,
        parts: vec![part],
        change_id: 1,
    };
    let px = frame.composite_rgba(3, 3);
    let opaque = px.chunks_exact(4).filter(|p| p[3] == 255).count();
    assert_eq!(opaque, 4);
}
