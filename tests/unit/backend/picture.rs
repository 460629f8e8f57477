use super::*;
use crate::foundation::core::{Insets, VideoParams};

const WHITE: [u8; 4] = [255, 255, 255, 255];

fn backend(extradata: &str) -> PictureBackend {
    let mut b = PictureBackend::new();
    b.init(&SubCodec::new("picture").with_extradata(extradata))
        .unwrap();
    b
}

fn picture(pts: f64, dur: Option<f64>, x: u16, y: u16, w: u16, h: u16) -> SubPacket {
    let coverage = vec![200u8; usize::from(w) * usize::from(h)];
    SubPacket::new(Some(pts), dur, encode_picture(x, y, w, h, WHITE, &coverage))
}

#[test]
fn init_checks_codec_and_extradata() {
    let mut b = PictureBackend::new();
    assert!(b.init(&SubCodec::new("subrip")).is_err());
    assert!(
        b.init(&SubCodec::new("picture").with_extradata("wide"))
            .is_err()
    );
    assert!(
        b.init(&SubCodec::new("picture").with_extradata("640x360"))
            .is_ok()
    );
}

#[test]
fn payload_header_round_trips_position_and_color() {
    let mut b = backend("100x100");
    let data = encode_picture(10, 20, 2, 1, [1, 2, 3, 4], &[9, 8]);
    b.decode(SubPacket::new(Some(0.0), None, data));

    let frame = b.get_bitmaps(OsdRes::new(100, 100), 0.0);
    let part = &frame.parts[0];
    assert_eq!((part.x, part.y, part.w, part.h), (10, 20, 2, 1));
    assert_eq!(part.color, [1, 2, 3, 4]);
    assert_eq!(part.bitmap, vec![9, 8]);
}

#[test]
fn scales_source_coordinates_to_output() {
    let mut b = backend("640x360");
    b.decode(picture(0.0, None, 320, 180, 64, 18));

    let frame = b.get_bitmaps(OsdRes::new(1280, 720), 0.5);
    let part = &frame.parts[0];
    assert_eq!((part.x, part.y), (640, 360));
    assert_eq!((part.w, part.h), (64, 18));
    assert_eq!((part.dw, part.dh), (128, 36));
}

#[test]
fn margins_offset_the_video_area() {
    let mut b = backend("640x360");
    b.decode(picture(0.0, None, 0, 0, 4, 4));

    let res = OsdRes::new(640, 480).with_margins(Insets::new(0.0, 60.0, 0.0, 60.0));
    let part = &b.get_bitmaps(res, 0.0).parts[0];
    assert_eq!((part.x, part.y), (0, 60));
}

#[test]
fn video_params_supply_source_size_without_extradata() {
    let mut b = PictureBackend::new();
    b.init(&SubCodec::new("picture")).unwrap();
    assert_eq!(
        b.control(SubCtrl::SetVideoParams(VideoParams::new(320, 180))),
        CtrlReply::Done
    );
    b.decode(picture(0.0, None, 10, 10, 2, 2));

    let part = &b.get_bitmaps(OsdRes::new(640, 360), 0.0).parts[0];
    assert_eq!((part.x, part.y, part.dw, part.dh), (20, 20, 4, 4));
}

#[test]
fn backpressure_until_pictures_expire() {
    let mut b = backend("100x100");
    assert_eq!(b.accepts_packet(), Some(true));
    for i in 0..MAX_PENDING_PICTURES {
        b.decode(picture(i as f64, Some(0.5), 0, 0, 1, 1));
    }
    assert_eq!(b.accepts_packet(), Some(false));

    b.get_bitmaps(OsdRes::new(100, 100), 2.0);
    assert_eq!(b.pending(), 2);
    assert_eq!(b.accepts_packet(), Some(true));
}

#[test]
fn next_picture_ends_open_ended_one() {
    let mut b = backend("100x100");
    b.decode(picture(1.0, None, 0, 0, 1, 1));
    b.decode(picture(3.0, None, 5, 5, 1, 1));
    let res = OsdRes::new(100, 100);

    assert!(b.get_bitmaps(res, 0.5).is_empty());
    assert_eq!(b.get_bitmaps(res, 2.0).parts[0].x, 0);
    assert_eq!(b.get_bitmaps(res, 3.0).parts[0].x, 5);
    assert_eq!(b.pending(), 1);
}

#[test]
fn empty_payload_clears_the_screen() {
    let mut b = backend("100x100");
    b.decode(picture(1.0, None, 0, 0, 1, 1));
    b.decode(SubPacket::new(Some(2.0), None, Vec::new()));
    let res = OsdRes::new(100, 100);

    assert!(!b.get_bitmaps(res, 1.5).is_empty());
    assert!(b.get_bitmaps(res, 2.5).is_empty());
}

#[test]
fn malformed_packets_are_skipped() {
    let mut b = backend("100x100");
    b.decode(SubPacket::new(Some(0.0), None, vec![1, 2, 3]));
    let mut short = encode_picture(0, 0, 4, 4, WHITE, &[0; 4]);
    short.truncate(HEADER_LEN + 2);
    b.decode(SubPacket::new(Some(0.0), None, short));
    b.decode(SubPacket::new(None, None, encode_picture(0, 0, 1, 1, WHITE, &[1])));
    assert_eq!(b.pending(), 0);
}

#[test]
fn change_id_tracks_displayed_picture() {
    let mut b = backend("100x100");
    b.decode(picture(1.0, Some(1.0), 0, 0, 1, 1));
    let res = OsdRes::new(100, 100);

    assert_ne!(b.get_bitmaps(res, 1.0).change_id, 0);
    assert_eq!(b.get_bitmaps(res, 1.5).change_id, 0);
    assert_ne!(b.get_bitmaps(res, 2.5).change_id, 0);
    assert_eq!(b.get_bitmaps(res, 3.0).change_id, 0);
}

#[test]
fn reset_drops_pending_pictures() {
    let mut b = backend("100x100");
    b.decode(picture(1.0, None, 0, 0, 1, 1));
    b.reset();
    assert_eq!(b.pending(), 0);
    assert!(b.get_bitmaps(OsdRes::new(100, 100), 1.0).is_empty());
}
