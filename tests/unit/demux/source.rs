use super::*;

fn pkt(pts: f64) -> SubPacket {
    SubPacket::text(pts, Some(1.0), "x")
}

#[test]
fn vec_source_reads_in_order_then_ends() {
    let mut src = VecPacketSource::from(vec![pkt(1.0), pkt(2.0)]);
    assert_eq!(src.remaining(), 2);

    let ReadStatus::Packet(p) = src.read_packet_async() else {
        panic!("expected packet");
    };
    assert_eq!(p.pts, Some(1.0));
    assert_eq!(src.read_packet().and_then(|p| p.pts), Some(2.0));
    assert!(matches!(src.read_packet_async(), ReadStatus::Eof));
    assert!(src.read_packet().is_none());
}

#[test]
fn channel_source_waits_while_connected() {
    let (tx, mut src) = ChannelPacketSource::channel();
    assert!(matches!(src.read_packet_async(), ReadStatus::Wait));

    tx.send(pkt(3.0)).unwrap();
    let ReadStatus::Packet(p) = src.read_packet_async() else {
        panic!("expected packet");
    };
    assert_eq!(p.pts, Some(3.0));

    drop(tx);
    assert!(matches!(src.read_packet_async(), ReadStatus::Eof));
}

#[test]
fn channel_source_blocking_read_drains_before_eof() {
    let (tx, mut src) = ChannelPacketSource::channel();
    let feeder = std::thread::spawn(move || {
        for i in 0..3 {
            tx.send(pkt(f64::from(i))).unwrap();
        }
    });

    let mut seen = Vec::new();
    while let Some(p) = src.read_packet() {
        seen.push(p.pts.unwrap());
    }
    feeder.join().unwrap();
    assert_eq!(seen, vec![0.0, 1.0, 2.0]);
}

#[test]
fn packet_end_needs_pts_and_duration() {
    assert_eq!(SubPacket::text(1.5, Some(2.0), "a").end_pts(), Some(3.5));
    assert_eq!(SubPacket::text(1.5, None, "a").end_pts(), None);
    assert_eq!(SubPacket::new(None, Some(1.0), vec![]).end_pts(), None);
}
