use crate::backend::{CtrlReply, SubBackend, SubCtrl};
use crate::demux::packet::{SubCodec, SubPacket};
use crate::foundation::core::OsdRes;
use crate::foundation::error::{SubError, SubResult};
use crate::render::bitmap::{BitmapFormat, SubBitmap, SubBitmaps};
use std::collections::VecDeque;

const CODEC: &str = "picture";

/// Pictures decoded but not yet expired. Further packets are refused until rendering drains them.
pub const MAX_PENDING_PICTURES: usize = 4;

const HEADER_LEN: usize = 12;

/// Encode a picture packet payload.
///
/// Layout: `x, y, w, h` as `u16` little endian, `color` as `u32` little endian holding
/// `0xRRGGBBAA`, then `w * h` coverage bytes.
pub fn encode_picture(
    x: u16,
    y: u16,
    w: u16,
    h: u16,
    color: [u8; 4],
    coverage: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + coverage.len());
    for v in [x, y, w, h] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&u32::from_be_bytes(color).to_le_bytes());
    out.extend_from_slice(coverage);
    out
}

#[derive(Debug)]
struct Picture {
    id: u64,
    start: f64,
    end: Option<f64>,
    // None clears the screen.
    part: Option<SubBitmap>,
}

/// Backpressured backend for pre-rasterized coverage pictures in source-video coordinates.
///
/// A picture stays visible until its duration elapses or the next picture starts.
#[derive(Debug)]
pub struct PictureBackend {
    pictures: VecDeque<Picture>,
    next_id: u64,
    source_size: Option<(u32, u32)>,
    video_size: Option<(u32, u32)>,
    last_key: Option<(Option<u64>, OsdRes)>,
    change_counter: u64,
}

impl Default for PictureBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PictureBackend {
    /// Create an uninitialized backend.
    pub fn new() -> Self {
        Self {
            pictures: VecDeque::new(),
            next_id: 0,
            source_size: None,
            video_size: None,
            last_key: None,
            change_counter: 0,
        }
    }

    /// Pictures currently held.
    pub fn pending(&self) -> usize {
        self.pictures.len()
    }

    fn parse(data: &[u8]) -> SubResult<Option<SubBitmap>> {
        if data.is_empty() {
            return Ok(None);
        }
        if data.len() < HEADER_LEN {
            return Err(SubError::decode(format!(
                "picture packet of {} bytes is shorter than its header",
                data.len()
            )));
        }
        let field = |i: usize| u16::from_le_bytes([data[i * 2], data[i * 2 + 1]]);
        let (x, y, w, h) = (field(0), field(1), field(2), field(3));
        let color = u32::from_le_bytes([data[8], data[9], data[10], data[11]]).to_be_bytes();
        let part = SubBitmap::alpha(
            i32::from(x),
            i32::from(y),
            u32::from(w),
            u32::from(h),
            color,
            data[HEADER_LEN..].to_vec(),
        )
        .map_err(|e| SubError::decode(e.to_string()))?;
        Ok(Some(part))
    }

    fn expire(&mut self, pts: f64) {
        while let Some(front) = self.pictures.front() {
            let superseded = self.pictures.get(1).is_some_and(|next| next.start <= pts);
            let ended = front.end.is_some_and(|end| end <= pts);
            if !(superseded || ended) {
                break;
            }
            self.pictures.pop_front();
        }
    }

    fn place(&self, part: &SubBitmap, res: OsdRes) -> SubBitmap {
        let (sw, sh) = self
            .source_size
            .or(self.video_size)
            .unwrap_or((res.w, res.h));
        let m = res.margins;
        let area_w = (f64::from(res.w) - m.x0.max(0.0) - m.x1.max(0.0)).max(1.0);
        let area_h = (f64::from(res.h) - m.y0.max(0.0) - m.y1.max(0.0)).max(1.0);
        let sx = area_w / f64::from(sw.max(1));
        let sy = area_h / f64::from(sh.max(1));

        SubBitmap {
            x: (m.x0.max(0.0) + f64::from(part.x) * sx).round() as i32,
            y: (m.y0.max(0.0) + f64::from(part.y) * sy).round() as i32,
            ..part.clone()
        }
        .scaled_to(
            (f64::from(part.w) * sx).round() as u32,
            (f64::from(part.h) * sy).round() as u32,
        )
    }
}

fn parse_size(extradata: &[u8]) -> Option<(u32, u32)> {
    let s = std::str::from_utf8(extradata).ok()?;
    let (w, h) = s.trim().split_once('x')?;
    let size = (w.parse().ok()?, h.parse().ok()?);
    (size.0 > 0 && size.1 > 0).then_some(size)
}

impl SubBackend for PictureBackend {
    fn name(&self) -> &'static str {
        "picture"
    }

    fn init(&mut self, codec: &SubCodec) -> SubResult<()> {
        if codec.name != CODEC {
            return Err(SubError::backend(format!(
                "picture backend does not handle codec '{}'",
                codec.name
            )));
        }
        if !codec.extradata.is_empty() {
            self.source_size = Some(parse_size(&codec.extradata).ok_or_else(|| {
                SubError::validation("picture extradata must be a \"WxH\" source size")
            })?);
        }
        Ok(())
    }

    fn decode(&mut self, packet: SubPacket) {
        let Some(start) = packet.pts else {
            tracing::warn!("picture packet without timestamp, skipping");
            return;
        };
        let part = match Self::parse(&packet.data) {
            Ok(part) => part,
            Err(e) => {
                tracing::warn!(pts = start, "skipping malformed picture packet: {e}");
                return;
            }
        };

        // A new picture replaces whatever is on screen, so earlier pictures end here at the latest.
        for prev in self.pictures.iter_mut() {
            if prev.start < start && prev.end.is_none_or(|end| end > start) {
                prev.end = Some(start);
            }
        }
        let at = self.pictures.partition_point(|p| p.start <= start);
        self.pictures.insert(
            at,
            Picture {
                id: self.next_id,
                start,
                end: packet.duration.map(|d| start + d),
                part,
            },
        );
        self.next_id += 1;
    }

    fn get_bitmaps(&mut self, res: OsdRes, pts: f64) -> SubBitmaps {
        self.expire(pts);
        let shown = self
            .pictures
            .front()
            .filter(|p| p.start <= pts && p.part.is_some())
            .map(|p| p.id);

        let key = (shown, res);
        let change_id = if self.last_key == Some(key) {
            0
        } else {
            self.change_counter += 1;
            self.change_counter
        };
        self.last_key = Some(key);

        let part = shown
            .and_then(|_| self.pictures.front())
            .and_then(|p| p.part.as_ref());
        match part {
            Some(part) if !res.is_degenerate() => SubBitmaps {
                format: BitmapFormat::Alpha8,
                parts: vec![self.place(part, res)],
                change_id,
            },
            _ => SubBitmaps::empty(change_id),
        }
    }

    fn accepts_packet(&self) -> Option<bool> {
        Some(self.pictures.len() < MAX_PENDING_PICTURES)
    }

    fn reset(&mut self) {
        self.pictures.clear();
        self.last_key = None;
    }

    fn control(&mut self, cmd: SubCtrl) -> CtrlReply {
        match cmd {
            SubCtrl::SetVideoParams(p) => {
                self.video_size = (p.width > 0 && p.height > 0).then_some((p.width, p.height));
                CtrlReply::Done
            }
            _ => CtrlReply::Unknown,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/picture.rs"]
mod tests;
