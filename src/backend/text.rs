use crate::backend::{CtrlReply, SubBackend, SubCtrl};
use crate::demux::packet::{SubCodec, SubPacket};
use crate::foundation::core::OsdRes;
use crate::foundation::error::{SubError, SubResult};
use crate::render::bitmap::{BitmapFormat, SubBitmap, SubBitmaps};

const CODECS: [&str; 3] = ["text", "subrip", "webvtt"];

// Font size as a fraction of the video height.
const FONT_DIVISOR: u32 = 18;
const GLYPH_ASPECT: f64 = 0.6;

const STEP_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
struct TextEvent {
    id: u64,
    start: f64,
    end: Option<f64>,
    text: String,
}

#[derive(Debug, Clone, PartialEq)]
struct RenderKey {
    active: Vec<u64>,
    res: OsdRes,
    top: bool,
}

/// Push backend for plain timed text (SubRip, WebVTT cues, raw UTF-8 lines).
///
/// Every packet is one event. Events without a duration stay visible until the next event
/// starts. Lines are drawn with a block rasterizer: one filled cell per visible character.
#[derive(Debug)]
pub struct TextBackend {
    events: Vec<TextEvent>,
    next_id: u64,
    top: bool,
    color: [u8; 4],
    last_key: Option<RenderKey>,
    change_counter: u64,
}

impl Default for TextBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBackend {
    /// Create an uninitialized backend.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 0,
            top: false,
            color: [255, 255, 255, 255],
            last_key: None,
            change_counter: 0,
        }
    }

    /// Number of decoded events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    fn effective_end(&self, idx: usize) -> Option<f64> {
        let ev = &self.events[idx];
        match ev.end {
            Some(end) => Some(end),
            None => self
                .events
                .get(idx + 1..)
                .and_then(|rest| rest.iter().map(|e| e.start).find(|&s| s > ev.start)),
        }
    }

    fn active_at(&self, pts: f64) -> Vec<usize> {
        (0..self.events.len())
            .filter(|&i| {
                let ev = &self.events[i];
                ev.start <= pts && self.effective_end(i).is_none_or(|end| pts < end)
            })
            .collect()
    }

    fn step_target(&self, pts: f64, movement: i32) -> Option<f64> {
        let mut starts: Vec<f64> = self.events.iter().map(|e| e.start).collect();
        starts.dedup();
        if movement > 0 {
            starts
                .into_iter()
                .filter(|&s| s > pts + STEP_EPSILON)
                .nth(movement.unsigned_abs() as usize - 1)
        } else if movement < 0 {
            starts
                .into_iter()
                .rev()
                .filter(|&s| s < pts - STEP_EPSILON)
                .nth(movement.unsigned_abs() as usize - 1)
        } else {
            None
        }
    }

    fn layout_lines(&self, res: OsdRes, lines: &[&str]) -> Vec<SubBitmap> {
        let font_px = (res.video_height() / FONT_DIVISOR).max(2);
        let cell_w = ((f64::from(font_px) * GLYPH_ASPECT).round() as u32).max(1);
        let block_h = font_px * lines.len() as u32;

        let y_top = if self.top {
            res.margins.y0.max(0.0) as i64 + i64::from(font_px / 2)
        } else {
            i64::from(res.h) - res.margins.y1.max(0.0) as i64 - i64::from(font_px / 2)
                - i64::from(block_h)
        };

        let mut parts = Vec::with_capacity(lines.len());
        for (row, line) in lines.iter().enumerate() {
            let chars: Vec<char> = line.chars().collect();
            let max_chars = (res.w / cell_w).max(1) as usize;
            let chars = &chars[..chars.len().min(max_chars)];
            let w = cell_w * chars.len() as u32;
            let h = font_px;
            if w == 0 {
                continue;
            }

            let pad_y = h / 6;
            let mut coverage = vec![0u8; (w * h) as usize];
            for y in pad_y..h.saturating_sub(pad_y) {
                for (ci, ch) in chars.iter().enumerate() {
                    if ch.is_whitespace() {
                        continue;
                    }
                    let x0 = ci as u32 * cell_w;
                    for x in x0 + 1..x0 + cell_w.saturating_sub(1) {
                        coverage[(y * w + x) as usize] = 255;
                    }
                }
            }

            let x = (i64::from(res.w) - i64::from(w)) / 2;
            let y = y_top + i64::from(font_px) * row as i64;
            if let Ok(part) = SubBitmap::alpha(x as i32, y as i32, w, h, self.color, coverage) {
                parts.push(part);
            }
        }
        parts
    }
}

impl SubBackend for TextBackend {
    fn name(&self) -> &'static str {
        "text"
    }

    fn init(&mut self, codec: &SubCodec) -> SubResult<()> {
        if !CODECS.contains(&codec.name.as_str()) {
            return Err(SubError::backend(format!(
                "text backend does not handle codec '{}'",
                codec.name
            )));
        }
        Ok(())
    }

    fn decode(&mut self, packet: SubPacket) {
        let Some(start) = packet.pts else {
            tracing::warn!("text packet without timestamp, skipping");
            return;
        };
        let text = match String::from_utf8(packet.data) {
            Ok(t) => t.replace("\r\n", "\n").trim_end().to_string(),
            Err(e) => {
                tracing::warn!(pts = start, "text packet is not valid UTF-8, skipping: {e}");
                return;
            }
        };

        // Demuxers resend packets after seeks.
        if self
            .events
            .iter()
            .any(|e| e.start == start && e.text == text)
        {
            return;
        }

        let end = packet.duration.map(|d| start + d);
        let at = self.events.partition_point(|e| e.start <= start);
        self.events.insert(
            at,
            TextEvent {
                id: self.next_id,
                start,
                end,
                text,
            },
        );
        self.next_id += 1;
    }

    fn get_bitmaps(&mut self, res: OsdRes, pts: f64) -> SubBitmaps {
        let active = self.active_at(pts);
        let key = RenderKey {
            active: active.iter().map(|&i| self.events[i].id).collect(),
            res,
            top: self.top,
        };
        let change_id = if self.last_key.as_ref() == Some(&key) {
            0
        } else {
            self.change_counter += 1;
            self.change_counter
        };
        self.last_key = Some(key);

        if res.is_degenerate() {
            return SubBitmaps::empty(change_id);
        }

        let lines: Vec<&str> = active
            .iter()
            .flat_map(|&i| self.events[i].text.lines())
            .filter(|l| !l.trim().is_empty())
            .collect();
        let parts = self.layout_lines(res, &lines);
        SubBitmaps {
            format: if parts.is_empty() {
                BitmapFormat::Empty
            } else {
                BitmapFormat::Alpha8
            },
            parts,
            change_id,
        }
    }

    fn get_text(&mut self, pts: f64) -> Option<String> {
        let text: Vec<&str> = self
            .active_at(pts)
            .into_iter()
            .map(|i| self.events[i].text.as_str())
            .filter(|t| !t.is_empty())
            .collect();
        (!text.is_empty()).then(|| text.join("\n"))
    }

    fn reset(&mut self) {
        self.last_key = None;
    }

    fn control(&mut self, cmd: SubCtrl) -> CtrlReply {
        match cmd {
            SubCtrl::SubStep { pts, movement } => match self.step_target(pts, movement) {
                Some(target) => CtrlReply::StepDelta(target - pts),
                None => CtrlReply::Done,
            },
            SubCtrl::SetTop(top) => {
                self.top = top;
                CtrlReply::Done
            }
            SubCtrl::SetVideoParams(_) | SubCtrl::SetVideoDefFps(_) => CtrlReply::Unknown,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/text.rs"]
mod tests;
