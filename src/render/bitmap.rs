use crate::foundation::error::{SubError, SubResult};
use kurbo::Rect;

/// Pixel layout of the parts in a [`SubBitmaps`] list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BitmapFormat {
    /// Nothing to draw.
    #[default]
    Empty,
    /// One coverage byte per pixel, tinted with the part's `color`.
    Alpha8,
}

/// One positioned bitmap of a rendered subtitle frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SubBitmap {
    /// Left edge in output pixels.
    pub x: i32,
    /// Top edge in output pixels.
    pub y: i32,
    /// Source width in pixels.
    pub w: u32,
    /// Source height in pixels.
    pub h: u32,
    /// Display width in output pixels (differs from `w` when the part must be scaled).
    pub dw: u32,
    /// Display height in output pixels.
    pub dh: u32,
    /// Bytes per source row.
    pub stride: usize,
    /// Straight-alpha RGBA tint applied to `Alpha8` coverage.
    pub color: [u8; 4],
    /// Pixel rows, `stride * h` bytes.
    pub bitmap: Vec<u8>,
}

impl SubBitmap {
    /// Create an unscaled `Alpha8` part from tightly packed coverage bytes.
    pub fn alpha(
        x: i32,
        y: i32,
        w: u32,
        h: u32,
        color: [u8; 4],
        coverage: Vec<u8>,
    ) -> SubResult<Self> {
        let expected = (w as usize).saturating_mul(h as usize);
        if coverage.len() != expected {
            return Err(SubError::validation(format!(
                "alpha bitmap {w}x{h} needs {expected} bytes, got {}",
                coverage.len()
            )));
        }
        Ok(Self {
            x,
            y,
            w,
            h,
            dw: w,
            dh: h,
            stride: w as usize,
            color,
            bitmap: coverage,
        })
    }

    /// Return a copy displayed at `dw`x`dh` output pixels.
    pub fn scaled_to(self, dw: u32, dh: u32) -> Self {
        Self { dw, dh, ..self }
    }

    /// Borrow source row `y`.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = (y as usize).saturating_mul(self.stride);
        let end = start.saturating_add(self.stride).min(self.bitmap.len());
        &self.bitmap[start.min(end)..end]
    }

    /// Display rectangle in output pixels.
    pub fn display_rect(&self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x) + f64::from(self.dw),
            f64::from(self.y) + f64::from(self.dh),
        )
    }
}

/// A rendered subtitle frame: a list of positioned bitmaps plus a change indicator.
///
/// Straight from a backend, `change_id == 0` means it produced exactly what it produced for the
/// immediately preceding render call. Any other value means the output changed.
///
/// Frames served from the render-ahead cache carry the id of the render that produced their
/// storage: consecutive cached frames with equal ids show the same content.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubBitmaps {
    /// Format shared by every part.
    pub format: BitmapFormat,
    /// Bitmaps in drawing order.
    pub parts: Vec<SubBitmap>,
    /// Change indicator relative to the previous render call.
    pub change_id: u64,
}

impl SubBitmaps {
    /// An empty frame carrying `change_id`.
    pub fn empty(change_id: u64) -> Self {
        Self {
            format: BitmapFormat::Empty,
            parts: Vec::new(),
            change_id,
        }
    }

    /// `true` when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.format == BitmapFormat::Empty || self.parts.is_empty()
    }

    /// `true` when the backend reported no change since its previous render call.
    pub fn is_unchanged(&self) -> bool {
        self.change_id == 0
    }

    /// Total pixel bytes held by all parts.
    pub fn byte_len(&self) -> usize {
        self.parts.iter().map(|p| p.bitmap.len()).sum()
    }

    /// Union of the display rectangles of all parts.
    pub fn bounding_box(&self) -> Option<Rect> {
        self.parts
            .iter()
            .map(SubBitmap::display_rect)
            .reduce(|a, b| a.union(b))
    }

    /// Draw every part over a transparent `width`x`height` premultiplied RGBA8 canvas.
    ///
    /// Scaled parts use nearest-neighbour sampling. Parts are clipped to the canvas.
    pub fn composite_rgba(&self, width: u32, height: u32) -> Vec<u8> {
        let mut out = vec![0u8; (width as usize) * (height as usize) * 4];
        if self.is_empty() {
            return out;
        }

        for part in &self.parts {
            if part.w == 0 || part.h == 0 || part.dw == 0 || part.dh == 0 {
                continue;
            }
            for dy in 0..part.dh {
                let oy = i64::from(part.y) + i64::from(dy);
                if oy < 0 || oy >= i64::from(height) {
                    continue;
                }
                let sy = (u64::from(dy) * u64::from(part.h) / u64::from(part.dh)) as u32;
                let row = part.row(sy);
                for dx in 0..part.dw {
                    let ox = i64::from(part.x) + i64::from(dx);
                    if ox < 0 || ox >= i64::from(width) {
                        continue;
                    }
                    let sx = (u64::from(dx) * u64::from(part.w) / u64::from(part.dw)) as usize;
                    let Some(&cov) = row.get(sx) else { continue };
                    let src = premul_tint(part.color, cov);
                    let at = ((oy as usize) * (width as usize) + ox as usize) * 4;
                    blend_over(&mut out[at..at + 4], src);
                }
            }
        }
        out
    }
}

fn mul_div255(a: u8, b: u8) -> u8 {
    ((u16::from(a) * u16::from(b) + 127) / 255) as u8
}

fn premul_tint(color: [u8; 4], coverage: u8) -> [u8; 4] {
    let a = mul_div255(color[3], coverage);
    [
        mul_div255(color[0], a),
        mul_div255(color[1], a),
        mul_div255(color[2], a),
        a,
    ]
}

fn blend_over(dst: &mut [u8], src: [u8; 4]) {
    let inv = 255 - src[3];
    for c in 0..4 {
        dst[c] = src[c].saturating_add(mul_div255(dst[c], inv));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/bitmap.rs"]
mod tests;
