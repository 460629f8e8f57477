pub use kurbo::Insets;

/// Output geometry subtitles are rendered for.
///
/// Rendering is geometry-dependent, so any change here invalidates every pre-rendered frame.
/// `margins` are in output pixels (`x0` left, `y0` top, `x1` right, `y1` bottom) and describe
/// the area outside the video where subtitles may still be placed.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OsdRes {
    /// Output width in pixels.
    pub w: u32,
    /// Output height in pixels.
    pub h: u32,
    /// Black-border margins around the video area.
    #[serde(default)]
    pub margins: Insets,
    /// Display pixel aspect ratio.
    #[serde(default = "default_display_par")]
    pub display_par: f64,
}

fn default_display_par() -> f64 {
    1.0
}

impl Default for OsdRes {
    fn default() -> Self {
        Self {
            w: 0,
            h: 0,
            margins: Insets::ZERO,
            display_par: 1.0,
        }
    }
}

impl OsdRes {
    /// Geometry of `w`x`h` pixels without margins and with square pixels.
    pub fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            ..Self::default()
        }
    }

    /// Return a copy with the given margins.
    pub fn with_margins(self, margins: Insets) -> Self {
        Self { margins, ..self }
    }

    /// `true` when nothing can be rendered for this geometry.
    pub fn is_degenerate(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Height of the video area (output height minus top/bottom margins), at least 1 pixel.
    pub fn video_height(&self) -> u32 {
        let h = f64::from(self.h) - self.margins.y0.max(0.0) - self.margins.y1.max(0.0);
        h.max(1.0) as u32
    }
}

/// Parameters of the video the subtitles are displayed over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VideoParams {
    /// Coded video width.
    pub width: u32,
    /// Coded video height.
    pub height: u32,
    /// Pixel aspect numerator.
    pub par_num: u32,
    /// Pixel aspect denominator.
    pub par_den: u32,
}

impl VideoParams {
    /// Square-pixel video of `width`x`height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            par_num: 1,
            par_den: 1,
        }
    }
}
