/// One compressed subtitle packet as produced by the demuxer.
///
/// Timestamps are in seconds on the presentation clock. `pts == None` means the demuxer could not
/// assign a timestamp; backends decide whether such packets are usable.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubPacket {
    /// Presentation timestamp in seconds.
    pub pts: Option<f64>,
    /// Display duration in seconds, if known.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Codec payload.
    #[serde(default)]
    pub data: Vec<u8>,
}

impl SubPacket {
    /// Create a packet from raw payload bytes.
    pub fn new(pts: Option<f64>, duration: Option<f64>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            pts,
            duration,
            data: data.into(),
        }
    }

    /// Create a timed packet carrying UTF-8 text.
    pub fn text(pts: f64, duration: Option<f64>, text: &str) -> Self {
        Self::new(Some(pts), duration, text.as_bytes())
    }

    /// End of the display interval, when both `pts` and `duration` are known.
    pub fn end_pts(&self) -> Option<f64> {
        Some(self.pts? + self.duration?)
    }
}

/// Codec description of a subtitle stream, used to match a backend.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubCodec {
    /// Codec name (e.g. `"subrip"`, `"picture"`).
    pub name: String,
    /// Codec-private setup data.
    #[serde(default)]
    pub extradata: Vec<u8>,
}

impl SubCodec {
    /// Codec without extradata.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extradata: Vec::new(),
        }
    }

    /// Return a copy carrying `extradata`.
    pub fn with_extradata(mut self, extradata: impl Into<Vec<u8>>) -> Self {
        self.extradata = extradata.into();
        self
    }
}
