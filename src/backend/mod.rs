//! Subtitle codec backends.
//!
//! A backend decodes packets into internal state and renders that state into a bitmap list for a
//! presentation time and output geometry. The coordinator serializes every call into a backend
//! behind its backend lock, so implementations never need their own locking.

/// Bitmap-picture backend with packet backpressure.
pub mod picture;
/// Timed-text backend.
pub mod text;

use crate::demux::packet::{SubCodec, SubPacket};
use crate::foundation::core::{OsdRes, VideoParams};
use crate::foundation::error::{SubError, SubResult};
use crate::render::bitmap::SubBitmaps;

/// Control commands forwarded to a backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SubCtrl {
    /// Find the start of the `movement`-th subtitle event after (`> 0`) or before (`< 0`) `pts`.
    SubStep {
        /// Reference time in seconds.
        pts: f64,
        /// Number of events to move; the sign selects the direction.
        movement: i32,
    },
    /// The video the subtitles are displayed over changed.
    SetVideoParams(VideoParams),
    /// Place subtitles at the top of the video instead of the bottom.
    SetTop(bool),
    /// Frame rate to assume for frame-based subtitle timing.
    SetVideoDefFps(f64),
}

/// Backend answer to a [`SubCtrl`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CtrlReply {
    /// The backend does not implement the command.
    Unknown,
    /// The command was applied.
    Done,
    /// Answer to [`SubCtrl::SubStep`]: offset in seconds from the reference time to the target
    /// event start.
    StepDelta(f64),
}

/// Decoder/renderer for one subtitle codec.
///
/// Optional capabilities have default implementations. `accepts_packet` doubles as a capability
/// flag: a backend returning `Some(_)` needs packets applied synchronously and never gets a
/// render-ahead worker.
pub trait SubBackend: Send {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Prepare for `codec`. An error means this backend cannot handle the stream.
    fn init(&mut self, codec: &SubCodec) -> SubResult<()>;

    /// Apply one packet. Malformed packets are skipped, not reported.
    fn decode(&mut self, packet: SubPacket);

    /// Render the decoded state at `pts` for `res`.
    fn get_bitmaps(&mut self, res: OsdRes, pts: f64) -> SubBitmaps;

    /// Plain text of the subtitle visible at `pts`, if the codec carries text.
    fn get_text(&mut self, _pts: f64) -> Option<String> {
        None
    }

    /// Whether another packet can be applied now. `None` when the backend never pushes back.
    fn accepts_packet(&self) -> Option<bool> {
        None
    }

    /// Discard decoder state after a seek.
    fn reset(&mut self) {}

    /// Stream was selected or deselected for display.
    fn select(&mut self, _selected: bool) {}

    /// Handle a control command.
    fn control(&mut self, _cmd: SubCtrl) -> CtrlReply {
        CtrlReply::Unknown
    }

    /// Release backend resources. Called once before the backend is dropped.
    fn uninit(&mut self) {}
}

/// Built-in backend kinds, in matching priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// [`picture::PictureBackend`].
    Picture,
    /// [`text::TextBackend`].
    Text,
}

impl BackendKind {
    /// Every built-in backend, in the order they are tried.
    pub const ALL: [Self; 2] = [Self::Picture, Self::Text];
}

/// Create a fresh, uninitialized backend.
pub fn create_backend(kind: BackendKind) -> Box<dyn SubBackend> {
    match kind {
        BackendKind::Picture => Box::new(picture::PictureBackend::new()),
        BackendKind::Text => Box::new(text::TextBackend::new()),
    }
}

/// Fresh instances of every built-in backend, in matching order.
pub fn builtin_backends() -> Vec<Box<dyn SubBackend>> {
    BackendKind::ALL.into_iter().map(create_backend).collect()
}

/// Return the first candidate whose `init` accepts `codec`.
pub fn open_backend(
    codec: &SubCodec,
    candidates: Vec<Box<dyn SubBackend>>,
) -> SubResult<Box<dyn SubBackend>> {
    for mut backend in candidates {
        match backend.init(codec) {
            Ok(()) => {
                tracing::debug!(backend = backend.name(), codec = %codec.name, "matched subtitle backend");
                return Ok(backend);
            }
            Err(e) => {
                tracing::trace!(backend = backend.name(), codec = %codec.name, "backend declined: {e}");
            }
        }
    }
    tracing::error!(codec = %codec.name, "could not find subtitle decoder");
    Err(SubError::no_decoder(codec.name.clone()))
}

#[cfg(test)]
#[path = "../../tests/unit/backend/registry.rs"]
mod tests;
