//! subrender turns a stream of timed subtitle packets into renderable bitmap frames.
//!
//! A [`Coordinator`] owns one subtitle stream. It matches a [`SubBackend`] to the stream's codec,
//! feeds it packets from a [`PacketSource`] and hands out rendered frames:
//!
//! - [`Coordinator::read_packets`] pulls packets and registers presentation times to render ahead
//! - a worker thread decodes queued packets and pre-renders registered times into a bounded cache
//! - [`Coordinator::acquire`] returns the frame for an exact time as a [`SubFrame`], which must be
//!   released before the next acquire
//!
//! Consecutive frames the backend reports as unchanged share one bitmap storage.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Subtitle codec backends.
pub mod backend;
/// Per-stream decode/render coordinator.
pub mod coordinator;
/// Packets, codecs and packet sources.
pub mod demux;
/// Bitmap frames and the render-ahead cache.
pub mod render;

pub use crate::foundation::core::{Insets, OsdRes, VideoParams};
pub use crate::foundation::error::{SubError, SubResult};

pub use crate::backend::picture::{MAX_PENDING_PICTURES, PictureBackend, encode_picture};
pub use crate::backend::text::TextBackend;
pub use crate::backend::{
    BackendKind, CtrlReply, SubBackend, SubCtrl, builtin_backends, create_backend, open_backend,
};
pub use crate::coordinator::{CACHE_SLACK, Coordinator, MAX_RENDER_AHEAD, SubFrame, SubOpts};
pub use crate::demux::packet::{SubCodec, SubPacket};
pub use crate::demux::source::{
    ChannelPacketSource, PacketSender, PacketSource, ReadStatus, VecPacketSource,
};
pub use crate::render::CacheStats;
pub use crate::render::bitmap::{BitmapFormat, SubBitmap, SubBitmaps};
