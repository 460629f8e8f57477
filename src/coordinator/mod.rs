//! Per-stream decode/render coordinator.
//!
//! Two lock domains guard a [`Coordinator`]: the state lock (cache, pending packets, flags,
//! geometry) and the backend lock (every call into the [`SubBackend`]). Whenever both are held the
//! state lock is taken first. The worker drops the state lock before entering the backend so slow
//! decodes never block cache lookups.

mod frame;
mod opts;
mod worker;

pub use frame::SubFrame;
pub use opts::{CACHE_SLACK, MAX_RENDER_AHEAD, SubOpts};

use crate::backend::{CtrlReply, SubBackend, SubCtrl, builtin_backends, open_backend};
use crate::demux::packet::{SubCodec, SubPacket};
use crate::demux::source::{PacketSource, ReadStatus};
use crate::foundation::core::{OsdRes, VideoParams};
use crate::foundation::error::SubResult;
use crate::render::bitmap::SubBitmaps;
use crate::render::cache::{CacheStats, EntryId, RenderCache};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

pub(crate) struct State {
    pub(crate) threaded: bool,
    source: Box<dyn PacketSource>,
    last_pkt_pts: Option<f64>,
    last_video_params: Option<VideoParams>,
    pub(crate) last_res: OsdRes,
    pub(crate) cache: RenderCache,
    pub(crate) packets: Vec<SubPacket>,
    preloaded: bool,
    pub(crate) cur: Option<EntryId>,
}

/// Backend plus the arguments of its most recent render call.
///
/// A backend's change indicator is relative to its previous render call, so sharing decisions need
/// to know what that call was.
pub(crate) struct BackendSlot {
    pub(crate) backend: Box<dyn SubBackend>,
    pub(crate) last_render: Option<(f64, OsdRes)>,
}

impl BackendSlot {
    pub(crate) fn render(&mut self, res: OsdRes, pts: f64) -> SubBitmaps {
        let out = self.backend.get_bitmaps(res, pts);
        self.last_render = Some((pts, res));
        out
    }

    fn reset(&mut self) {
        self.backend.reset();
        self.last_render = None;
    }
}

pub(crate) struct Shared {
    opts: SubOpts,
    // Backend implements `accepts_packet`: packets are applied synchronously and no worker runs.
    backpressured: bool,
    pub(crate) state: Mutex<State>,
    pub(crate) wakeup: Condvar,
    pub(crate) backend: Mutex<BackendSlot>,
    pub(crate) reserved: AtomicBool,
}

impl Shared {
    fn feed_locked(&self, state: &mut State, packet: SubPacket) {
        if state.threaded {
            state.packets.push(packet);
            self.wakeup.notify_all();
        } else {
            self.backend.lock().backend.decode(packet);
        }
    }
}

/// Owns one subtitle stream: its backend, its packet source, the render-ahead cache and the
/// worker thread.
///
/// Every method takes `&self` and may be called from any thread. Rendering is single-flight:
/// at most one [`SubFrame`] may be outstanding at a time.
pub struct Coordinator {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    codec: SubCodec,
    backend_name: &'static str,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("codec", &self.codec.name)
            .field("backend", &self.backend_name)
            .field("opts", &self.shared.opts)
            .field("threaded", &self.worker.is_some())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Open `codec` with the first matching built-in backend.
    pub fn new(
        codec: SubCodec,
        source: impl PacketSource + 'static,
        opts: SubOpts,
    ) -> SubResult<Self> {
        Self::with_backends(codec, source, opts, builtin_backends())
    }

    /// Open `codec` with the first of `candidates` whose `init` accepts it.
    #[tracing::instrument(level = "debug", skip_all, fields(codec = %codec.name, render_ahead = opts.render_ahead))]
    pub fn with_backends(
        codec: SubCodec,
        source: impl PacketSource + 'static,
        opts: SubOpts,
        candidates: Vec<Box<dyn SubBackend>>,
    ) -> SubResult<Self> {
        opts.validate()?;
        let backend = open_backend(&codec, candidates)?;
        let backend_name = backend.name();
        let backpressured = backend.accepts_packet().is_some();
        let threaded = opts.render_ahead > 0 && !backpressured;

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                threaded,
                source: Box::new(source),
                last_pkt_pts: None,
                last_video_params: None,
                last_res: OsdRes::default(),
                cache: RenderCache::with_capacity(opts.cache_capacity()),
                packets: Vec::new(),
                preloaded: false,
                cur: None,
            }),
            wakeup: Condvar::new(),
            backend: Mutex::new(BackendSlot {
                backend,
                last_render: None,
            }),
            reserved: AtomicBool::new(false),
            backpressured,
            opts,
        });

        let worker = if threaded {
            let worker_shared = Arc::clone(&shared);
            match thread::Builder::new()
                .name("subrender".into())
                .spawn(move || worker::run(&worker_shared))
            {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!("could not start subtitle worker, rendering synchronously: {e}");
                    shared.state.lock().threaded = false;
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            shared,
            worker,
            codec,
            backend_name,
        })
    }

    /// Name of the matched backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    /// Codec this stream was opened with.
    pub fn codec(&self) -> &SubCodec {
        &self.codec
    }

    /// Options this stream was opened with.
    pub fn opts(&self) -> &SubOpts {
        &self.shared.opts
    }

    /// `true` while a render-ahead worker serves this stream.
    pub fn is_threaded(&self) -> bool {
        self.shared.state.lock().threaded
    }

    /// `true` once [`Coordinator::read_all_packets`] consumed the whole source.
    pub fn is_preloaded(&self) -> bool {
        self.shared.state.lock().preloaded
    }

    /// Snapshot of the render cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.shared.state.lock().cache.stats()
    }

    /// Hand one packet to the decoder, bypassing the packet source.
    ///
    /// In threaded mode the packet is queued for the worker, otherwise it is decoded immediately.
    /// Packets fed after the stream was preloaded are dropped.
    pub fn feed(&self, packet: SubPacket) {
        let mut state = self.shared.state.lock();
        if state.preloaded {
            tracing::debug!(pts = ?packet.pts, "stream is preloaded, dropping fed packet");
            return;
        }
        self.shared.feed_locked(&mut state, packet);
    }

    /// Drain the packet source completely and mark the stream preloaded.
    ///
    /// Blocks on the source while holding the state lock. Returns `false` without reading when
    /// the backend applies backpressure.
    pub fn read_all_packets(&self) -> bool {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        if shared.backpressured {
            return false;
        }
        while let Some(packet) = state.source.read_packet() {
            shared.feed_locked(&mut state, packet);
        }
        state.preloaded = true;
        shared.wakeup.notify_all();
        true
    }

    /// Pull packets needed to show subtitles at `pts`, and queue `pts` for rendering ahead.
    ///
    /// Reading stops once a packet beyond `pts` has been seen, possibly by an earlier call.
    /// Returns `false` when the source stalled before a packet beyond `pts` was seen: the caller
    /// should wait for the demuxer and retry. This is backpressure, not an error.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn read_packets(&self, pts: f64) -> bool {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        let mut ready = true;
        while !state.preloaded {
            if state.last_pkt_pts.is_some_and(|last| last > pts) {
                break;
            }
            if shared.backpressured && shared.backend.lock().backend.accepts_packet() == Some(false)
            {
                break;
            }
            match state.source.read_packet_async() {
                ReadStatus::Packet(packet) => {
                    let beyond = packet.pts.is_some_and(|p| p > pts);
                    state.last_pkt_pts = packet.pts;
                    shared.feed_locked(&mut state, packet);
                    if beyond {
                        break;
                    }
                }
                ReadStatus::Wait => {
                    ready = state.last_pkt_pts.is_some_and(|last| last > pts);
                    break;
                }
                ReadStatus::Eof => break,
                ReadStatus::Failed(e) => {
                    tracing::warn!("subtitle packet read failed: {e}");
                    break;
                }
            }
        }

        if state.threaded && ready {
            state.cache.request(pts);
            shared.wakeup.notify_all();
        }
        ready
    }

    /// Queue `pts` for rendering ahead without reading packets.
    pub fn add_pts(&self, pts: f64) {
        let mut state = self.shared.state.lock();
        if state.threaded {
            state.cache.request(pts);
            self.shared.wakeup.notify_all();
        }
    }

    /// Get the subtitle frame for exactly `pts` at geometry `res`.
    ///
    /// Pre-rendered frames come from the cache, blocking until the worker finishes them. Anything
    /// else is rendered synchronously while the frame holds the backend lock. Release the frame
    /// (or drop it) before acquiring again.
    ///
    /// # Panics
    ///
    /// When another frame from this coordinator is still outstanding.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn acquire(&self, res: OsdRes, pts: f64) -> SubFrame<'_> {
        if let Some(frame) = self.acquire_cached(res, pts) {
            return frame;
        }

        let was_reserved = self.shared.reserved.swap(true, Ordering::AcqRel);
        assert!(
            !was_reserved,
            "subtitle renderer already reserved: release the previous frame first"
        );
        let mut backend = self.shared.backend.lock();
        let bitmaps = backend.render(res, pts);
        SubFrame::reserved(&self.shared, pts, Arc::new(bitmaps), backend)
    }

    fn acquire_cached(&self, res: OsdRes, pts: f64) -> Option<SubFrame<'_>> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        if !state.threaded {
            return None;
        }
        if state.last_res != res {
            state.last_res = res;
            state.cache.flush();
            shared.wakeup.notify_all();
        }
        assert!(
            state.cur.is_none() && !shared.reserved.load(Ordering::Acquire),
            "subtitle frame acquired twice without release"
        );
        if res.is_degenerate() {
            return None;
        }

        let id = state.cache.lookup_and_prune(pts)?;
        state.cur = Some(id);
        loop {
            if let Some(bitmaps) = state.cache.data(id) {
                return Some(SubFrame::cached(shared, pts, bitmaps, id));
            }
            if !state.cache.is_queued(id) {
                break;
            }
            shared.wakeup.wait(&mut state);
        }

        // Flushed before the worker got to it.
        tracing::debug!(pts, "cached entry flushed while waiting, rendering synchronously");
        state.cur = None;
        state.cache.unref(id);
        None
    }

    /// Plain text of the subtitle visible at `pts`. `None` while subtitles are hidden.
    pub fn get_text(&self, pts: f64) -> Option<String> {
        if !self.shared.opts.visibility {
            return None;
        }
        self.shared.backend.lock().backend.get_text(pts)
    }

    /// Discard decoder state, queued packets and every pre-rendered frame (e.g. after a seek).
    pub fn reset(&self) {
        let mut state = self.shared.state.lock();
        self.shared.backend.lock().reset();
        state.last_pkt_pts = None;
        state.cache.flush();
        state.packets.clear();
        self.shared.wakeup.notify_all();
    }

    /// Tell the backend whether the stream is selected for display.
    pub fn select(&self, selected: bool) {
        self.shared.backend.lock().backend.select(selected);
    }

    /// Forward a control command to the backend.
    pub fn control(&self, cmd: SubCtrl) -> CtrlReply {
        self.shared.backend.lock().backend.control(cmd)
    }

    /// Record the parameters of the video under the subtitles. The backend only hears about
    /// actual changes.
    pub fn set_video_params(&self, params: VideoParams) {
        let mut state = self.shared.state.lock();
        if state.last_video_params != Some(params) {
            state.last_video_params = Some(params);
            self.shared
                .backend
                .lock()
                .backend
                .control(SubCtrl::SetVideoParams(params));
        }
    }

    /// Stop the worker and release the backend. Equivalent to dropping the coordinator.
    pub fn destroy(self) {
        drop(self);
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        let shared = &*self.shared;
        if let Some(handle) = self.worker.take() {
            {
                let mut state = shared.state.lock();
                state.threaded = false;
                shared.wakeup.notify_all();
            }
            if handle.join().is_err() {
                tracing::warn!("subtitle worker panicked");
            }
        }

        let mut state = shared.state.lock();
        state.cache.flush();
        state.packets.clear();
        debug_assert!(state.cur.is_none(), "coordinator destroyed with a frame outstanding");
        let mut backend = shared.backend.lock();
        backend.reset();
        backend.backend.uninit();
        tracing::debug!(backend = self.backend_name, "subtitle stream closed");
    }
}
