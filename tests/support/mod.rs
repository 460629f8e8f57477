#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use subrender::{
    BitmapFormat, CtrlReply, OsdRes, SubBackend, SubBitmap, SubBitmaps, SubCodec, SubCtrl,
    SubError, SubPacket, SubResult,
};

pub const CODEC: &str = "mock";

/// Everything the mock backend was asked to do, in call order.
#[derive(Debug, Default)]
pub struct MockLog {
    pub decoded: Vec<Option<f64>>,
    pub renders: Vec<f64>,
    pub selects: Vec<bool>,
    pub controls: Vec<SubCtrl>,
    pub resets: usize,
    pub uninits: usize,
}

pub type SharedLog = Arc<Mutex<MockLog>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangePolicy {
    /// Unchanged when nothing was decoded and the geometry stayed the same since the last render.
    ContentBased,
    /// Every render reports a change.
    Always,
}

/// Scriptable backend that records its calls.
pub struct MockBackend {
    log: SharedLog,
    policy: ChangePolicy,
    // `Some(limit)`: backpressured backend that holds at most `limit` undecoded packets.
    backpressure: Option<usize>,
    held: usize,
    render_delay: Option<std::time::Duration>,
    last: Option<(usize, OsdRes)>,
    change_counter: u64,
}

impl MockBackend {
    pub fn push() -> (Self, SharedLog) {
        let log = SharedLog::default();
        (
            Self {
                log: Arc::clone(&log),
                policy: ChangePolicy::ContentBased,
                backpressure: None,
                held: 0,
                render_delay: None,
                last: None,
                change_counter: 0,
            },
            log,
        )
    }

    pub fn pull(limit: usize) -> (Self, SharedLog) {
        let (mut backend, log) = Self::push();
        backend.backpressure = Some(limit);
        (backend, log)
    }

    pub fn with_policy(mut self, policy: ChangePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_render_delay(mut self, delay: std::time::Duration) -> Self {
        self.render_delay = Some(delay);
        self
    }

    pub fn boxed(self) -> Vec<Box<dyn SubBackend>> {
        vec![Box::new(self)]
    }
}

impl SubBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn init(&mut self, codec: &SubCodec) -> SubResult<()> {
        if codec.name == CODEC {
            Ok(())
        } else {
            Err(SubError::backend("mock only handles the mock codec"))
        }
    }

    fn decode(&mut self, packet: SubPacket) {
        self.log.lock().decoded.push(packet.pts);
        self.held += 1;
    }

    fn get_bitmaps(&mut self, res: OsdRes, pts: f64) -> SubBitmaps {
        if let Some(delay) = self.render_delay {
            std::thread::sleep(delay);
        }
        let content = self.log.lock().decoded.len();
        self.log.lock().renders.push(pts);
        self.held = 0;

        let unchanged =
            self.policy == ChangePolicy::ContentBased && self.last == Some((content, res));
        self.last = Some((content, res));
        let change_id = if unchanged {
            0
        } else {
            self.change_counter += 1;
            self.change_counter
        };

        let tag = (content % 256) as u8;
        SubBitmaps {
            format: BitmapFormat::Alpha8,
            parts: vec![SubBitmap::alpha(0, 0, 1, 1, [255, 255, 255, 255], vec![tag]).unwrap()],
            change_id,
        }
    }

    fn get_text(&mut self, _pts: f64) -> Option<String> {
        Some(format!("{} packets", self.log.lock().decoded.len()))
    }

    fn accepts_packet(&self) -> Option<bool> {
        self.backpressure.map(|limit| self.held < limit)
    }

    fn reset(&mut self) {
        self.log.lock().resets += 1;
        self.held = 0;
        self.last = None;
    }

    fn select(&mut self, selected: bool) {
        self.log.lock().selects.push(selected);
    }

    fn control(&mut self, cmd: SubCtrl) -> CtrlReply {
        self.log.lock().controls.push(cmd);
        match cmd {
            SubCtrl::SubStep { .. } => CtrlReply::StepDelta(1.0),
            SubCtrl::SetVideoDefFps(_) => CtrlReply::Unknown,
            _ => CtrlReply::Done,
        }
    }

    fn uninit(&mut self) {
        self.log.lock().uninits += 1;
    }
}

pub fn packets(pts: &[f64]) -> Vec<SubPacket> {
    pts.iter()
        .map(|&p| SubPacket::new(Some(p), None, vec![1]))
        .collect()
}

pub fn res() -> OsdRes {
    OsdRes::new(640, 360)
}

/// Wait until the worker has published `n` renders. Sharing needs the predecessor still queued,
/// so tests inspecting sharing let the worker finish before the consumer prunes anything.
pub fn wait_published(coord: &subrender::Coordinator, n: u64) {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
    while coord.cache_stats().published() < n {
        assert!(
            std::time::Instant::now() < deadline,
            "worker published {} of {n} frames",
            coord.cache_stats().published()
        );
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
}
