use crate::coordinator::{BackendSlot, Shared};
use crate::render::bitmap::SubBitmaps;
use crate::render::cache::EntryId;
use parking_lot::MutexGuard;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::Ordering;

enum Hold<'a> {
    // Checked-out cache entry; one reference is owned by this frame.
    Cached(EntryId),
    // Synchronous render; the backend stays locked until release.
    Reserved(MutexGuard<'a, BackendSlot>),
}

/// A subtitle frame checked out by [`Coordinator::acquire`](crate::Coordinator::acquire).
///
/// Dereferences to the rendered [`SubBitmaps`]. The frame must be released before the next
/// acquire: call [`SubFrame::release`] or drop it.
///
/// A cached frame sharing its predecessor's storage also shares its `change_id`, so comparing
/// ids of consecutive frames tells whether the content changed.
pub struct SubFrame<'a> {
    shared: &'a Shared,
    pts: f64,
    bitmaps: Arc<SubBitmaps>,
    hold: Option<Hold<'a>>,
}

impl<'a> SubFrame<'a> {
    pub(crate) fn cached(
        shared: &'a Shared,
        pts: f64,
        bitmaps: Arc<SubBitmaps>,
        id: EntryId,
    ) -> Self {
        Self {
            shared,
            pts,
            bitmaps,
            hold: Some(Hold::Cached(id)),
        }
    }

    pub(crate) fn reserved(
        shared: &'a Shared,
        pts: f64,
        bitmaps: Arc<SubBitmaps>,
        backend: MutexGuard<'a, BackendSlot>,
    ) -> Self {
        Self {
            shared,
            pts,
            bitmaps,
            hold: Some(Hold::Reserved(backend)),
        }
    }

    /// Presentation time this frame was rendered for.
    pub fn pts(&self) -> f64 {
        self.pts
    }

    /// Rendered bitmaps.
    pub fn bitmaps(&self) -> &SubBitmaps {
        &self.bitmaps
    }

    /// `true` when the frame was pre-rendered by the worker rather than rendered on demand.
    pub fn is_cached(&self) -> bool {
        matches!(self.hold, Some(Hold::Cached(_)))
    }

    /// Return the frame to the coordinator.
    pub fn release(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        match self.hold.take() {
            Some(Hold::Cached(id)) => {
                let mut state = self.shared.state.lock();
                debug_assert_eq!(state.cur, Some(id), "released frame is not the current one");
                state.cur = None;
                state.cache.unref(id);
            }
            Some(Hold::Reserved(backend)) => {
                let was_reserved = self.shared.reserved.swap(false, Ordering::AcqRel);
                debug_assert!(was_reserved, "reserved frame without reservation");
                drop(backend);
            }
            None => {}
        }
    }
}

impl Deref for SubFrame<'_> {
    type Target = SubBitmaps;

    fn deref(&self) -> &SubBitmaps {
        &self.bitmaps
    }
}

impl Drop for SubFrame<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

impl std::fmt::Debug for SubFrame<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubFrame")
            .field("pts", &self.pts)
            .field("cached", &self.is_cached())
            .field("parts", &self.bitmaps.parts.len())
            .field("change_id", &self.bitmaps.change_id)
            .finish()
    }
}
