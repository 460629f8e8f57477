use crate::render::bitmap::SubBitmaps;
use std::collections::VecDeque;
use std::sync::Arc;

/// Handle to an entry in the render cache arena.
///
/// Handles carry a generation so a handle to a freed (and possibly reused) slot never aliases a
/// newer entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct EntryId {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
enum EntryData {
    Pending,
    Owned(Arc<SubBitmaps>),
    // Holds one reference on the owner, dropped when this entry is freed.
    Shared(EntryId),
}

#[derive(Debug)]
struct CacheEntry {
    pts: f64,
    refcount: u32,
    rendered: bool,
    data: EntryData,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<CacheEntry>,
}

/// Counters describing render cache activity since creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently queued in the time-ordered array.
    pub queued: usize,
    /// Entries alive in the arena (queued, checked out, being rendered or shared from).
    pub live_entries: usize,
    /// Render-ahead requests that created an entry.
    pub requested: u64,
    /// Requests dropped because the array was full.
    pub dropped_full: u64,
    /// Requests dropped because their pts did not exceed the last queued pts.
    pub dropped_out_of_order: u64,
    /// Entries pruned because playback moved past them.
    pub pruned: u64,
    /// Entries removed by flushes (reset, geometry change, teardown).
    pub flushed: u64,
    /// Entries freed (refcount reached zero).
    pub entries_freed: u64,
    /// Bitmap lists copied into entry-owned storage.
    pub storage_allocs: u64,
    /// Entry-owned bitmap storages released.
    pub storage_frees: u64,
    /// Renders that reused the predecessor's storage instead of allocating.
    pub shared_renders: u64,
}

impl CacheStats {
    /// Renders published into the cache, owned or shared.
    pub fn published(&self) -> u64 {
        self.storage_allocs + self.shared_renders
    }
}

/// Bounded, pts-ordered cache of pre-rendered subtitle frames.
///
/// Entries live in a generational arena with explicit refcounts. The queued array holds one
/// reference per entry; checked-out frames, in-flight renders and storage sharing hold more.
/// An entry is freed exactly when its refcount reaches zero. All methods expect the caller to
/// hold the coordinator's state lock.
#[derive(Debug)]
pub(crate) struct RenderCache {
    capacity: usize,
    order: VecDeque<EntryId>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    stats: CacheStats,
}

impl RenderCache {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            stats: CacheStats::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn live_entries(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            queued: self.order.len(),
            live_entries: self.live_entries(),
            ..self.stats
        }
    }

    #[cfg(test)]
    pub(crate) fn queued_pts(&self) -> Vec<f64> {
        self.order.iter().filter_map(|&id| self.pts(id)).collect()
    }

    /// Queue a render-ahead slot for `pts`.
    ///
    /// Accepted only while the array has room and `pts` is strictly greater than the last queued
    /// pts, which keeps the array sorted without searching. Anything else is dropped.
    pub(crate) fn request(&mut self, pts: f64) -> Option<EntryId> {
        if self.order.len() >= self.capacity {
            self.stats.dropped_full += 1;
            tracing::debug!(pts, capacity = self.capacity, "render cache full, dropping request");
            return None;
        }
        if let Some(&last) = self.order.back()
            && !self.pts(last).is_some_and(|last_pts| pts > last_pts)
        {
            self.stats.dropped_out_of_order += 1;
            tracing::trace!(pts, "render-ahead request not after last queued pts, dropping");
            return None;
        }

        let id = self.alloc(CacheEntry {
            pts,
            refcount: 1,
            rendered: false,
            data: EntryData::Pending,
        });
        self.order.push_back(id);
        self.stats.requested += 1;
        Some(id)
    }

    /// Drop every queued entry older than `pts`, then check out the entry for exactly `pts`.
    ///
    /// The returned entry carries an extra reference owned by the caller. Pruning happens even
    /// when there is no exact match.
    pub(crate) fn lookup_and_prune(&mut self, pts: f64) -> Option<EntryId> {
        while let Some(&front) = self.order.front() {
            let Some(front_pts) = self.pts(front) else {
                debug_assert!(false, "queued cache entry without arena slot");
                self.order.pop_front();
                continue;
            };
            if front_pts < pts {
                self.order.pop_front();
                self.unref(front);
                self.stats.pruned += 1;
                tracing::trace!(pruned = front_pts, at = pts, "pruned stale render-ahead entry");
                continue;
            }
            if front_pts == pts {
                self.add_ref(front);
                return Some(front);
            }
            break;
        }
        None
    }

    /// First queued entry that still needs rendering, plus its predecessor when that one is
    /// already rendered (a candidate for storage sharing).
    pub(crate) fn first_unrendered(&self) -> Option<(EntryId, Option<EntryId>)> {
        let n = self
            .order
            .iter()
            .position(|&id| self.get(id).is_some_and(|e| !e.rendered))?;
        let prev = n
            .checked_sub(1)
            .map(|i| self.order[i])
            .filter(|&p| self.is_rendered(p));
        Some((self.order[n], prev))
    }

    pub(crate) fn add_ref(&mut self, id: EntryId) {
        match self.get_mut(id) {
            Some(entry) => entry.refcount += 1,
            None => debug_assert!(false, "add_ref on freed cache entry"),
        }
    }

    /// Drop one reference. Frees the entry at zero, which in turn drops the reference it holds
    /// on a storage owner.
    pub(crate) fn unref(&mut self, id: EntryId) {
        let mut next = Some(id);
        while let Some(id) = next.take() {
            let Some(entry) = self.get_mut(id) else {
                debug_assert!(false, "unref on freed cache entry");
                return;
            };
            debug_assert!(entry.refcount > 0, "live cache entry with zero refcount");
            entry.refcount = entry.refcount.saturating_sub(1);
            if entry.refcount > 0 {
                return;
            }

            let Some(entry) = self.release_slot(id) else {
                return;
            };
            self.stats.entries_freed += 1;
            match entry.data {
                EntryData::Owned(bitmaps) => {
                    drop(bitmaps);
                    self.stats.storage_frees += 1;
                }
                EntryData::Shared(owner) => next = Some(owner),
                EntryData::Pending => {}
            }
        }
    }

    /// Publish a render result copied into storage owned by `id`.
    pub(crate) fn publish_owned(&mut self, id: EntryId, bitmaps: SubBitmaps) {
        let Some(entry) = self.get_mut(id) else {
            debug_assert!(false, "publish on freed cache entry");
            return;
        };
        debug_assert!(!entry.rendered, "cache entry rendered twice");
        entry.data = EntryData::Owned(Arc::new(bitmaps));
        entry.rendered = true;
        self.stats.storage_allocs += 1;
    }

    /// Publish `id` as showing exactly what `owner` shows.
    ///
    /// Takes over one reference the caller holds on `owner`; it is dropped when `id` is freed.
    pub(crate) fn publish_shared(&mut self, id: EntryId, owner: EntryId) {
        debug_assert!(self.is_rendered(owner), "sharing storage of an unrendered entry");
        let Some(entry) = self.get_mut(id) else {
            debug_assert!(false, "publish on freed cache entry");
            return;
        };
        debug_assert!(!entry.rendered, "cache entry rendered twice");
        entry.data = EntryData::Shared(owner);
        entry.rendered = true;
        self.stats.shared_renders += 1;
    }

    pub(crate) fn pts(&self, id: EntryId) -> Option<f64> {
        self.get(id).map(|e| e.pts)
    }

    #[cfg(test)]
    pub(crate) fn refcount(&self, id: EntryId) -> Option<u32> {
        self.get(id).map(|e| e.refcount)
    }

    pub(crate) fn is_rendered(&self, id: EntryId) -> bool {
        self.get(id).is_some_and(|e| e.rendered)
    }

    pub(crate) fn is_queued(&self, id: EntryId) -> bool {
        self.order.contains(&id)
    }

    /// Entry owning the storage `id` displays. Follows sharing links transitively.
    pub(crate) fn storage_owner(&self, id: EntryId) -> Option<EntryId> {
        let mut cur = id;
        loop {
            match &self.get(cur)?.data {
                EntryData::Pending => return None,
                EntryData::Owned(_) => return Some(cur),
                EntryData::Shared(owner) => cur = *owner,
            }
        }
    }

    /// Rendered bitmaps of `id`. `None` until the entry is rendered.
    pub(crate) fn data(&self, id: EntryId) -> Option<Arc<SubBitmaps>> {
        let owner = self.storage_owner(id)?;
        match &self.get(owner)?.data {
            EntryData::Owned(bitmaps) => Some(Arc::clone(bitmaps)),
            _ => None,
        }
    }

    /// Remove every queued entry, dropping the array's reference on each.
    pub(crate) fn flush(&mut self) {
        let order = std::mem::take(&mut self.order);
        if !order.is_empty() {
            tracing::debug!(entries = order.len(), "flushing render cache");
        }
        for id in order {
            self.stats.flushed += 1;
            self.unref(id);
        }
    }

    fn get(&self, id: EntryId) -> Option<&CacheEntry> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entry.as_ref())
    }

    fn get_mut(&mut self, id: EntryId) -> Option<&mut CacheEntry> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entry.as_mut())
    }

    fn alloc(&mut self, entry: CacheEntry) -> EntryId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return EntryId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        EntryId {
            index,
            generation: 0,
        }
    }

    fn release_slot(&mut self, id: EntryId) -> Option<CacheEntry> {
        let slot = self.slots.get_mut(id.index as usize)?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(entry)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cache.rs"]
mod tests;
