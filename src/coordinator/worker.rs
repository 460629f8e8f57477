use crate::coordinator::Shared;
use parking_lot::MutexGuard;

/// Render-ahead worker loop.
///
/// Pending packets always go first. Otherwise the earliest unrendered cache entry is rendered,
/// sharing the predecessor's storage when the backend reports no change since rendering it.
/// Sleeps on the shared condition variable when idle and exits once `threaded` is cleared.
pub(crate) fn run(shared: &Shared) {
    tracing::trace!("subtitle worker started");
    let mut state = shared.state.lock();
    while state.threaded {
        if !state.packets.is_empty() {
            let packets = std::mem::take(&mut state.packets);
            tracing::trace!(packets = packets.len(), "decoding queued packets");
            MutexGuard::unlocked(&mut state, || {
                let mut backend = shared.backend.lock();
                for packet in packets {
                    backend.backend.decode(packet);
                }
            });
            continue;
        }

        let res = state.last_res;
        let job = if res.is_degenerate() {
            None
        } else {
            state.cache.first_unrendered()
        };
        let Some((id, prev)) = job else {
            shared.wakeup.wait(&mut state);
            continue;
        };
        let Some(pts) = state.cache.pts(id) else {
            debug_assert!(false, "queued cache entry without pts");
            shared.wakeup.wait(&mut state);
            continue;
        };
        let prev_pts = prev.and_then(|p| state.cache.pts(p));

        state.cache.add_ref(id);
        if let Some(p) = prev {
            state.cache.add_ref(p);
        }

        let (bitmaps, follows_prev) = MutexGuard::unlocked(&mut state, || {
            let mut backend = shared.backend.lock();
            let follows_prev = prev_pts.is_some_and(|pp| backend.last_render == Some((pp, res)));
            (backend.render(res, pts), follows_prev)
        });
        tracing::trace!(pts, change_id = bitmaps.change_id, "rendered ahead");

        match prev {
            Some(p) if follows_prev && bitmaps.is_unchanged() => {
                state.cache.publish_shared(id, p);
            }
            _ => {
                state.cache.publish_owned(id, bitmaps);
                if let Some(p) = prev {
                    state.cache.unref(p);
                }
            }
        }
        state.cache.unref(id);
        shared.wakeup.notify_all();
    }
    tracing::trace!("subtitle worker stopped");
}
