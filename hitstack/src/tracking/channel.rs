//! Per-channel stack store
//!
//! Each channel maps a captured stack to its accumulated [`StackStat`]. The
//! same call path always produces the same return addresses, so a hot
//! location costs one map entry no matter how often it is hit.

use crate::domain::{CaptureError, ChannelId, FramePointers, StackStat};
use crate::platform::Unwinder;
use crate::report::StackFrames;
use crate::symbolization::{Frame, FrameCache};
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Tracker frames between the unwinder and the code being recorded: the
/// capturing function itself and the public entry point that called it.
pub const SKIP_FRAMES: usize = 2;

pub struct ChannelTracker {
    id: ChannelId,
    stacks: Mutex<BTreeMap<FramePointers, StackStat>>,
}

impl ChannelTracker {
    #[must_use]
    pub fn new(id: ChannelId) -> Self {
        Self { id, stacks: Mutex::new(BTreeMap::new()) }
    }

    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<FramePointers, StackStat>> {
        self.stacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Capture the stack of whoever called the entry point calling this, and
    /// count one hit for it.
    ///
    /// Must be called directly from a public entry point so that
    /// [`SKIP_FRAMES`] lands on the caller's frame.
    ///
    /// # Errors
    /// Returns an error if the unwinder found nothing above the tracker
    #[inline(never)]
    pub fn record(
        &self,
        unwinder: &dyn Unwinder,
        max_frames: usize,
        score: i64,
    ) -> Result<(), CaptureError> {
        let stack = unwinder.capture_stack(SKIP_FRAMES, max_frames);
        if stack.is_empty() {
            return Err(CaptureError::TooFewFrames { captured: 0, skipped: SKIP_FRAMES });
        }
        self.record_stack(stack, score);
        Ok(())
    }

    /// Count one hit for an already captured stack
    pub fn record_stack(&self, stack: FramePointers, score: i64) {
        self.lock().entry(stack).or_default().add(score);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot the channel as resolved report rows, most hit first.
    ///
    /// Ties are broken by stack order so the output is deterministic. The
    /// channel stays locked until every frame is resolved.
    pub fn dump(&self, cache: &FrameCache, unwinder: &dyn Unwinder) -> Vec<StackFrames> {
        let stacks = self.lock();

        let mut rows: Vec<(&FramePointers, &StackStat)> = stacks.iter().collect();
        rows.sort_by(|(a_key, a), (b_key, b)| b.count.cmp(&a.count).then_with(|| a_key.cmp(b_key)));

        let mut seen = HashSet::new();
        let addrs: Vec<u64> = rows
            .iter()
            .flat_map(|(key, _)| key.iter().copied())
            .filter(|addr| seen.insert(*addr))
            .collect();
        debug!("{}: dumping {} stacks, {} distinct addresses", self.id, rows.len(), addrs.len());

        let resolved: HashMap<u64, Arc<Frame>> =
            addrs.iter().copied().zip(cache.resolve(&addrs, unwinder)).collect();

        rows.into_iter()
            .map(|(key, stat)| StackFrames {
                frames: key
                    .iter()
                    .map(|addr| {
                        resolved
                            .get(addr)
                            .cloned()
                            .unwrap_or_else(|| Arc::new(Frame::unresolved(*addr)))
                    })
                    .collect(),
                count: stat.count,
                score: stat.score,
            })
            .collect()
    }
}

/// Capture the stack above a public entry point without recording it.
///
/// Same frame accounting as [`ChannelTracker::record`].
///
/// # Errors
/// Returns an error if the unwinder found nothing above the tracker
#[inline(never)]
pub fn capture_backtrace(
    unwinder: &dyn Unwinder,
    max_frames: usize,
) -> Result<FramePointers, CaptureError> {
    let stack = unwinder.capture_stack(SKIP_FRAMES, max_frames);
    if stack.is_empty() {
        return Err(CaptureError::TooFewFrames { captured: 0, skipped: SKIP_FRAMES });
    }
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ModuleInfo, ModuleLookup};
    use crate::symbolization::{DisabledLineSource, LineResolver};

    /// Hands out scripted stacks and records the skip it was asked for
    #[derive(Default)]
    struct ScriptedUnwinder {
        next: Mutex<Vec<FramePointers>>,
        skips: Mutex<Vec<usize>>,
    }

    impl ScriptedUnwinder {
        fn push(&self, addrs: &[u64]) {
            self.next.lock().unwrap().push(FramePointers::from(addrs.to_vec()));
        }
    }

    impl Unwinder for ScriptedUnwinder {
        fn capture_stack(&self, skip: usize, max_frames: usize) -> FramePointers {
            self.skips.lock().unwrap().push(skip);
            let stack = self.next.lock().unwrap().pop().unwrap_or_default();
            stack.iter().copied().take(max_frames).collect()
        }

        fn symbolize(&self, addrs: &[u64]) -> Vec<Option<String>> {
            addrs.iter().map(|addr| Some(format!("app(f{addr:x}+0x1) [0x{addr:x}]"))).collect()
        }
    }

    struct NoModules;

    impl ModuleLookup for NoModules {
        fn lookup_module(&self, _addr: u64) -> Option<ModuleInfo> {
            None
        }
    }

    fn cache() -> FrameCache {
        let lines = LineResolver::new(Box::new(DisabledLineSource), 100, true);
        FrameCache::new(Box::new(NoModules), lines)
    }

    #[test]
    fn test_identical_stacks_share_an_entry() {
        let tracker = ChannelTracker::new(ChannelId(0));
        let unwinder = ScriptedUnwinder::default();
        for _ in 0..5 {
            unwinder.push(&[0x10, 0x20]);
        }
        unwinder.push(&[0x30]);

        for _ in 0..6 {
            tracker.record(&unwinder, 256, 1).unwrap();
        }

        assert_eq!(tracker.len(), 2);
        assert!(unwinder.skips.lock().unwrap().iter().all(|&skip| skip == SKIP_FRAMES));
    }

    #[test]
    fn test_empty_capture_is_rejected() {
        let tracker = ChannelTracker::new(ChannelId(3));
        let unwinder = ScriptedUnwinder::default();
        let err = tracker.record(&unwinder, 256, 1).unwrap_err();
        assert_eq!(err, CaptureError::TooFewFrames { captured: 0, skipped: 2 });
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_max_frames_is_passed_through() {
        let tracker = ChannelTracker::new(ChannelId(0));
        let unwinder = ScriptedUnwinder::default();
        unwinder.push(&[1, 2, 3, 4]);
        tracker.record(&unwinder, 2, 1).unwrap();

        let rows = tracker.dump(&cache(), &unwinder);
        assert_eq!(rows[0].frames.len(), 2);
    }

    #[test]
    fn test_dump_sorts_by_count_then_stack() {
        let tracker = ChannelTracker::new(ChannelId(0));
        tracker.record_stack(FramePointers::from(vec![0x30]), 1);
        for _ in 0..3 {
            tracker.record_stack(FramePointers::from(vec![0x20, 0x10]), 2);
        }
        tracker.record_stack(FramePointers::from(vec![0x05]), -4);

        let rows = tracker.dump(&cache(), &ScriptedUnwinder::default());
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].count, rows[0].score), (3, 6));
        assert_eq!(rows[0].frames[0].addr, 0x20);
        assert_eq!(rows[0].frames[1].addr, 0x10);
        // Equal counts: lower stack key first
        assert_eq!(rows[1].frames[0].addr, 0x05);
        assert_eq!(rows[1].score, -4);
        assert_eq!(rows[2].frames[0].addr, 0x30);
    }

    #[test]
    fn test_dump_shares_frames_between_rows() {
        let tracker = ChannelTracker::new(ChannelId(0));
        tracker.record_stack(FramePointers::from(vec![0x10, 0x99]), 1);
        tracker.record_stack(FramePointers::from(vec![0x20, 0x99]), 1);

        let cache = cache();
        let rows = tracker.dump(&cache, &ScriptedUnwinder::default());
        assert!(Arc::ptr_eq(&rows[0].frames[1], &rows[1].frames[1]));
        assert_eq!(cache.len(), 3);
        assert_eq!(rows[0].frames[1].function, "f99");
    }

    #[test]
    fn test_dump_of_empty_channel() {
        let tracker = ChannelTracker::new(ChannelId(9));
        assert!(tracker.dump(&cache(), &ScriptedUnwinder::default()).is_empty());
    }

    #[test]
    fn test_capture_backtrace_skips_tracker_frames() {
        let unwinder = ScriptedUnwinder::default();
        unwinder.push(&[0xaa]);
        let stack = capture_backtrace(&unwinder, 256).unwrap();
        assert_eq!(stack.as_slice(), &[0xaa]);
        assert_eq!(unwinder.skips.lock().unwrap().as_slice(), &[SKIP_FRAMES]);
        assert!(capture_backtrace(&unwinder, 256).is_err());
    }
}
