//! Process-wide address -> [`Frame`] cache
//!
//! Shared by every channel. Entries are only ever added: a frame is built
//! completely (native symbol, then source lines) before it is published, and
//! published frames are handed out as `Arc<Frame>` and never touched again.
//!
//! ```text
//! resolve([a, b, c, b])
//!   hits:   a                  -> Arc clone
//!   misses: b, c               -> Unwinder::symbolize([b, c])
//!                              -> native::resolve_symbol per address
//!                              -> LineResolver::resolve([b, c])
//!                              -> publish
//! ```
//!
//! The lock is held across the whole populate step, so two dumps racing on
//! the same cold address resolve it once.

use super::frame::Frame;
use super::line_resolver::LineResolver;
use super::native::resolve_symbol;
use crate::platform::{ModuleLookup, Unwinder};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct FrameCache {
    frames: Mutex<HashMap<u64, Arc<Frame>>>,
    loader: Box<dyn ModuleLookup>,
    lines: LineResolver,
}

impl FrameCache {
    #[must_use]
    pub fn new(loader: Box<dyn ModuleLookup>, lines: LineResolver) -> Self {
        Self { frames: Mutex::new(HashMap::new()), loader, lines }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Arc<Frame>>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve `addrs`, one frame per input address in the same order.
    ///
    /// Addresses not seen before are symbolized in a single batch.
    pub fn resolve(&self, addrs: &[u64], unwinder: &dyn Unwinder) -> Vec<Arc<Frame>> {
        let mut frames = self.lock();

        let mut seen = HashSet::new();
        let misses: Vec<u64> = addrs
            .iter()
            .copied()
            .filter(|addr| !frames.contains_key(addr) && seen.insert(*addr))
            .collect();

        if !misses.is_empty() {
            debug!("Frame cache: {} hits, {} misses", addrs.len() - misses.len(), misses.len());

            let symbols = unwinder.symbolize(&misses);
            let mut fresh: Vec<Frame> = misses
                .iter()
                .enumerate()
                .map(|(i, &addr)| {
                    let symbol = symbols.get(i).and_then(Option::as_deref);
                    let module = self.loader.lookup_module(addr);
                    resolve_symbol(addr, symbol, module.as_ref())
                })
                .collect();

            self.lines.resolve(&mut fresh);

            for frame in fresh {
                frames.insert(frame.addr, Arc::new(frame));
            }
        }

        addrs
            .iter()
            .map(|addr| {
                frames.get(addr).cloned().unwrap_or_else(|| Arc::new(Frame::unresolved(*addr)))
            })
            .collect()
    }

    #[must_use]
    pub fn get(&self, addr: u64) -> Option<Arc<Frame>> {
        self.lock().get(&addr).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
