//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep channel ids, captured stacks and per-stack
//! statistics from being confused with plain integers and vectors.

use std::fmt;
use std::ops::Deref;

/// Number of independent tracking channels.
pub const CHANNEL_COUNT: usize = 256;

/// Channel ID
///
/// Identifies one of the 256 independent tracking slots. Channels never
/// share stacks or statistics with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ChannelId(pub u8);

impl ChannelId {
    /// Index into the registry's channel table
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel#{}", self.0)
    }
}

impl From<u8> for ChannelId {
    fn from(id: u8) -> Self {
        ChannelId(id)
    }
}

/// An ordered list of raw return addresses for one captured call stack.
///
/// The innermost caller comes first. Order is the identity of a stack:
/// equality and ordering are elementwise, so the type doubles as the
/// deduplication key of the stack store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FramePointers(Vec<u64>);

impl FramePointers {
    #[must_use]
    pub fn new(addrs: Vec<u64>) -> Self {
        Self(addrs)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u64> {
        self.0
    }
}

impl Deref for FramePointers {
    type Target = [u64];

    fn deref(&self) -> &[u64] {
        &self.0
    }
}

impl From<Vec<u64>> for FramePointers {
    fn from(addrs: Vec<u64>) -> Self {
        Self(addrs)
    }
}

impl FromIterator<u64> for FramePointers {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Accumulated statistics for one distinct stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackStat {
    /// Number of hits, one per record call
    pub count: u64,
    /// Sum of the caller-supplied weights; may be negative
    pub score: i64,
}

impl StackStat {
    /// Account for one more hit with the given weight
    pub fn add(&mut self, score: i64) {
        self.count += 1;
        self.score = self.score.saturating_add(score);
    }
}
