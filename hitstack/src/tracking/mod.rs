//! Hit recording
//!
//! - **`channel`**: per-channel stack store, capture and sorted dumps
//! - **`registry`**: the handle owning all channels, and the process-wide
//!   default behind the crate's free functions

pub mod channel;
pub mod registry;

pub use channel::{ChannelTracker, SKIP_FRAMES};
pub use registry::{
    dump, get_backtrace, install, record, record_stack, record_with_score, registry, Registry,
};
