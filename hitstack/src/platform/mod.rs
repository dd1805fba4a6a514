//! Platform collaborators
//!
//! The tracker never talks to the unwinder or the dynamic loader directly.
//! It goes through the two traits below so tests can substitute fakes that
//! hand out synthetic addresses.
//!
//! - [`Unwinder`]: capture return addresses for the current call and describe
//!   a batch of addresses as native symbol strings
//! - [`ModuleLookup`]: find the module (executable or shared object) that
//!   owns an address and where it was loaded

pub mod loader;
pub mod unwind;

pub use loader::DlModuleLookup;
pub use unwind::BacktraceUnwinder;

use crate::domain::FramePointers;

/// The loaded module owning an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub path: String,
    pub base: u64,
}

pub trait Unwinder: Send + Sync {
    /// Capture return addresses of the calling thread, innermost first.
    ///
    /// The unwinder's own frames are never included. `skip` further frames
    /// belonging to the caller are dropped, and at most `max_frames` are kept.
    fn capture_stack(&self, skip: usize, max_frames: usize) -> FramePointers;

    /// Describe each address in the shape
    /// `"<module>(<symbol>+<offset>) [<address>]"`, one entry per address in
    /// the same order. `None` means nothing is known about that address.
    fn symbolize(&self, addrs: &[u64]) -> Vec<Option<String>>;
}

pub trait ModuleLookup: Send + Sync {
    fn lookup_module(&self, addr: u64) -> Option<ModuleInfo>;
}
