//! Stack capture with the `backtrace` crate
//!
//! Capture is the hot path: it walks the stack and copies instruction
//! pointers, nothing else. Symbol names are only looked up later, in batch,
//! when a dump asks for them.

use super::loader::dladdr;
use super::Unwinder;
use crate::domain::FramePointers;

/// Unwinder for the current process
#[derive(Debug, Default, Clone, Copy)]
pub struct BacktraceUnwinder;

impl Unwinder for BacktraceUnwinder {
    #[inline(never)]
    fn capture_stack(&self, skip: usize, max_frames: usize) -> FramePointers {
        // One extra frame for this method itself. black_box keeps the call
        // out of tail position so that frame really exists.
        std::hint::black_box(trace_return_addresses(skip + 1, max_frames))
    }

    fn symbolize(&self, addrs: &[u64]) -> Vec<Option<String>> {
        addrs.iter().map(|&addr| describe_address(addr)).collect()
    }
}

/// Walk the calling thread's stack.
///
/// Frames up to and including this function are discarded by matching each
/// frame's enclosing symbol against our own address, so the internals of the
/// `backtrace` crate never leak into recorded stacks. If the unwinder cannot
/// report symbol addresses the anchor is never seen and only `skip` is applied.
#[inline(never)]
fn trace_return_addresses(skip: usize, max_frames: usize) -> FramePointers {
    let anchor = trace_return_addresses as usize;
    let mut all = Vec::with_capacity(32);
    let mut after_anchor: Option<usize> = None;

    backtrace::trace(|frame| {
        let ip = frame.ip() as usize;
        if ip != 0 {
            if after_anchor.is_none() && frame.symbol_address() as usize == anchor {
                after_anchor = Some(all.len() + 1);
            }
            all.push(ip as u64);
        }
        // Leave room for the frames we are going to drop
        all.len() < max_frames + skip + 16
    });

    let start = after_anchor.unwrap_or(0) + skip;
    all.into_iter().skip(start).take(max_frames).collect()
}

/// Build the glibc `backtrace_symbols` shape from `dladdr`
fn describe_address(addr: u64) -> Option<String> {
    let info = dladdr(addr)?;
    let path = info.path.unwrap_or_default();
    let line = match info.symbol {
        Some(symbol) if info.symbol_addr != 0 && info.symbol_addr <= addr => {
            format!("{path}({symbol}+0x{:x}) [0x{addr:x}]", addr - info.symbol_addr)
        }
        _ if info.base != 0 && info.base <= addr => {
            format!("{path}(+0x{:x}) [0x{addr:x}]", addr - info.base)
        }
        _ => format!("{path}() [0x{addr:x}]"),
    };
    Some(line)
}
