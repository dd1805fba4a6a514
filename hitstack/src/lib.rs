//! # hitstack - In-Process Call-Stack Hit Counter
//!
//! hitstack answers "who keeps calling this?". Instrumented code calls
//! [`record`] at an interesting location; hitstack captures the current call
//! stack, folds identical stacks together and counts how often (and with how
//! much weight) each one was seen. A later [`dump`] turns the collected
//! stacks into symbolized report rows, ranked by hit count.
//!
//! It is not a sampling profiler: only explicit call sites are recorded.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Instrumented Code                         │
//! │     record(ch) / record_with_score / get_backtrace           │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │ return addresses
//!                             ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  tracking: 256 channels, stack -> {count, score}             │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │ dump(ch)
//!                             ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  symbolization: FrameCache                                   │
//! │    native stage   unwinder symbols + dladdr + demangling     │
//! │    line stage     addr2line tool or in-process DWARF         │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │ Vec<StackFrames>
//!                             ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  report: text or JSON                                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`tracking`]: channels, stack deduplication and the process-wide
//!   [`Registry`]
//! - [`symbolization`]: address to frame resolution and the frame cache
//! - [`report`]: text and JSON rendering
//! - [`platform`]: stack unwinding and dynamic loader lookups
//! - [`config`]: defaults and `HITSTACK_*` environment overrides
//! - [`domain`]: core types (`ChannelId`, `FramePointers`, `StackStat`) and
//!   errors
//! - [`cli`]: arguments of the demo binary
//!
//! ## Example
//!
//! ```rust,no_run
//! fn handle_request() {
//!     hitstack::record(0u8);
//! }
//!
//! for _ in 0..10 {
//!     handle_request();
//! }
//! let rows = hitstack::dump(0u8);
//! println!("{}", hitstack::stack_frames_to_string(&rows, false));
//! ```
//!
//! ## Deferred Attribution
//!
//! Work that is prepared in one place and executed in another can be charged
//! to the preparing stack:
//!
//! ```rust,no_run
//! let origin = hitstack::get_backtrace();
//! // ... later, somewhere else ...
//! if let Some(stack) = &origin {
//!     hitstack::record_stack(1u8, stack, 250);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod platform;
pub mod report;
pub mod symbolization;
pub mod tracking;

pub use config::{Config, LineBackend};
pub use domain::{ChannelId, FramePointers, StackStat, CHANNEL_COUNT};
pub use report::{stack_frames_to_json, stack_frames_to_string, write_json, StackFrames};
pub use symbolization::Frame;
pub use tracking::{
    dump, get_backtrace, install, record, record_stack, record_with_score, registry, Registry,
};
