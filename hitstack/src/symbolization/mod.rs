//! # Symbol Resolution
//!
//! Turns raw return addresses into [`Frame`]s: function name, module, source
//! file and line, plus the chain of call sites an inlined location was
//! expanded into.
//!
//! ## Two Stages
//!
//! ```text
//! 0x55d0c0a01a2b
//!   │
//!   ├─ native stage (cheap, in-process)
//!   │    Unwinder::symbolize  -> "./app(_ZN3app4work17h..E+0x1b) [0x55d0c0a01a2b]"
//!   │    ModuleLookup         -> module "./app", base 0x55d0c0a00000
//!   │    demangle             -> function "app::work"
//!   │
//!   └─ line stage (expensive, batched per module)
//!        LineSource::lookup   -> "work at src/app.rs:42"
//!                                " (inlined by) main at src/main.rs:7"
//! ```
//!
//! The native stage only knows exported names. The line stage reads debug
//! info, either through the external `addr2line` tool ([`Addr2lineTool`]) or
//! in-process with the `addr2line`/`gimli`/`object` crates
//! ([`DwarfLineSource`]). Both are looked up with the address relative to the
//! module base:
//!
//! ```text
//! offset = address - module_base        (ASLR / PIE adjustment)
//! ```
//!
//! Frames whose module base is unknown skip the line stage.
//!
//! ## Caching
//!
//! [`FrameCache`] runs both stages once per address for the whole process.
//! Cached frames are immutable and shared as `Arc<Frame>`.
//!
//! ## Module Structure
//!
//! - **`frame`**: the resolved [`Frame`] and its placeholder values
//! - **`native`**: parsing of native symbol strings
//! - **`demangle`**: Rust and C++ demangling
//! - **`line_resolver`**: batching and the [`LineSource`] seam
//! - **`line_parser`**: `addr2line -p` output parsing
//! - **`addr2line_tool`**: the subprocess backend
//! - **`dwarf`**: the in-process backend
//! - **`frame_cache`**: the shared cache

pub mod addr2line_tool;
pub mod demangle;
pub mod dwarf;
pub mod frame;
pub mod frame_cache;
pub mod line_parser;
pub mod line_resolver;
pub mod native;

pub use addr2line_tool::Addr2lineTool;
pub use dwarf::DwarfLineSource;
pub use frame::{Frame, InlinedCall};
pub use frame_cache::FrameCache;
pub use line_resolver::{DisabledLineSource, LineQuery, LineResolver, LineSource};
