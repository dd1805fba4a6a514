//! Domain model for hitstack
//!
//! This module contains core domain types and errors that provide:
//! - Compile-time safety via newtype pattern
//! - Self-documenting function signatures
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{ChannelId, FramePointers, StackStat, CHANNEL_COUNT};

pub use errors::{CaptureError, ConfigError, LineParseError, LineToolError, ReportError};
