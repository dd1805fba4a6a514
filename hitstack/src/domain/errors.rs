//! Structured error types for hitstack
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! None of these reach `record`/`dump` callers; they are logged and the
//! affected data degrades to placeholder values.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Unwinder returned {captured} frames, need more than {skipped} to find a caller")]
    TooFewFrames { captured: usize, skipped: usize },
}

#[derive(Error, Debug)]
pub enum LineToolError {
    #[error("Line resolution backend {0} is not available")]
    Unavailable(&'static str),

    #[error("Failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with status {code:?}: {stderr}")]
    ExitStatus { tool: String, code: Option<i32>, stderr: String },

    #[error("{tool} produced no output for {module}")]
    EmptyOutput { tool: String, module: String },

    #[error("Failed to load debug info from {module}: {reason}")]
    ModuleLoad { module: String, reason: String },
}

/// A single output line of the line tool that could not be understood.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineParseError {
    #[error("no ':' separator in {0:?}")]
    MissingColon(String),

    #[error("empty file or line segment in {0:?}")]
    EmptySegment(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {var}: {reason}")]
    InvalidValue { var: &'static str, value: String, reason: String },

    #[error("Unknown line backend {0:?} (expected addr2line, dwarf or off)")]
    UnknownBackend(String),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
