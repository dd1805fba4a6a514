//! External `addr2line` adapter
//!
//! One subprocess call per batch of addresses from the same module:
//!
//! ```text
//! addr2line -e <module> -p [-f] [-i] 0x1a2b 0x1c40 ...
//! ```
//!
//! Whether the tool exists is checked once per adapter and cached. There is
//! no timeout: a hung tool blocks the dump that called it.

use super::line_parser::{parse_batch, FrameLines};
use super::line_resolver::{LineQuery, LineSource};
use crate::domain::LineToolError;
use log::{debug, info, warn};
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

pub struct Addr2lineTool {
    program: String,
    available: OnceLock<bool>,
}

impl Addr2lineTool {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), available: OnceLock::new() }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command-line arguments for one batch, offsets in request order
    #[must_use]
    pub fn build_args(query: &LineQuery<'_>) -> Vec<String> {
        let mut args = vec!["-e".to_string(), query.module.to_string(), "-p".to_string()];
        if query.with_functions {
            args.push("-f".to_string());
        }
        if query.unwind_inline {
            args.push("-i".to_string());
        }
        args.extend(query.offsets.iter().map(|offset| format!("0x{offset:x}")));
        args
    }

    fn probe(&self) -> bool {
        let found = find_program(&self.program);
        match &found {
            Some(location) => info!("{} found: {location}", self.program),
            None => warn!("{} not found, source lines will not be resolved", self.program),
        }
        found.is_some()
    }
}

impl LineSource for Addr2lineTool {
    fn name(&self) -> &'static str {
        "addr2line"
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| self.probe())
    }

    fn lookup(&self, query: &LineQuery<'_>) -> Result<Vec<FrameLines>, LineToolError> {
        if !self.is_available() {
            return Err(LineToolError::Unavailable(self.name()));
        }

        let args = Self::build_args(query);
        debug!("Running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program).args(&args).output().map_err(|source| {
            LineToolError::Spawn { tool: self.program.clone(), source }
        })?;

        if !output.status.success() {
            return Err(LineToolError::ExitStatus {
                tool: self.program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Err(LineToolError::EmptyOutput {
                tool: self.program.clone(),
                module: query.module.to_string(),
            });
        }

        Ok(parse_batch(&stdout, query.offsets.len()))
    }
}

/// Locate a program: explicit paths are checked directly, bare names through
/// `which`, then `whereis -b`
fn find_program(program: &str) -> Option<String> {
    if program.contains('/') {
        return Path::new(program).is_file().then(|| program.to_string());
    }

    if let Ok(output) = Command::new("which").arg(program).output() {
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() && !stdout.is_empty() {
            return Some(stdout);
        }
        return None;
    }

    // `which` is missing, try whereis: "addr2line: /usr/bin/addr2line"
    let output = Command::new("whereis").args(["-b", program]).output().ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let (_, locations) = stdout.split_once(':')?;
    locations.split_whitespace().next().map(str::to_string)
}
