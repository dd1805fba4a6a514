//! Source-line resolution in batches
//!
//! Frames fresh out of the native resolver only know their module and
//! (sometimes) an exported symbol name. This stage asks a [`LineSource`] for
//! file, line, a better function name and the chain of inlined call sites.
//!
//! Line tools are expensive to start, so frames are grouped per module and
//! each group is answered by a single query:
//!
//! ```text
//! frames:  [a.so#1, b.so#1, a.so#2, c.so#1, b.so#2]
//! batches: [a.so#1, a.so#2]  [b.so#1, b.so#2]  [c.so#1]
//! ```
//!
//! Groups are formed in input order (first ungrouped frame opens a batch and
//! pulls in the later frames of its module) and capped at the configured
//! batch size. Failures are logged and leave the batch at `??`.

use super::frame::Frame;
use super::line_parser::FrameLines;
use crate::domain::LineToolError;
use log::{debug, warn};
use std::time::{Duration, Instant};

/// Resolution slower than this is worth a warning
const SLOW_RESOLVE: Duration = Duration::from_secs(1);

/// One batch request: offsets are relative to the module's load base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineQuery<'a> {
    pub module: &'a str,
    pub offsets: Vec<u64>,
    pub with_functions: bool,
    pub unwind_inline: bool,
}

/// A backend answering [`LineQuery`]s
pub trait LineSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether queries can succeed at all. Called before every batch, so
    /// implementations should cache anything expensive.
    fn is_available(&self) -> bool;

    /// Resolve every offset of the query.
    ///
    /// On success the result has exactly one entry per offset, in order.
    ///
    /// # Errors
    /// Returns an error if the backend could not answer this batch at all
    fn lookup(&self, query: &LineQuery<'_>) -> Result<Vec<FrameLines>, LineToolError>;
}

/// Backend used when line resolution is turned off
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledLineSource;

impl LineSource for DisabledLineSource {
    fn name(&self) -> &'static str {
        "off"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn lookup(&self, _query: &LineQuery<'_>) -> Result<Vec<FrameLines>, LineToolError> {
        Err(LineToolError::Unavailable(self.name()))
    }
}

pub struct LineResolver {
    source: Box<dyn LineSource>,
    batch_size: usize,
    unwind_inline: bool,
}

impl LineResolver {
    #[must_use]
    pub fn new(source: Box<dyn LineSource>, batch_size: usize, unwind_inline: bool) -> Self {
        Self { source, batch_size: batch_size.max(1), unwind_inline }
    }

    #[must_use]
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Fill in source information for `frames` in place.
    ///
    /// Frames without a module base cannot be queried and are left alone.
    pub fn resolve(&self, frames: &mut [Frame]) {
        if frames.is_empty() || !self.source.is_available() {
            return;
        }

        let start = Instant::now();
        let batches = group_batches(frames, self.batch_size);
        for batch in &batches {
            self.resolve_batch(frames, batch);
        }

        let elapsed = start.elapsed();
        if elapsed > SLOW_RESOLVE {
            warn!(
                "Resolving {} frames in {} batches took {:.3}s",
                frames.len(),
                batches.len(),
                elapsed.as_secs_f64()
            );
        } else {
            debug!("Resolved {} frames in {} batches", frames.len(), batches.len());
        }
    }

    fn resolve_batch(&self, frames: &mut [Frame], batch: &[usize]) {
        let module = frames[batch[0]].module.clone();
        let offsets: Vec<u64> = batch.iter().filter_map(|&i| frames[i].offset()).collect();
        // Inline unwinding tells call sites apart by function, so always ask
        // for names in that mode
        let with_functions = self.unwind_inline || batch.iter().any(|&i| !frames[i].has_function());

        let query = LineQuery {
            module: &module,
            offsets,
            with_functions,
            unwind_inline: self.unwind_inline,
        };

        let results = match self.source.lookup(&query) {
            Ok(results) => results,
            Err(err) => {
                warn!("Line resolution failed for {} frames of {module}: {err}", batch.len());
                return;
            }
        };

        for (&index, lines) in batch.iter().zip(results) {
            apply(&mut frames[index], lines);
        }
    }
}

/// Group frame indices by module, preserving input order.
///
/// Only frames with a known module base take part.
#[must_use]
pub fn group_batches(frames: &[Frame], batch_size: usize) -> Vec<Vec<usize>> {
    let batch_size = batch_size.max(1);
    let mut grouped: Vec<bool> = frames.iter().map(|f| f.offset().is_none()).collect();
    let mut batches = Vec::new();

    for i in 0..frames.len() {
        if grouped[i] {
            continue;
        }
        grouped[i] = true;
        let mut batch = vec![i];

        for j in i + 1..frames.len() {
            if batch.len() >= batch_size {
                break;
            }
            if !grouped[j] && frames[j].module == frames[i].module {
                grouped[j] = true;
                batch.push(j);
            }
        }
        batches.push(batch);
    }

    batches
}

/// Upgrade a frame with what the line source found
fn apply(frame: &mut Frame, lines: FrameLines) {
    if let Some(location) = lines.location {
        frame.file = location.file;
        frame.line = location.line;
        if let Some(function) = location.function {
            // May name an inlined callee more precisely than the exported symbol
            frame.function = function;
        }
    }
    frame.inlined_by.extend(lines.inlined_by);
}
