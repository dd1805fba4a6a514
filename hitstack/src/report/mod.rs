//! Report rendering
//!
//! A dump is a list of [`StackFrames`] rows, most hit first. This module turns
//! it into text for humans or JSON for tools:
//!
//! ```text
//! Stack format: #N func at file:line (module+offset)
//! Report: total 120 records, score 120, in 2 different stack frames:
//! [0] recorded 100 times (83.33%), score 100 (83.33%), stack:
//! #0  RunCall1() at /src/test_001.cpp:8 (./test_001+0x1a2b)
//! #1  main at /src/test_001.cpp:21 (./test_001+0x1c40)
//! ```

pub mod json;
pub mod text;

pub use json::{stack_frames_to_json, write_json};
pub use text::stack_frames_to_string;

use crate::symbolization::Frame;
use std::sync::Arc;

/// One distinct stack with its statistics
#[derive(Debug, Clone)]
pub struct StackFrames {
    /// Resolved frames, innermost first
    pub frames: Vec<Arc<Frame>>,
    pub count: u64,
    pub score: i64,
}

/// Total hit count and total score over all rows
#[must_use]
pub fn totals(records: &[StackFrames]) -> (u64, i64) {
    records.iter().fold((0u64, 0i64), |(count, score), row| {
        (count.saturating_add(row.count), score.saturating_add(row.score))
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::StackFrames;
    use crate::symbolization::Frame;
    use std::sync::Arc;

    /// A fully resolved frame in `/bin/app` loaded at 0x1000
    pub fn frame(addr: u64, function: &str, line: Option<u32>) -> Arc<Frame> {
        let mut frame = Frame::unresolved(addr);
        frame.module_base = Some(0x1000);
        frame.module = "/bin/app".to_string();
        frame.function = function.to_string();
        frame.file = "/src/app.cpp".to_string();
        frame.line = line;
        frame.symbol = format!("/bin/app(+0x{:x})", addr - 0x1000);
        Arc::new(frame)
    }

    pub fn row(frames: Vec<Arc<Frame>>, count: u64, score: i64) -> StackFrames {
        StackFrames { frames, count, score }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{frame, row};
    use super::*;

    #[test]
    fn test_totals() {
        let rows = vec![row(vec![frame(0x1010, "a", None)], 3, 10), row(vec![], 2, -15)];
        assert_eq!(totals(&rows), (5, -5));
        assert_eq!(totals(&[]), (0, 0));
    }
}
