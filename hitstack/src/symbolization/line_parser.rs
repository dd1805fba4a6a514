//! Parser for `addr2line -p` output
//!
//! Depending on the flags, each requested address produces:
//!
//! ```text
//! FILE:LINE                                   (no flags)
//! FUNC at FILE:LINE                           (-f)
//! FUNC at FILE:LINE                           (-f -i, not inlined)
//! FUNC at FILE:LINE                           (-f -i, inlined: first line is
//!  (inlined by) FUNC at FILE:LINE              the innermost location, each
//!  (inlined by) FUNC at FILE:LINE              following line an enclosing
//!                                              call site)
//! ```
//!
//! LINE may be `?`, and may be followed by ` (discriminator N)`. The number of
//! lines per address is not fixed, so the parser tracks which address it is on
//! by counting lines that do not start with the inline marker.

use super::demangle::demangle_or_raw;
use super::frame::{InlinedCall, UNKNOWN_FUNCTION};
use crate::domain::LineParseError;
use log::warn;

const INLINED_BY: &str = " (inlined by) ";
const AT: &str = " at ";
const DISCRIMINATOR: &str = " (discriminator ";
const UNKNOWN_PREFIX: &str = "?? ";

/// One `[FUNC at ]FILE:LINE` location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub function: Option<String>,
    pub file: String,
    pub line: Option<u32>,
}

/// Everything the tool said about one requested address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameLines {
    /// Innermost location, `None` if the tool printed nothing usable
    pub location: Option<SourceLine>,
    /// Enclosing inlined call sites, nearest first
    pub inlined_by: Vec<InlinedCall>,
}

/// Parse a whole batch of output for `frame_count` requested addresses.
///
/// Always returns exactly `frame_count` entries. Malformed lines are logged
/// and skipped; output past the last address is ignored.
#[must_use]
pub fn parse_batch(output: &str, frame_count: usize) -> Vec<FrameLines> {
    let mut frames = vec![FrameLines::default(); frame_count];
    let mut current: Option<usize> = None;

    for raw in output.lines() {
        if raw.trim().is_empty() {
            continue;
        }

        let (inlined, body) = match raw.strip_prefix(INLINED_BY) {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        if !inlined {
            let next = current.map_or(0, |i| i + 1);
            if next >= frame_count {
                break;
            }
            current = Some(next);
        }

        let Some(index) = current else {
            warn!("Line tool output starts with an inlined location: {raw:?}");
            continue;
        };

        let parsed = match parse_line(body) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("Skipping line tool output: {err}");
                continue;
            }
        };

        let entry = &mut frames[index];
        if inlined {
            entry.inlined_by.push(InlinedCall {
                name: parsed.function.unwrap_or_else(|| UNKNOWN_FUNCTION.to_string()),
                file: parsed.file,
                line: parsed.line,
            });
        } else {
            entry.location = Some(parsed);
        }
    }

    frames
}

/// Parse one `[FUNC at ]FILE:LINE[ (discriminator N)]` line
///
/// # Errors
/// Returns an error when there is no `:` separator or either side is empty
pub fn parse_line(line: &str) -> Result<SourceLine, LineParseError> {
    let line = line.trim_end();

    // With -f, an address the tool knows nothing about prints as "?? ??:0"
    let (function, location) = match (line.find(AT), line.strip_prefix(UNKNOWN_PREFIX)) {
        (Some(pos), _) => (Some(&line[..pos]), &line[pos + AT.len()..]),
        (None, Some(rest)) => (None, rest),
        (None, None) => (None, line),
    };
    let function = function.filter(|f| !f.is_empty() && *f != "??").map(demangle_or_raw);

    let location = match location.find(DISCRIMINATOR) {
        Some(pos) => &location[..pos],
        None => location,
    };

    let colon = location.rfind(':').ok_or_else(|| LineParseError::MissingColon(line.to_string()))?;
    let (file, line_text) = (&location[..colon], &location[colon + 1..]);
    if file.is_empty() || line_text.is_empty() {
        return Err(LineParseError::EmptySegment(line.to_string()));
    }

    Ok(SourceLine { function, file: file.to_string(), line: parse_line_number(line_text) })
}

/// `?` and anything that is not a non-negative integer mean "unknown"
fn parse_line_number(text: &str) -> Option<u32> {
    if text.starts_with('?') {
        return None;
    }
    let digits_end = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    text[..digits_end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_file_line() {
        let frames = parse_batch("/src/app/main.cpp:42\n??:?\n", 2);
        let first = frames[0].location.as_ref().unwrap();
        assert_eq!(first.file, "/src/app/main.cpp");
        assert_eq!(first.line, Some(42));
        assert_eq!(first.function, None);

        let second = frames[1].location.as_ref().unwrap();
        assert_eq!(second.file, "??");
        assert_eq!(second.line, None);
    }

    #[test]
    fn test_function_and_discriminator() {
        let line = parse_line("RunCall2() at /home/dev/test_001.cpp:12 (discriminator 2)").unwrap();
        assert_eq!(line.function.as_deref(), Some("RunCall2()"));
        assert_eq!(line.file, "/home/dev/test_001.cpp");
        assert_eq!(line.line, Some(12));
    }

    #[test]
    fn test_mangled_function_is_demangled() {
        let line = parse_line("_ZN4core3fmt5write17h0123456789abcdefE at fmt/mod.rs:1179").unwrap();
        assert_eq!(line.function.as_deref(), Some("core::fmt::write"));
        assert_eq!(line.line, Some(1179));
    }

    #[test]
    fn test_unknown_function_is_not_a_name() {
        let line = parse_line("?? ??:0").unwrap();
        assert_eq!(line.function, None);
        assert_eq!(line.file, "??");

        let line = parse_line("?? at ??:0").unwrap();
        assert_eq!(line.function, None);
        assert_eq!(line.file, "??");
        assert_eq!(line.line, Some(0));
    }

    #[test]
    fn test_inline_chain_belongs_to_current_frame() {
        let output = "\
inner_helper at /src/util.h:10
 (inlined by) middle at /src/util.cpp:20
 (inlined by) outer at /src/main.cpp:30
standalone at /src/other.cpp:5
";
        let frames = parse_batch(output, 2);

        let first = &frames[0];
        assert_eq!(first.location.as_ref().unwrap().function.as_deref(), Some("inner_helper"));
        assert_eq!(first.inlined_by.len(), 2);
        assert_eq!(first.inlined_by[0].name, "middle");
        assert_eq!(first.inlined_by[0].line, Some(20));
        assert_eq!(first.inlined_by[1].name, "outer");
        assert_eq!(first.inlined_by[1].file, "/src/main.cpp");

        let second = &frames[1];
        assert_eq!(second.location.as_ref().unwrap().file, "/src/other.cpp");
        assert!(second.inlined_by.is_empty());
    }

    #[test]
    fn test_inlined_without_function_name() {
        let frames = parse_batch("/src/a.h:1\n (inlined by) /src/a.cpp:2\n", 1);
        assert_eq!(frames[0].inlined_by[0].name, "<unknown>");
        assert_eq!(frames[0].inlined_by[0].line, Some(2));
    }

    #[test]
    fn test_malformed_line_is_skipped_but_counted() {
        // The malformed line still starts a new frame, so the third line is
        // attributed to the third address.
        let frames = parse_batch("a.c:1\nno separator here\nc.c:3\n", 3);
        assert_eq!(frames[0].location.as_ref().unwrap().file, "a.c");
        assert_eq!(frames[1].location, None);
        assert_eq!(frames[2].location.as_ref().unwrap().file, "c.c");
    }

    #[test]
    fn test_extra_output_is_ignored() {
        let frames = parse_batch("a.c:1\nb.c:2\nc.c:3\n", 2);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].location.as_ref().unwrap().file, "b.c");
    }

    #[test]
    fn test_leading_inline_marker_is_skipped() {
        let frames = parse_batch(" (inlined by) x at a.c:1\nb.c:2\n", 1);
        assert_eq!(frames[0].location.as_ref().unwrap().file, "b.c");
        assert!(frames[0].inlined_by.is_empty());
    }

    #[test]
    fn test_unparsable_line_number_is_unknown() {
        let line = parse_line("file.c:abc").unwrap();
        assert_eq!(line.line, None);
        assert!(parse_line("file.c:").is_err());
        assert!(parse_line(":12").is_err());
    }

    #[test]
    fn test_empty_output() {
        let frames = parse_batch("", 3);
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.location.is_none()));
    }
}
