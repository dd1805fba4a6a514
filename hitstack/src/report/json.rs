//! JSON report
//!
//! ```json
//! {"sum":120,"score":120,"records":[
//!   {"count":100,"score":100,"frames":[
//!     {"addr":"0x55d0c0a01a2b","func":"RunCall1()","file":"/src/test_001.cpp","line":8,
//!      "module":"./test_001","offset":6699,"symbol":"./test_001(+0x1a2b)","inlined":0}]}]}
//! ```
//!
//! Unknown lines are `-1`, unknown offsets `null`.

use super::{totals, StackFrames};
use crate::domain::ReportError;
use crate::symbolization::Frame;
use log::error;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::io::Write;

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    /// Total hit count over all records
    sum: u64,
    /// Total score over all records
    score: i64,
    records: Vec<JsonRecord<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonRecord<'a> {
    count: u64,
    score: i64,
    frames: Vec<JsonFrame<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonFrame<'a> {
    /// Absolute address as a hex string
    addr: String,
    func: &'a str,
    file: &'a str,
    /// -1 when unknown
    line: i64,
    module: &'a str,
    /// Address relative to the module base, null when the base is unknown
    offset: Option<u64>,
    symbol: &'a str,
    /// Number of enclosing inlined call sites
    inlined: usize,
}

impl<'a> From<&'a Frame> for JsonFrame<'a> {
    fn from(frame: &'a Frame) -> Self {
        Self {
            addr: format!("0x{:x}", frame.addr),
            func: &frame.function,
            file: &frame.file,
            line: frame.line.map_or(-1, i64::from),
            module: &frame.module,
            offset: frame.offset(),
            symbol: &frame.symbol,
            inlined: frame.inlined_by.len(),
        }
    }
}

fn build(records: &[StackFrames]) -> JsonReport<'_> {
    let (sum, score) = totals(records);
    JsonReport {
        sum,
        score,
        records: records
            .iter()
            .map(|record| JsonRecord {
                count: record.count,
                score: record.score,
                frames: record.frames.iter().map(|frame| JsonFrame::from(frame.as_ref())).collect(),
            })
            .collect(),
    }
}

/// Write a dump as JSON. `indent == 0` is compact, otherwise pretty printed
/// with that many spaces per level.
///
/// # Errors
/// Returns an error if writing fails
pub fn write_json<W: Write>(
    records: &[StackFrames],
    indent: usize,
    writer: W,
) -> Result<(), ReportError> {
    let report = build(records);
    if indent == 0 {
        serde_json::to_writer(writer, &report)?;
    } else {
        let spaces = vec![b' '; indent];
        let formatter = PrettyFormatter::with_indent(&spaces);
        let mut serializer = Serializer::with_formatter(writer, formatter);
        report.serialize(&mut serializer)?;
    }
    Ok(())
}

/// Render a dump as a JSON string, see [`write_json`]
#[must_use]
pub fn stack_frames_to_json(records: &[StackFrames], indent: usize) -> String {
    let mut buf = Vec::new();
    if let Err(err) = write_json(records, indent, &mut buf) {
        error!("Failed to render JSON report: {err}");
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{frame, row};
    use super::*;
    use crate::symbolization::InlinedCall;
    use serde_json::Value;
    use std::sync::Arc;

    #[test]
    fn test_empty_report() {
        assert_eq!(stack_frames_to_json(&[], 0), r#"{"sum":0,"score":0,"records":[]}"#);
    }

    #[test]
    fn test_fields() {
        let mut unknown = Frame::unresolved(0xbeef);
        unknown.inlined_by.push(InlinedCall {
            name: "outer".to_string(),
            file: "a.c".to_string(),
            line: Some(3),
        });
        let records = vec![
            row(vec![frame(0x1a2b, "RunCall1()", Some(8))], 100, 90),
            row(vec![Arc::new(unknown)], 20, -10),
        ];

        let value: Value = serde_json::from_str(&stack_frames_to_json(&records, 0)).unwrap();
        assert_eq!(value["sum"], 120);
        assert_eq!(value["score"], 80);
        assert_eq!(value["records"].as_array().unwrap().len(), 2);

        let first = &value["records"][0]["frames"][0];
        assert_eq!(first["addr"], "0x1a2b");
        assert_eq!(first["func"], "RunCall1()");
        assert_eq!(first["line"], 8);
        assert_eq!(first["module"], "/bin/app");
        assert_eq!(first["offset"], 0xa2b);
        assert_eq!(first["inlined"], 0);

        let second = &value["records"][1];
        assert_eq!(second["score"], -10);
        assert_eq!(second["frames"][0]["line"], -1);
        assert!(second["frames"][0]["offset"].is_null());
        assert_eq!(second["frames"][0]["symbol"], "(nil)");
        assert_eq!(second["frames"][0]["inlined"], 1);
    }

    #[test]
    fn test_indentation() {
        let records = vec![row(vec![frame(0x1010, "f", Some(1))], 1, 1)];

        let compact = stack_frames_to_json(&records, 0);
        assert!(!compact.contains('\n'));

        let pretty = stack_frames_to_json(&records, 2);
        assert!(pretty.contains("\n  \"sum\": 1"));
        let wide = stack_frames_to_json(&records, 4);
        assert!(wide.contains("\n    \"sum\": 1"));

        let a: Value = serde_json::from_str(&compact).unwrap();
        let b: Value = serde_json::from_str(&wide).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_write_json_reports_io_errors() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let records = vec![row(vec![frame(0x1010, "f", Some(1))], 1, 1)];
        assert!(write_json(&records, 0, Broken).is_err());
    }
}
