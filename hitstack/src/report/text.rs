//! Plain text report

#![allow(clippy::format_push_string)]

use super::{totals, StackFrames};
use crate::symbolization::Frame;

/// Returned instead of a report when there is nothing to show
pub const NO_RECORDS: &str = "Report: no records.";

/// Render a dump as a human readable report.
///
/// With `print_symbol`, each frame also shows the raw native symbol.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Precision loss acceptable for percentages
pub fn stack_frames_to_string(records: &[StackFrames], print_symbol: bool) -> String {
    if records.is_empty() {
        return NO_RECORDS.to_string();
    }

    let (count_sum, score_sum) = totals(records);
    let mut out = String::from("Stack format: #N func at file:line (module+offset)");
    if print_symbol {
        out.push_str(" <symbol=...>");
    }
    out.push('\n');
    out.push_str(&format!(
        "Report: total {count_sum} records, score {score_sum}, in {} different stack frames:\n",
        records.len()
    ));

    for (i, record) in records.iter().enumerate() {
        out.push_str(&format!(
            "[{i}] recorded {} times ({}), score {}",
            record.count,
            percent(record.count as f64, count_sum as f64),
            record.score
        ));
        if score_sum != 0 {
            out.push_str(&format!(" ({})", percent(record.score as f64, score_sum as f64)));
        }
        out.push_str(", stack:\n");

        for (f, frame) in record.frames.iter().enumerate() {
            push_frame(&mut out, f, frame, print_symbol);
        }
        out.push('\n');
    }

    out
}

fn percent(part: f64, total: f64) -> String {
    format!("{:.2}%", part / total * 100.0)
}

/// `#N  func at file:line (module+0xOFF)`
fn push_frame(out: &mut String, index: usize, frame: &Frame, print_symbol: bool) {
    let pad = if index < 10 { "  " } else { " " };
    let line = frame.line.map_or_else(|| "?".to_string(), |line| line.to_string());
    out.push_str(&format!("#{index}{pad}{} at {}:{line}", frame.function, frame.file));
    match frame.offset() {
        Some(offset) => out.push_str(&format!(" ({}+0x{offset:x})", frame.module)),
        None => out.push_str(&format!(" ({}+?)", frame.module)),
    }
    if !frame.inlined_by.is_empty() {
        out.push_str(&format!(" [inlined: {}]", frame.inlined_by.len()));
    }
    if print_symbol {
        out.push_str(&format!(" <symbol={}>", frame.symbol));
    }
    out.push('\n');
}
