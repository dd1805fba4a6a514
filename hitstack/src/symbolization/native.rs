//! Native symbolization: one address plus its loader-provided symbol text
//! becomes a [`Frame`].
//!
//! The symbol text has the shape produced by glibc's `backtrace_symbols`:
//!
//! ```text
//! /lib/x86_64-linux-gnu/libc.so.6(__libc_start_main+0xeb) [0x7f059d5a809b]
//! ./app(+0x1a2b) [0x55d0c0a01a2b]
//! ```
//!
//! Only exported symbols carry a name here. Everything else gets its function
//! name from the line resolver later.

use super::demangle::demangle_or_raw;
use super::frame::{Frame, NIL_SYMBOL, UNKNOWN_FUNCTION, UNKNOWN_LOCATION};
use crate::platform::ModuleInfo;

/// The pieces of one native symbol string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedSymbol<'a> {
    /// Text before `(`, if there is a non-empty one
    pub module: Option<&'a str>,
    /// Text between `(` and the offset's `+`, if non-empty
    pub mangled: Option<&'a str>,
    /// The input with any trailing ` [0x...]` removed
    pub display: &'a str,
}

/// Split a native symbol string into module, mangled name and display text
#[must_use]
pub fn parse_symbol(symbol: &str) -> ParsedSymbol<'_> {
    let display = strip_address_suffix(symbol);

    let Some(open) = display.find('(') else {
        return ParsedSymbol { module: None, mangled: None, display };
    };
    let module = Some(&display[..open]).filter(|m| !m.is_empty());

    let inner_end = display[open..].rfind(')').map_or(display.len(), |close| open + close);
    let inner = &display[open + 1..inner_end];
    let mangled = inner.rfind('+').map(|plus| &inner[..plus]).filter(|m| !m.is_empty());

    ParsedSymbol { module, mangled, display }
}

/// Drop the trailing absolute address, `"...) [0x7f64639e009b]"` -> `"...)"`
fn strip_address_suffix(symbol: &str) -> &str {
    match symbol.rfind(" [0x") {
        Some(pos) if symbol.ends_with(']') => &symbol[..pos],
        _ => symbol,
    }
}

/// Build the native part of a frame.
///
/// Pure function of its inputs; the frame cache is responsible for calling
/// it at most once per address. Source file and line stay at `??`/unknown.
#[must_use]
pub fn resolve_symbol(addr: u64, symbol: Option<&str>, module: Option<&ModuleInfo>) -> Frame {
    let mut frame = Frame::unresolved(addr);
    frame.module_base = module.map(|m| m.base).filter(|&base| base != 0 && base <= addr);

    let loader_path = module.map(|m| m.path.as_str()).filter(|p| !p.is_empty());

    match symbol.map(parse_symbol) {
        Some(parsed) => {
            frame.symbol = parsed.display.to_string();
            frame.module = parsed.module.or(loader_path).unwrap_or(UNKNOWN_LOCATION).to_string();
            frame.function =
                parsed.mangled.map_or_else(|| UNKNOWN_FUNCTION.to_string(), demangle_or_raw);
        }
        None => {
            frame.symbol = NIL_SYMBOL.to_string();
            frame.module = loader_path.unwrap_or(UNKNOWN_LOCATION).to_string();
        }
    }

    frame
}
