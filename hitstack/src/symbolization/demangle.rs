//! Symbol demangling
//!
//! Rust symbols (legacy `_ZN...E` and v0 `_R...`) go through
//! `rustc-demangle`, everything else that looks Itanium-mangled goes through
//! `cpp_demangle`.

use rustc_demangle::try_demangle;

/// Demangle a linker symbol, `None` if it is not a mangled name we understand
#[must_use]
pub fn demangle(symbol: &str) -> Option<String> {
    if symbol.is_empty() {
        return None;
    }

    if let Ok(demangled) = try_demangle(symbol) {
        // {:#} drops the trailing hash
        return Some(format!("{demangled:#}"));
    }

    if symbol.starts_with("_Z") {
        let options = cpp_demangle::DemangleOptions::default();
        if let Ok(parsed) = cpp_demangle::Symbol::new(symbol) {
            if let Ok(demangled) = parsed.demangle(&options) {
                return Some(demangled);
            }
        }
    }

    None
}

/// Demangle or return the input unchanged
#[must_use]
pub fn demangle_or_raw(symbol: &str) -> String {
    demangle(symbol).unwrap_or_else(|| symbol.to_string())
}
