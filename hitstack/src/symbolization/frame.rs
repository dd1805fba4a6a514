/// Function name used when nothing better is known
pub const UNKNOWN_FUNCTION: &str = "<unknown>";

/// Module or file name used when nothing better is known
pub const UNKNOWN_LOCATION: &str = "??";

/// Placeholder symbol text for an address the unwinder could not describe
pub const NIL_SYMBOL: &str = "(nil)";

/// Resolved metadata for one return address.
///
/// Frames are built once, by the native resolver and then the line resolver,
/// before the frame cache publishes them behind an `Arc`. Published frames
/// are never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub addr: u64,
    /// Load address of the owning module, if the loader knows it
    pub module_base: Option<u64>,
    /// Native symbol text, without the trailing `[0x...]`
    pub symbol: String,
    pub function: String,
    pub module: String,
    pub file: String,
    pub line: Option<u32>,
    /// Call sites this location was inlined into, nearest first
    pub inlined_by: Vec<InlinedCall>,
}

/// One enclosing call site of an inlined location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinedCall {
    pub name: String,
    pub file: String,
    pub line: Option<u32>,
}

impl Frame {
    /// A frame with every field at its placeholder value
    #[must_use]
    pub fn unresolved(addr: u64) -> Self {
        Self {
            addr,
            module_base: None,
            symbol: NIL_SYMBOL.to_string(),
            function: UNKNOWN_FUNCTION.to_string(),
            module: UNKNOWN_LOCATION.to_string(),
            file: UNKNOWN_LOCATION.to_string(),
            line: None,
            inlined_by: Vec::new(),
        }
    }

    /// Address relative to the module's load base
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        self.module_base.and_then(|base| self.addr.checked_sub(base))
    }

    #[must_use]
    pub fn has_function(&self) -> bool {
        self.function != UNKNOWN_FUNCTION
    }

    #[must_use]
    pub fn has_source_location(&self) -> bool {
        self.file != UNKNOWN_LOCATION
    }
}
