//! In-process line resolution from DWARF debug info
//!
//! Same answers as the `addr2line` tool, without a subprocess per batch. Each
//! module's debug info is parsed once and kept for the life of the source,
//! failures included, so a module without DWARF is only read once.

use super::demangle::demangle_or_raw;
use super::frame::{InlinedCall, UNKNOWN_FUNCTION, UNKNOWN_LOCATION};
use super::line_parser::{FrameLines, SourceLine};
use super::line_resolver::{LineQuery, LineSource};
use crate::domain::LineToolError;
use addr2line::Context;
use gimli::{EndianArcSlice, RunTimeEndian};
use log::{debug, warn};
use object::{Object, ObjectSection, ObjectSegment};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex, PoisonError};

type DwarfContext = Context<EndianArcSlice<RunTimeEndian>>;

/// Parsed debug info for one module
struct ModuleDebugInfo {
    ctx: DwarfContext,
    /// Lowest mapped virtual address, added to load-relative offsets
    vaddr_base: u64,
}

/// Contexts are not `Sync`, so lookups run with the module table locked
#[derive(Default)]
pub struct DwarfLineSource {
    modules: Mutex<HashMap<String, Option<ModuleDebugInfo>>>,
}

impl DwarfLineSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LineSource for DwarfLineSource {
    fn name(&self) -> &'static str {
        "dwarf"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn lookup(&self, query: &LineQuery<'_>) -> Result<Vec<FrameLines>, LineToolError> {
        let mut modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = modules.entry(query.module.to_string()).or_insert_with(|| {
            match load_module(query.module) {
                Ok(info) => {
                    debug!("Loaded debug info for {}", query.module);
                    Some(info)
                }
                Err(err) => {
                    warn!("{err}");
                    None
                }
            }
        });

        let Some(info) = entry.as_ref() else {
            return Err(LineToolError::ModuleLoad {
                module: query.module.to_string(),
                reason: "debug info unavailable".to_string(),
            });
        };

        Ok(query
            .offsets
            .iter()
            .map(|&offset| info.lines_for(offset.wrapping_add(info.vaddr_base), query))
            .collect())
    }
}

impl ModuleDebugInfo {
    fn lines_for(&self, probe: u64, query: &LineQuery<'_>) -> FrameLines {
        let mut lines = FrameLines::default();
        let Ok(mut frames) = self.ctx.find_frames(probe).skip_all_loads() else {
            return lines;
        };

        while let Ok(Some(frame)) = frames.next() {
            let function = frame
                .function
                .as_ref()
                .and_then(|f| f.raw_name().ok())
                .map(|name| demangle_or_raw(&name));
            let file = frame
                .location
                .as_ref()
                .and_then(|loc| loc.file)
                .unwrap_or(UNKNOWN_LOCATION)
                .to_string();
            let line = frame.location.as_ref().and_then(|loc| loc.line);

            if lines.location.is_none() {
                let function = if query.with_functions { function } else { None };
                lines.location = Some(SourceLine { function, file, line });
                if !query.unwind_inline {
                    break;
                }
            } else {
                let name = function.unwrap_or_else(|| UNKNOWN_FUNCTION.to_string());
                lines.inlined_by.push(InlinedCall { name, file, line });
            }
        }

        lines
    }
}

fn load_module(path: &str) -> Result<ModuleDebugInfo, LineToolError> {
    let load_error =
        |reason: String| LineToolError::ModuleLoad { module: path.to_string(), reason };

    let data = fs::read(path).map_err(|e| load_error(e.to_string()))?;
    let obj = object::File::parse(&*data).map_err(|e| load_error(e.to_string()))?;

    let endian = if obj.is_little_endian() { RunTimeEndian::Little } else { RunTimeEndian::Big };
    let load_section =
        |id: gimli::SectionId| -> Result<EndianArcSlice<RunTimeEndian>, gimli::Error> {
            let data = obj
                .section_by_name(id.name())
                .and_then(|section| section.uncompressed_data().ok())
                .unwrap_or(Cow::Borrowed(&[][..]));
            Ok(EndianArcSlice::new(Arc::from(&*data), endian))
        };

    let dwarf = gimli::Dwarf::load(&load_section).map_err(|e| load_error(e.to_string()))?;
    let ctx = Context::from_dwarf(dwarf).map_err(|e| load_error(e.to_string()))?;

    // Position-independent modules start at 0; fixed-address executables
    // keep their link address
    let vaddr_base = obj.segments().map(|segment| segment.address()).min().unwrap_or(0);

    Ok(ModuleDebugInfo { ctx, vaddr_base })
}
