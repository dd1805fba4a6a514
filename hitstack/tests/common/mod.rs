//! Deterministic platform fakes shared by the integration tests

#![allow(dead_code)]

use hitstack::domain::{FramePointers, LineToolError};
use hitstack::platform::{ModuleInfo, ModuleLookup, Unwinder};
use hitstack::symbolization::line_parser::{FrameLines, SourceLine};
use hitstack::symbolization::{LineQuery, LineSource};
use hitstack::{Config, Registry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Unwinder whose "current stack" is set by the test
#[derive(Clone, Default)]
pub struct ScriptedUnwinder {
    current: Arc<Mutex<Vec<u64>>>,
    pub symbolized: Arc<AtomicUsize>,
}

impl ScriptedUnwinder {
    pub fn set_stack(&self, addrs: &[u64]) {
        *self.current.lock().unwrap() = addrs.to_vec();
    }
}

impl Unwinder for ScriptedUnwinder {
    fn capture_stack(&self, _skip: usize, max_frames: usize) -> FramePointers {
        self.current.lock().unwrap().iter().copied().take(max_frames).collect()
    }

    fn symbolize(&self, addrs: &[u64]) -> Vec<Option<String>> {
        self.symbolized.fetch_add(addrs.len(), Ordering::SeqCst);
        addrs
            .iter()
            .map(|&addr| Some(format!("/opt/app/bin/app(fn_{addr:x}+0x0) [0x{addr:x}]")))
            .collect()
    }
}

/// Every address from 0x1000 up belongs to `/opt/app/bin/app`, loaded at 0x1000
pub struct OneModule;

impl ModuleLookup for OneModule {
    fn lookup_module(&self, addr: u64) -> Option<ModuleInfo> {
        (addr >= 0x1000).then(|| ModuleInfo { path: "/opt/app/bin/app".to_string(), base: 0x1000 })
    }
}

/// Answers `src/app.rs:<offset>` for every offset and counts batches
#[derive(Clone, Default)]
pub struct FakeLines {
    pub batches: Arc<AtomicUsize>,
}

impl LineSource for FakeLines {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn lookup(&self, query: &LineQuery<'_>) -> Result<Vec<FrameLines>, LineToolError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(query
            .offsets
            .iter()
            .map(|&offset| FrameLines {
                location: Some(SourceLine {
                    function: None,
                    file: "src/app.rs".to_string(),
                    line: u32::try_from(offset).ok(),
                }),
                inlined_by: Vec::new(),
            })
            .collect())
    }
}

pub fn fake_registry(unwinder: &ScriptedUnwinder, lines: &FakeLines) -> Registry {
    Registry::with_platform(
        Config::default(),
        Box::new(unwinder.clone()),
        Box::new(OneModule),
        Box::new(lines.clone()),
    )
}
