//! Address to module lookup through the dynamic loader
//!
//! `dladdr` reports the object file that contains an address, its load base
//! and, when the address falls inside an exported symbol, that symbol's name
//! and start. Both the loader lookup and the native symbol strings are built
//! from it.

#![allow(unsafe_code)] // dladdr() requires unsafe

use super::{ModuleInfo, ModuleLookup};
use std::ffi::{c_void, CStr};

/// What `dladdr` knows about one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DlInfo {
    pub path: Option<String>,
    pub base: u64,
    pub symbol: Option<String>,
    pub symbol_addr: u64,
}

#[cfg(unix)]
pub(crate) fn dladdr(addr: u64) -> Option<DlInfo> {
    let mut info = std::mem::MaybeUninit::<libc::Dl_info>::zeroed();
    let ok = unsafe { libc::dladdr(addr as usize as *const c_void, info.as_mut_ptr()) };
    if ok == 0 {
        return None;
    }

    let info = unsafe { info.assume_init() };
    let path = c_string(info.dli_fname).filter(|p| !p.is_empty());
    let symbol = c_string(info.dli_sname).filter(|s| !s.is_empty());

    Some(DlInfo {
        path,
        base: info.dli_fbase as usize as u64,
        symbol,
        symbol_addr: info.dli_saddr as usize as u64,
    })
}

#[cfg(not(unix))]
pub(crate) fn dladdr(_addr: u64) -> Option<DlInfo> {
    None
}

#[cfg(unix)]
fn c_string(ptr: *const libc::c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Module lookup backed by the process's own dynamic loader
#[derive(Debug, Default, Clone, Copy)]
pub struct DlModuleLookup;

impl ModuleLookup for DlModuleLookup {
    fn lookup_module(&self, addr: u64) -> Option<ModuleInfo> {
        let info = dladdr(addr)?;
        if info.base == 0 {
            return None;
        }
        Some(ModuleInfo { path: info.path?, base: info.base })
    }
}
