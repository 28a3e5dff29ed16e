//! Locate the shared library a shim was loaded from.
//!
//! Shims keep their config and log files next to their own module, not in
//! the host's working directory.

use std::ffi::c_void;
use std::path::{Path, PathBuf};

/// Path of the module that contains `address`.
///
/// Pass the address of any function defined in the shim. Returns `None` if
/// the OS cannot attribute the address to a loaded module.
pub fn module_path_of(address: *const c_void) -> Option<PathBuf> {
    imp::module_path_of(address)
}

/// Directory of the module that contains `address`, falling back to the
/// current directory.
pub fn module_dir_of(address: *const c_void) -> PathBuf {
    module_path_of(address)
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(windows)]
mod imp {
    use std::ffi::{OsString, c_void};
    use std::os::windows::ffi::OsStringExt;
    use std::path::PathBuf;

    use windows::Win32::Foundation::HMODULE;
    use windows::Win32::System::LibraryLoader::{
        GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS, GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
        GetModuleFileNameW, GetModuleHandleExW,
    };
    use windows::core::PCWSTR;

    const MAX_PATH_CHARS: usize = 32_768;

    pub(super) fn module_path_of(address: *const c_void) -> Option<PathBuf> {
        let mut module = HMODULE::default();
        // SAFETY: with FROM_ADDRESS the name argument is read as an address
        // only; UNCHANGED_REFCOUNT means no handle needs releasing.
        let found = unsafe {
            GetModuleHandleExW(
                GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS | GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
                PCWSTR(address.cast::<u16>()),
                &mut module,
            )
        };
        found.ok()?;

        let mut buf = vec![0u16; MAX_PATH_CHARS];
        // SAFETY: `module` is a loaded module handle and `buf` is writable.
        let len = unsafe { GetModuleFileNameW(Some(module), &mut buf) } as usize;
        if len == 0 || len >= buf.len() {
            return None;
        }
        buf.truncate(len);
        Some(PathBuf::from(OsString::from_wide(&buf)))
    }
}

#[cfg(unix)]
mod imp {
    use std::ffi::{CStr, c_void};
    use std::os::unix::ffi::OsStrExt;
    use std::path::PathBuf;

    pub(super) fn module_path_of(address: *const c_void) -> Option<PathBuf> {
        let mut info = std::mem::MaybeUninit::<libc::Dl_info>::zeroed();
        // SAFETY: dladdr only inspects `address` and fills `info`.
        let found = unsafe { libc::dladdr(address, info.as_mut_ptr()) };
        if found == 0 {
            return None;
        }
        // SAFETY: dladdr returned non-zero, so `info` is initialized.
        let info = unsafe { info.assume_init() };
        if info.dli_fname.is_null() {
            return None;
        }
        // SAFETY: dli_fname is a NUL-terminated string owned by the loader
        // and valid while the module stays loaded.
        let name = unsafe { CStr::from_ptr(info.dli_fname) };
        Some(PathBuf::from(std::ffi::OsStr::from_bytes(name.to_bytes())))
    }
}

#[cfg(not(any(windows, unix)))]
mod imp {
    use std::ffi::c_void;
    use std::path::PathBuf;

    pub(super) fn module_path_of(_address: *const c_void) -> Option<PathBuf> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() {}

    #[test]
    fn test_own_code_resolves_to_a_module() {
        let path = module_path_of(marker as fn() as *const c_void);
        assert!(path.is_some_and(|path| path.is_absolute() || path.components().count() > 0));
    }

    #[test]
    fn test_dir_falls_back_to_current() {
        let dir = module_dir_of(std::ptr::null());
        assert!(!dir.as_os_str().is_empty());
    }
}
