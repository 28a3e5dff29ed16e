//! The real `openvr_api` library the wrapper forwards to.

use std::fmt;
use std::path::Path;

use libloading::Library;
use openstride_errors::HostError;

use crate::ffi::{
    PfnBoolQuery, PfnErrorString, PfnGetGenericInterface, PfnGetInitToken, PfnGetRuntimePath, PfnInitInternal,
    PfnInitInternal2, PfnIsInterfaceVersionValid, PfnShutdownInternal,
};

/// File name the original library is renamed to.
pub const REAL_LIBRARY_NAME: &str = "openvr_api_original.dll";

/// Exports of the real library. Anything the library lacks stays `None`
/// and the matching wrapper export answers with its fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealExports {
    /// `VR_InitInternal`
    pub init_internal: Option<PfnInitInternal>,
    /// `VR_InitInternal2`
    pub init_internal2: Option<PfnInitInternal2>,
    /// `VR_ShutdownInternal`
    pub shutdown_internal: Option<PfnShutdownInternal>,
    /// `VR_GetVRInitErrorAsEnglishDescription`
    pub init_error_as_english_description: Option<PfnErrorString>,
    /// `VR_GetVRInitErrorAsSymbol`
    pub init_error_as_symbol: Option<PfnErrorString>,
    /// `VR_IsHmdPresent`
    pub is_hmd_present: Option<PfnBoolQuery>,
    /// `VR_IsRuntimeInstalled`
    pub is_runtime_installed: Option<PfnBoolQuery>,
    /// `VR_GetRuntimePath`
    pub get_runtime_path: Option<PfnGetRuntimePath>,
    /// `VR_GetStringForHmdError`
    pub string_for_hmd_error: Option<PfnErrorString>,
    /// `VR_GetGenericInterface`
    pub get_generic_interface: Option<PfnGetGenericInterface>,
    /// `VR_IsInterfaceVersionValid`
    pub is_interface_version_valid: Option<PfnIsInterfaceVersionValid>,
    /// `VR_GetInitToken`
    pub get_init_token: Option<PfnGetInitToken>,
}

impl RealExports {
    fn resolved_count(&self) -> usize {
        [
            self.init_internal.is_some(),
            self.init_internal2.is_some(),
            self.shutdown_internal.is_some(),
            self.init_error_as_english_description.is_some(),
            self.init_error_as_symbol.is_some(),
            self.is_hmd_present.is_some(),
            self.is_runtime_installed.is_some(),
            self.get_runtime_path.is_some(),
            self.string_for_hmd_error.is_some(),
            self.get_generic_interface.is_some(),
            self.is_interface_version_valid.is_some(),
            self.get_init_token.is_some(),
        ]
        .into_iter()
        .filter(|&present| present)
        .count()
    }
}

/// Resolved exports plus the module that keeps them valid.
pub struct RealLibrary {
    exports: RealExports,
    _library: Option<Library>,
}

impl fmt::Debug for RealLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealLibrary")
            .field("resolved", &self.exports.resolved_count())
            .field("dynamic", &self._library.is_some())
            .finish()
    }
}

impl RealLibrary {
    /// Load the real library and resolve its exports.
    ///
    /// # Errors
    ///
    /// [`HostError::LibraryMissing`] if the module does not load, and
    /// [`HostError::FunctionUnavailable`] if it lacks `VR_GetGenericInterface`,
    /// without which no interface can be handed out.
    pub fn load(path: &Path) -> Result<Self, HostError> {
        // SAFETY: loading runs the module's initializers; it is the runtime
        // library the host was going to load anyway.
        let library = unsafe { Library::new(path) }.map_err(|err| {
            tracing::error!(path = %path.display(), error = %err, "Real OpenVR library not loadable");
            HostError::LibraryMissing {
                path: path.display().to_string(),
            }
        })?;

        // SAFETY: every name is paired with its `openvr_api` signature; the
        // pointers stay valid while `library` is held.
        let exports = unsafe {
            RealExports {
                init_internal: export(&library, b"VR_InitInternal\0"),
                init_internal2: export(&library, b"VR_InitInternal2\0"),
                shutdown_internal: export(&library, b"VR_ShutdownInternal\0"),
                init_error_as_english_description: export(&library, b"VR_GetVRInitErrorAsEnglishDescription\0"),
                init_error_as_symbol: export(&library, b"VR_GetVRInitErrorAsSymbol\0"),
                is_hmd_present: export(&library, b"VR_IsHmdPresent\0"),
                is_runtime_installed: export(&library, b"VR_IsRuntimeInstalled\0"),
                get_runtime_path: export(&library, b"VR_GetRuntimePath\0"),
                string_for_hmd_error: export(&library, b"VR_GetStringForHmdError\0"),
                get_generic_interface: export(&library, b"VR_GetGenericInterface\0"),
                is_interface_version_valid: export(&library, b"VR_IsInterfaceVersionValid\0"),
                get_init_token: export(&library, b"VR_GetInitToken\0"),
            }
        };

        if exports.get_generic_interface.is_none() {
            return Err(HostError::FunctionUnavailable("VR_GetGenericInterface".to_string()));
        }
        tracing::debug!(resolved = exports.resolved_count(), "Real OpenVR exports resolved");
        Ok(Self {
            exports,
            _library: Some(library),
        })
    }

    /// Use exports that are already linked into the process.
    ///
    /// # Safety
    ///
    /// Every function in `exports` must honour the `openvr_api` contract for
    /// as long as the returned value is in use.
    pub unsafe fn from_exports(exports: RealExports) -> Self {
        Self {
            exports,
            _library: None,
        }
    }

    /// The resolved exports.
    pub fn exports(&self) -> &RealExports {
        &self.exports
    }
}

/// # Safety
///
/// `T` must be the exact function pointer type of the exported symbol.
unsafe fn export<T: Copy>(library: &Library, name: &[u8]) -> Option<T> {
    // SAFETY: forwarded to the caller.
    match unsafe { library.get::<T>(name) } {
        Ok(symbol) => Some(*symbol),
        Err(_) => {
            tracing::debug!(symbol = %String::from_utf8_lossy(name).trim_end_matches('\0'), "Real export missing");
            None
        }
    }
}
