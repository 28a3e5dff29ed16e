//! Minimal `#[repr(C)]` mirrors of the OpenXR loader and action types.
//!
//! Only the structures the layer reads or writes are spelled out; everything
//! passed straight through is opaque. Field names follow the OpenXR headers.

#![allow(missing_docs)]

use std::ffi::{CStr, c_char, c_void};

/// `XrResult`
pub type XrResult = i32;
/// `XrBool32`
pub type XrBool32 = u32;
/// `XrTime`
pub type XrTime = i64;
/// `XrPath`
pub type XrPath = u64;
/// `XrVersion`
pub type XrVersion = u64;
/// `XrStructureType`
pub type XrStructureType = i32;

/// Success.
pub const XR_SUCCESS: XrResult = 0;
/// `XR_ERROR_VALIDATION_FAILURE`
pub const XR_ERROR_VALIDATION_FAILURE: XrResult = -1;
/// `XR_ERROR_RUNTIME_FAILURE`
pub const XR_ERROR_RUNTIME_FAILURE: XrResult = -2;
/// `XR_ERROR_INITIALIZATION_FAILED`
pub const XR_ERROR_INITIALIZATION_FAILED: XrResult = -6;
/// `XR_ERROR_FUNCTION_UNSUPPORTED`
pub const XR_ERROR_FUNCTION_UNSUPPORTED: XrResult = -7;
/// `XR_ERROR_HANDLE_INVALID`
pub const XR_ERROR_HANDLE_INVALID: XrResult = -12;

/// `XR_TRUE`
pub const XR_TRUE: XrBool32 = 1;
/// `XR_FALSE`
pub const XR_FALSE: XrBool32 = 0;

/// Loader interface version this layer speaks.
pub const LOADER_API_LAYER_VERSION: u32 = 1;
/// `XR_LOADER_INFO_STRUCT_VERSION`
pub const LOADER_INFO_STRUCT_VERSION: u32 = 1;
/// `XR_API_LAYER_INFO_STRUCT_VERSION`
pub const API_LAYER_INFO_STRUCT_VERSION: u32 = 1;

/// `XR_LOADER_INTERFACE_STRUCT_LOADER_INFO`
pub const STRUCT_LOADER_INFO: u32 = 1;
/// `XR_LOADER_INTERFACE_STRUCT_API_LAYER_REQUEST`
pub const STRUCT_API_LAYER_REQUEST: u32 = 2;
/// `XR_LOADER_INTERFACE_STRUCT_API_LAYER_CREATE_INFO`
pub const STRUCT_API_LAYER_CREATE_INFO: u32 = 4;
/// `XR_LOADER_INTERFACE_STRUCT_API_LAYER_NEXT_INFO`
pub const STRUCT_API_LAYER_NEXT_INFO: u32 = 5;

/// `XR_MAX_API_LAYER_NAME_SIZE`
pub const MAX_API_LAYER_NAME_SIZE: usize = 256;
/// `XR_API_LAYER_MAX_SETTINGS_PATH_SIZE`
pub const API_LAYER_MAX_SETTINGS_PATH_SIZE: usize = 512;
/// `XR_MAX_ACTION_SET_NAME_SIZE`
pub const MAX_ACTION_SET_NAME_SIZE: usize = 64;
/// `XR_MAX_ACTION_NAME_SIZE`
pub const MAX_ACTION_NAME_SIZE: usize = 64;
/// `XR_MAX_LOCALIZED_ACTION_SET_NAME_SIZE`
pub const MAX_LOCALIZED_ACTION_SET_NAME_SIZE: usize = 128;
/// `XR_MAX_LOCALIZED_ACTION_NAME_SIZE`
pub const MAX_LOCALIZED_ACTION_NAME_SIZE: usize = 128;

/// `XR_MAKE_VERSION`
pub const fn make_version(major: u64, minor: u64, patch: u64) -> XrVersion {
    ((major & 0xffff) << 48) | ((minor & 0xffff) << 32) | (patch & 0xffff_ffff)
}

/// API version the layer reports.
pub const LAYER_API_VERSION: XrVersion = make_version(1, 0, 0);

macro_rules! xr_handle {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[repr(transparent)]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
            pub struct $name(pub u64);

            impl $name {
                /// `XR_NULL_HANDLE`
                pub const NULL: Self = Self(0);
            }
        )*
    };
}

xr_handle! {
    /// `XrInstance`
    XrInstance;
    /// `XrSession`
    XrSession;
    /// `XrActionSet`
    XrActionSet;
    /// `XrAction`
    XrAction;
}

/// `PFN_xrVoidFunction`
pub type PfnVoidFunction = Option<unsafe extern "system" fn()>;

/// `PFN_xrGetInstanceProcAddr`
pub type PfnGetInstanceProcAddr =
    unsafe extern "system" fn(XrInstance, *const c_char, *mut PfnVoidFunction) -> XrResult;

/// `PFN_xrCreateApiLayerInstance`
pub type PfnCreateApiLayerInstance = unsafe extern "system" fn(
    *const XrInstanceCreateInfo,
    *const XrApiLayerCreateInfo,
    *mut XrInstance,
) -> XrResult;

/// `PFN_xrDestroyInstance`
pub type PfnDestroyInstance = unsafe extern "system" fn(XrInstance) -> XrResult;
/// `PFN_xrGetActionStateFloat`
pub type PfnGetActionStateFloat =
    unsafe extern "system" fn(XrSession, *const XrActionStateGetInfo, *mut XrActionStateFloat) -> XrResult;
/// `PFN_xrGetActionStateVector2f`
pub type PfnGetActionStateVector2f =
    unsafe extern "system" fn(XrSession, *const XrActionStateGetInfo, *mut XrActionStateVector2f) -> XrResult;
/// `PFN_xrSyncActions`
pub type PfnSyncActions = unsafe extern "system" fn(XrSession, *const XrActionsSyncInfo) -> XrResult;
/// `PFN_xrCreateActionSet`
pub type PfnCreateActionSet =
    unsafe extern "system" fn(XrInstance, *const XrActionSetCreateInfo, *mut XrActionSet) -> XrResult;
/// `PFN_xrCreateAction`
pub type PfnCreateAction =
    unsafe extern "system" fn(XrActionSet, *const XrActionCreateInfo, *mut XrAction) -> XrResult;

/// `XrNegotiateLoaderInfo`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrNegotiateLoaderInfo {
    pub struct_type: u32,
    pub struct_version: u32,
    pub struct_size: usize,
    pub min_interface_version: u32,
    pub max_interface_version: u32,
    pub min_api_version: XrVersion,
    pub max_api_version: XrVersion,
}

/// `XrNegotiateApiLayerRequest`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrNegotiateApiLayerRequest {
    pub struct_type: u32,
    pub struct_version: u32,
    pub struct_size: usize,
    pub layer_interface_version: u32,
    pub layer_api_version: XrVersion,
    pub get_instance_proc_addr: Option<PfnGetInstanceProcAddr>,
    pub create_api_layer_instance: Option<PfnCreateApiLayerInstance>,
}

/// `XrApiLayerNextInfo`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrApiLayerNextInfo {
    pub struct_type: u32,
    pub struct_version: u32,
    pub struct_size: usize,
    pub layer_name: [c_char; MAX_API_LAYER_NAME_SIZE],
    pub next_get_instance_proc_addr: Option<PfnGetInstanceProcAddr>,
    pub next_create_api_layer_instance: Option<PfnCreateApiLayerInstance>,
    pub next: *mut XrApiLayerNextInfo,
}

/// `XrApiLayerCreateInfo`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrApiLayerCreateInfo {
    pub struct_type: u32,
    pub struct_version: u32,
    pub struct_size: usize,
    pub loader_instance: *mut c_void,
    pub settings_file_location: [c_char; API_LAYER_MAX_SETTINGS_PATH_SIZE],
    pub next_info: *mut XrApiLayerNextInfo,
}

/// `XrInstanceCreateInfo`, passed through untouched.
#[repr(C)]
#[derive(Debug)]
pub struct XrInstanceCreateInfo {
    _opaque: [u8; 0],
}

/// `XrActionsSyncInfo`, passed through untouched.
#[repr(C)]
#[derive(Debug)]
pub struct XrActionsSyncInfo {
    _opaque: [u8; 0],
}

/// `XrActionStateGetInfo`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrActionStateGetInfo {
    pub ty: XrStructureType,
    pub next: *const c_void,
    pub action: XrAction,
    pub subaction_path: XrPath,
}

/// `XrActionStateFloat`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrActionStateFloat {
    pub ty: XrStructureType,
    pub next: *mut c_void,
    pub current_state: f32,
    pub changed_since_last_sync: XrBool32,
    pub last_change_time: XrTime,
    pub is_active: XrBool32,
}

/// `XrVector2f`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct XrVector2f {
    pub x: f32,
    pub y: f32,
}

/// `XrActionStateVector2f`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrActionStateVector2f {
    pub ty: XrStructureType,
    pub next: *mut c_void,
    pub current_state: XrVector2f,
    pub changed_since_last_sync: XrBool32,
    pub last_change_time: XrTime,
    pub is_active: XrBool32,
}

/// `XrActionSetCreateInfo`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrActionSetCreateInfo {
    pub ty: XrStructureType,
    pub next: *const c_void,
    pub action_set_name: [c_char; MAX_ACTION_SET_NAME_SIZE],
    pub localized_action_set_name: [c_char; MAX_LOCALIZED_ACTION_SET_NAME_SIZE],
    pub priority: u32,
}

/// `XrActionCreateInfo`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrActionCreateInfo {
    pub ty: XrStructureType,
    pub next: *const c_void,
    pub action_name: [c_char; MAX_ACTION_NAME_SIZE],
    pub action_type: i32,
    pub count_subaction_paths: u32,
    pub subaction_paths: *const XrPath,
    pub localized_action_name: [c_char; MAX_LOCALIZED_ACTION_NAME_SIZE],
}

/// Whether `result` is a success code.
#[inline]
pub fn succeeded(result: XrResult) -> bool {
    result >= 0
}

/// Read a fixed-size, NUL-terminated name field. An unterminated field is
/// read to its end.
pub fn fixed_name(field: &[c_char]) -> String {
    let bytes: Vec<u8> = field
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Copy `name` into a fixed-size field, truncating and NUL-terminating.
pub fn write_fixed_name(field: &mut [c_char], name: &str) {
    let capacity = field.len().saturating_sub(1);
    for (slot, byte) in field.iter_mut().zip(name.bytes().take(capacity).chain(std::iter::repeat(0))) {
        *slot = byte as c_char;
    }
}

/// Borrow a host-provided C string.
///
/// # Safety
///
/// `name` must be null or point to a NUL-terminated string that outlives the
/// returned borrow.
pub unsafe fn c_name<'a>(name: *const c_char) -> Option<&'a CStr> {
    if name.is_null() {
        None
    } else {
        // SAFETY: non-null and NUL-terminated per the caller's contract.
        Some(unsafe { CStr::from_ptr(name) })
    }
}
