//! The exported `openvr_api` surface and the vtable replacements.
//!
//! The host loads this module as `openvr_api.dll`. Every export forwards to
//! the real library; only `VR_GetGenericInterface` adds behavior.

use std::ffi::{c_char, c_int, c_void};
use std::path::PathBuf;

use openstride_runtime::{RuntimeOptions, ffi_guard, module_dir_of};

use crate::ffi::{
    EVRInitError, EVRInputError, InputAnalogActionData, PfnGetActionHandle, PfnGetAnalogActionData,
    PfnGetControllerState, PfnGetControllerStateWithPose, TrackedDeviceIndex, VR_INPUT_ERROR_INVALID_HANDLE,
    VRActionHandle, VRControllerState, VRInputValueHandle,
};
use crate::interface::Overrides;
use crate::library::REAL_LIBRARY_NAME;
use crate::wrapper::{OpenVrWrapper, UNKNOWN_ERROR, UNKNOWN_ERROR_SYMBOL};

/// Config file read from the wrapper's directory.
pub const CONFIG_FILE_NAME: &str = "treadmill_config.json";
/// Log file written to the wrapper's directory.
pub const LOG_FILE_NAME: &str = "treadmill_wrapper.log";
/// Vendor module looked for in the wrapper's directory.
pub const VENDOR_MODULE_NAME: &str = "OmniBridge.dll";

/// The process-wide wrapper.
pub static WRAPPER: OpenVrWrapper = OpenVrWrapper::new(default_options, default_library_path);

fn module_dir() -> PathBuf {
    module_dir_of((&raw const WRAPPER).cast::<c_void>())
}

fn default_options() -> RuntimeOptions {
    let dir = module_dir();
    RuntimeOptions::new("openvr-wrapper")
        .with_config_file(dir.join(CONFIG_FILE_NAME))
        .with_log_file(dir.join(LOG_FILE_NAME))
        .with_module_path(dir.join(VENDOR_MODULE_NAME))
}

fn default_library_path() -> PathBuf {
    module_dir().join(REAL_LIBRARY_NAME)
}

/// Entries installed into patched vtables.
pub fn overrides() -> Overrides {
    let get_controller_state: PfnGetControllerState = wrapped_get_controller_state;
    let get_controller_state_with_pose: PfnGetControllerStateWithPose = wrapped_get_controller_state_with_pose;
    let get_action_handle: PfnGetActionHandle = wrapped_get_action_handle;
    let get_analog_action_data: PfnGetAnalogActionData = wrapped_get_analog_action_data;
    Overrides {
        system: [
            get_controller_state as *const c_void,
            get_controller_state_with_pose as *const c_void,
        ],
        input: [get_action_handle as *const c_void, get_analog_action_data as *const c_void],
    }
}

/// `VR_InitInternal`
///
/// # Safety
///
/// `error` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn VR_InitInternal(error: *mut EVRInitError, application_type: c_int) -> *mut c_void {
    ffi_guard(
        "VR_InitInternal",
        std::ptr::null_mut(),
        // SAFETY: forwarded from the caller.
        || unsafe { WRAPPER.init_internal(error, application_type) },
    )
}

/// `VR_InitInternal2`
///
/// # Safety
///
/// `error` must be null or writable and `startup_info` null or a C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn VR_InitInternal2(
    error: *mut EVRInitError,
    application_type: c_int,
    startup_info: *const c_char,
) -> *mut c_void {
    ffi_guard(
        "VR_InitInternal2",
        std::ptr::null_mut(),
        // SAFETY: forwarded from the caller.
        || unsafe { WRAPPER.init_internal2(error, application_type, startup_info) },
    )
}

/// `VR_ShutdownInternal`
#[unsafe(no_mangle)]
pub extern "C" fn VR_ShutdownInternal() {
    ffi_guard("VR_ShutdownInternal", (), || WRAPPER.shutdown_internal());
}

/// `VR_GetVRInitErrorAsEnglishDescription`
#[unsafe(no_mangle)]
pub extern "C" fn VR_GetVRInitErrorAsEnglishDescription(error: c_int) -> *const c_char {
    ffi_guard("VR_GetVRInitErrorAsEnglishDescription", UNKNOWN_ERROR.as_ptr(), || {
        WRAPPER.init_error_as_english_description(error)
    })
}

/// `VR_GetVRInitErrorAsSymbol`
#[unsafe(no_mangle)]
pub extern "C" fn VR_GetVRInitErrorAsSymbol(error: c_int) -> *const c_char {
    ffi_guard("VR_GetVRInitErrorAsSymbol", UNKNOWN_ERROR_SYMBOL.as_ptr(), || {
        WRAPPER.init_error_as_symbol(error)
    })
}

/// `VR_GetStringForHmdError`
#[unsafe(no_mangle)]
pub extern "C" fn VR_GetStringForHmdError(error: c_int) -> *const c_char {
    ffi_guard("VR_GetStringForHmdError", UNKNOWN_ERROR.as_ptr(), || {
        WRAPPER.string_for_hmd_error(error)
    })
}

/// `VR_IsHmdPresent`
#[unsafe(no_mangle)]
pub extern "C" fn VR_IsHmdPresent() -> bool {
    ffi_guard("VR_IsHmdPresent", false, || WRAPPER.is_hmd_present())
}

/// `VR_IsRuntimeInstalled`
#[unsafe(no_mangle)]
pub extern "C" fn VR_IsRuntimeInstalled() -> bool {
    ffi_guard("VR_IsRuntimeInstalled", false, || WRAPPER.is_runtime_installed())
}

/// `VR_GetRuntimePath`
///
/// # Safety
///
/// Buffers as the OpenVR contract requires.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn VR_GetRuntimePath(buffer: *mut c_char, buffer_size: u32, required_size: *mut u32) -> bool {
    ffi_guard(
        "VR_GetRuntimePath",
        false,
        // SAFETY: forwarded from the caller.
        || unsafe { WRAPPER.get_runtime_path(buffer, buffer_size, required_size) },
    )
}

/// `VR_GetGenericInterface`
///
/// # Safety
///
/// `version` must be null or a C string and `error` null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn VR_GetGenericInterface(version: *const c_char, error: *mut EVRInitError) -> *mut c_void {
    ffi_guard(
        "VR_GetGenericInterface",
        std::ptr::null_mut(),
        // SAFETY: forwarded from the caller.
        || unsafe { WRAPPER.get_generic_interface(version, error, &overrides()) },
    )
}

/// `VR_IsInterfaceVersionValid`
///
/// # Safety
///
/// `version` must be null or a C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn VR_IsInterfaceVersionValid(version: *const c_char) -> bool {
    ffi_guard(
        "VR_IsInterfaceVersionValid",
        false,
        // SAFETY: forwarded from the caller.
        || unsafe { WRAPPER.is_interface_version_valid(version) },
    )
}

/// `VR_GetInitToken`
#[unsafe(no_mangle)]
pub extern "C" fn VR_GetInitToken() -> u32 {
    ffi_guard("VR_GetInitToken", 0, || WRAPPER.get_init_token())
}

unsafe extern "C" fn wrapped_get_action_handle(
    this: *mut c_void,
    name: *const c_char,
    handle: *mut VRActionHandle,
) -> EVRInputError {
    ffi_guard("IVRInput::GetActionHandle", VR_INPUT_ERROR_INVALID_HANDLE, || {
        // SAFETY: host arguments, forwarded.
        unsafe { WRAPPER.input_get_action_handle(this, name, handle) }
    })
}

unsafe extern "C" fn wrapped_get_analog_action_data(
    this: *mut c_void,
    action: VRActionHandle,
    data: *mut InputAnalogActionData,
    data_size: u32,
    restrict_to_device: VRInputValueHandle,
) -> EVRInputError {
    ffi_guard("IVRInput::GetAnalogActionData", VR_INPUT_ERROR_INVALID_HANDLE, || {
        // SAFETY: host arguments, forwarded.
        unsafe { WRAPPER.input_get_analog_action_data(this, action, data, data_size, restrict_to_device) }
    })
}

unsafe extern "C" fn wrapped_get_controller_state(
    this: *mut c_void,
    device: TrackedDeviceIndex,
    state: *mut VRControllerState,
    state_size: u32,
) -> bool {
    ffi_guard("IVRSystem::GetControllerState", false, || {
        // SAFETY: host arguments, forwarded.
        unsafe { WRAPPER.system_get_controller_state(this, device, state, state_size) }
    })
}

unsafe extern "C" fn wrapped_get_controller_state_with_pose(
    this: *mut c_void,
    origin: c_int,
    device: TrackedDeviceIndex,
    state: *mut VRControllerState,
    state_size: u32,
    pose: *mut c_void,
) -> bool {
    ffi_guard("IVRSystem::GetControllerStateWithPose", false, || {
        // SAFETY: host arguments, forwarded.
        unsafe { WRAPPER.system_get_controller_state_with_pose(this, origin, device, state, state_size, pose) }
    })
}

#[cfg(windows)]
mod dll {
    use std::ffi::c_void;

    const DLL_PROCESS_DETACH: u32 = 0;

    /// Tear the runtime down when the wrapper is unloaded with `FreeLibrary`.
    #[unsafe(no_mangle)]
    extern "system" fn DllMain(_module: *mut c_void, reason: u32, reserved: *mut c_void) -> i32 {
        if reason == DLL_PROCESS_DETACH && reserved.is_null() {
            openstride_runtime::ffi_guard("DllMain", (), || super::WRAPPER.shutdown());
        }
        1
    }
}
