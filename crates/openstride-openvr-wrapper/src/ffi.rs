//! `#[repr(C)]` mirrors of the OpenVR types the wrapper touches.
//!
//! Only the pieces needed to forward the `VR_*` exports and to read or
//! write the two wrapped interfaces are mirrored. OpenVR packs its structs
//! to 8 bytes on Windows and to 4 bytes elsewhere.
#![allow(missing_docs)]

use std::ffi::{c_char, c_int, c_void};

pub type VRActionHandle = u64;
pub type VRInputValueHandle = u64;
pub type TrackedDeviceIndex = u32;
pub type EVRInputError = c_int;
pub type EVRInitError = c_int;

pub const VR_INPUT_ERROR_NONE: EVRInputError = 0;
pub const VR_INPUT_ERROR_INVALID_HANDLE: EVRInputError = 3;

/// `VRInitError_Init_InstallationNotFound`
pub const VR_INIT_ERROR_INSTALLATION_NOT_FOUND: EVRInitError = 110;

/// `IVRInput` vtable slots.
pub const IVR_INPUT_GET_ACTION_HANDLE: usize = 2;
pub const IVR_INPUT_GET_ANALOG_ACTION_DATA: usize = 6;

/// `IVRSystem` vtable slots.
pub const IVR_SYSTEM_GET_CONTROLLER_STATE: usize = 34;
pub const IVR_SYSTEM_GET_CONTROLLER_STATE_WITH_POSE: usize = 35;

/// Entries copied from the real vtables. Both cover every method of the
/// current interface versions.
pub const IVR_INPUT_VTABLE_LEN: usize = 64;
pub const IVR_SYSTEM_VTABLE_LEN: usize = 128;

/// `k_unControllerStateAxisCount`
pub const CONTROLLER_STATE_AXIS_COUNT: usize = 5;
/// `k_EControllerAxis_Joystick`
pub const JOYSTICK_AXIS: usize = 0;

#[cfg_attr(windows, repr(C))]
#[cfg_attr(not(windows), repr(C, packed(4)))]
#[derive(Debug, Clone, Copy, Default)]
pub struct InputAnalogActionData {
    pub b_active: bool,
    pub active_origin: VRInputValueHandle,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub delta_x: f32,
    pub delta_y: f32,
    pub delta_z: f32,
    pub update_time: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VRControllerAxis {
    pub x: f32,
    pub y: f32,
}

/// `VRControllerState001_t`
#[cfg_attr(windows, repr(C))]
#[cfg_attr(not(windows), repr(C, packed(4)))]
#[derive(Debug, Clone, Copy, Default)]
pub struct VRControllerState {
    pub packet_num: u32,
    pub button_pressed: u64,
    pub button_touched: u64,
    pub axis: [VRControllerAxis; CONTROLLER_STATE_AXIS_COUNT],
}

// Wrapped interface methods. The C++ `this` pointer comes first; these are
// the x64 calling conventions, where member functions use the C ABI.
pub type PfnGetActionHandle =
    unsafe extern "C" fn(this: *mut c_void, name: *const c_char, handle: *mut VRActionHandle) -> EVRInputError;
pub type PfnGetAnalogActionData = unsafe extern "C" fn(
    this: *mut c_void,
    action: VRActionHandle,
    data: *mut InputAnalogActionData,
    data_size: u32,
    restrict_to_device: VRInputValueHandle,
) -> EVRInputError;
pub type PfnGetControllerState = unsafe extern "C" fn(
    this: *mut c_void,
    device: TrackedDeviceIndex,
    state: *mut VRControllerState,
    state_size: u32,
) -> bool;
pub type PfnGetControllerStateWithPose = unsafe extern "C" fn(
    this: *mut c_void,
    origin: c_int,
    device: TrackedDeviceIndex,
    state: *mut VRControllerState,
    state_size: u32,
    pose: *mut c_void,
) -> bool;

// `openvr_api` exports.
pub type PfnInitInternal = unsafe extern "C" fn(error: *mut EVRInitError, application_type: c_int) -> *mut c_void;
pub type PfnInitInternal2 = unsafe extern "C" fn(
    error: *mut EVRInitError,
    application_type: c_int,
    startup_info: *const c_char,
) -> *mut c_void;
pub type PfnShutdownInternal = unsafe extern "C" fn();
pub type PfnErrorString = unsafe extern "C" fn(error: c_int) -> *const c_char;
pub type PfnBoolQuery = unsafe extern "C" fn() -> bool;
pub type PfnGetRuntimePath =
    unsafe extern "C" fn(buffer: *mut c_char, buffer_size: u32, required_size: *mut u32) -> bool;
pub type PfnGetGenericInterface =
    unsafe extern "C" fn(interface_version: *const c_char, error: *mut EVRInitError) -> *mut c_void;
pub type PfnIsInterfaceVersionValid = unsafe extern "C" fn(interface_version: *const c_char) -> bool;
pub type PfnGetInitToken = unsafe extern "C" fn() -> u32;

/// Whether a host-declared struct size covers `T`.
pub fn size_covers<T>(declared: u32) -> bool {
    usize::try_from(declared).is_ok_and(|declared| declared >= size_of::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_covers() {
        let size = u32::try_from(size_of::<VRControllerState>()).unwrap_or(u32::MAX);
        assert!(size_covers::<VRControllerState>(size));
        assert!(!size_covers::<VRControllerState>(size - 1));
    }

    #[cfg(all(windows, target_pointer_width = "64"))]
    #[test]
    fn test_windows_layout() {
        assert_eq!(size_of::<VRControllerState>(), 64);
        assert_eq!(size_of::<InputAnalogActionData>(), 48);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_packed_layout() {
        assert_eq!(size_of::<VRControllerState>(), 60);
        assert_eq!(size_of::<InputAnalogActionData>(), 40);
    }
}
