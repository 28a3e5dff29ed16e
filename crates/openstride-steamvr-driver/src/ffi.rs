//! `#[repr(C)]` mirrors of the `openvr_driver` types the driver touches.
//!
//! Only the slots and structs the driver calls or fills are mirrored. Host
//! interfaces are C++ objects: the first word is the vtable pointer and every
//! method takes `this` first, which on x64 is the C ABI.
#![allow(missing_docs)]

use std::ffi::{c_char, c_void};

pub type TrackedDeviceIndex = u32;
pub type PropertyContainerHandle = u64;
pub type VRInputComponentHandle = u64;
pub type EVRInitError = i32;
pub type EVRInputError = i32;
pub type EVRSettingsError = i32;
pub type ETrackedPropertyError = i32;
pub type ETrackedDeviceProperty = i32;

pub const VR_INIT_ERROR_NONE: EVRInitError = 0;
pub const VR_INIT_ERROR_INTERFACE_NOT_FOUND: EVRInitError = 105;
pub const VR_INIT_ERROR_DRIVER_FAILED: EVRInitError = 200;
pub const VR_INPUT_ERROR_NONE: EVRInputError = 0;
pub const VR_SETTINGS_ERROR_NONE: EVRSettingsError = 0;
pub const TRACKED_PROP_SUCCESS: ETrackedPropertyError = 0;

pub const TRACKED_DEVICE_INDEX_INVALID: TrackedDeviceIndex = u32::MAX;
pub const INVALID_INPUT_COMPONENT_HANDLE: VRInputComponentHandle = 0;
/// The HMD is always device 0.
pub const HMD_DEVICE_INDEX: usize = 0;

/// `ETrackedDeviceClass`
pub const TRACKED_DEVICE_CLASS_CONTROLLER: i32 = 2;
pub const TRACKED_DEVICE_CLASS_GENERIC_TRACKER: i32 = 3;

/// `ETrackedControllerRole`
pub const CONTROLLER_ROLE_INVALID: i32 = 0;
pub const CONTROLLER_ROLE_TREADMILL: i32 = 4;

/// `EVRControllerAxisType::k_eControllerAxis_None`
pub const CONTROLLER_AXIS_NONE: i32 = 0;

/// `ETrackingResult::TrackingResult_Running_OK`
pub const TRACKING_RESULT_RUNNING_OK: i32 = 200;

/// `EVRScalarType` / `EVRScalarUnits`
pub const SCALAR_TYPE_RELATIVE: i32 = 1;
pub const SCALAR_UNITS_NORMALIZED_TWO_SIDED: i32 = 1;

/// `PropertyTypeTag_t` values.
pub const FLOAT_PROPERTY_TAG: u32 = 1;
pub const INT32_PROPERTY_TAG: u32 = 2;
pub const BOOL_PROPERTY_TAG: u32 = 4;
pub const STRING_PROPERTY_TAG: u32 = 5;
/// `EPropertyWriteType::PropertyWrite_Set`
pub const PROPERTY_WRITE_SET: i32 = 0;

/// `ETrackedDeviceProperty` values used by the two devices.
pub mod prop {
    use super::ETrackedDeviceProperty;

    pub const TRACKING_SYSTEM_NAME_STRING: ETrackedDeviceProperty = 1000;
    pub const MODEL_NUMBER_STRING: ETrackedDeviceProperty = 1001;
    pub const SERIAL_NUMBER_STRING: ETrackedDeviceProperty = 1002;
    pub const RENDER_MODEL_NAME_STRING: ETrackedDeviceProperty = 1003;
    pub const WILL_DRIFT_IN_YAW_BOOL: ETrackedDeviceProperty = 1004;
    pub const MANUFACTURER_NAME_STRING: ETrackedDeviceProperty = 1005;
    pub const DEVICE_IS_WIRELESS_BOOL: ETrackedDeviceProperty = 1010;
    pub const DEVICE_IS_CHARGING_BOOL: ETrackedDeviceProperty = 1011;
    pub const DEVICE_BATTERY_PERCENTAGE_FLOAT: ETrackedDeviceProperty = 1012;
    pub const DEVICE_CLASS_INT32: ETrackedDeviceProperty = 1029;
    pub const INPUT_PROFILE_PATH_STRING: ETrackedDeviceProperty = 1037;
    pub const IDENTIFIABLE_BOOL: ETrackedDeviceProperty = 1043;
    pub const AXIS0_TYPE_INT32: ETrackedDeviceProperty = 3002;
    pub const CONTROLLER_ROLE_HINT_INT32: ETrackedDeviceProperty = 3007;
    pub const NAMED_ICON_PATH_DEVICE_OFF_STRING: ETrackedDeviceProperty = 5001;
    pub const NAMED_ICON_PATH_DEVICE_SEARCHING_STRING: ETrackedDeviceProperty = 5002;
    pub const NAMED_ICON_PATH_DEVICE_SEARCHING_ALERT_STRING: ETrackedDeviceProperty = 5003;
    pub const NAMED_ICON_PATH_DEVICE_READY_STRING: ETrackedDeviceProperty = 5004;
    pub const NAMED_ICON_PATH_DEVICE_READY_ALERT_STRING: ETrackedDeviceProperty = 5005;
    pub const NAMED_ICON_PATH_DEVICE_NOT_READY_STRING: ETrackedDeviceProperty = 5006;
    pub const NAMED_ICON_PATH_DEVICE_STANDBY_STRING: ETrackedDeviceProperty = 5007;
    pub const NAMED_ICON_PATH_DEVICE_ALERT_LOW_STRING: ETrackedDeviceProperty = 5008;
    pub const HAS_DISPLAY_COMPONENT_BOOL: ETrackedDeviceProperty = 6002;
    pub const HAS_CAMERA_COMPONENT_BOOL: ETrackedDeviceProperty = 6004;
    pub const HAS_DRIVER_DIRECT_MODE_COMPONENT_BOOL: ETrackedDeviceProperty = 6005;
    pub const HAS_VIRTUAL_DISPLAY_COMPONENT_BOOL: ETrackedDeviceProperty = 6006;
    pub const CONTROLLER_TYPE_STRING: ETrackedDeviceProperty = 7000;
}

/// Interface versions this driver is built against.
pub const SERVER_TRACKED_DEVICE_PROVIDER_VERSION: &str = "IServerTrackedDeviceProvider_004";
pub const TRACKED_DEVICE_SERVER_DRIVER_VERSION: &str = "ITrackedDeviceServerDriver_005";
pub const SETTINGS_VERSION: &str = "IVRSettings_003";
pub const SERVER_DRIVER_HOST_VERSION: &str = "IVRServerDriverHost_006";
pub const PROPERTIES_VERSION: &str = "IVRProperties_001";
pub const DRIVER_INPUT_VERSION: &str = "IVRDriverInput_003";
pub const DRIVER_LOG_VERSION: &str = "IVRDriverLog_001";

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HmdQuaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl HmdQuaternion {
    pub const IDENTITY: Self = Self {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
}

impl Default for HmdQuaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// `DriverPose_t`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriverPose {
    pub pose_time_offset: f64,
    pub world_from_driver_rotation: HmdQuaternion,
    pub world_from_driver_translation: [f64; 3],
    pub driver_from_head_rotation: HmdQuaternion,
    pub driver_from_head_translation: [f64; 3],
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub acceleration: [f64; 3],
    pub rotation: HmdQuaternion,
    pub angular_velocity: [f64; 3],
    pub angular_acceleration: [f64; 3],
    pub result: i32,
    pub pose_is_valid: bool,
    pub will_drift_in_yaw: bool,
    pub should_apply_head_model: bool,
    pub device_is_connected: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HmdMatrix34 {
    pub m: [[f32; 4]; 3],
}

/// `TrackedDevicePose_t`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackedDevicePose {
    pub device_to_absolute_tracking: HmdMatrix34,
    pub velocity: [f32; 3],
    pub angular_velocity: [f32; 3],
    pub tracking_result: i32,
    pub pose_is_valid: bool,
    pub device_is_connected: bool,
}

/// `PropertyWrite_t`
#[cfg_attr(windows, repr(C))]
#[cfg_attr(not(windows), repr(C, packed(4)))]
#[derive(Debug, Clone, Copy)]
pub struct PropertyWrite {
    pub prop: ETrackedDeviceProperty,
    pub write_type: i32,
    pub set_error: ETrackedPropertyError,
    pub buffer: *mut c_void,
    pub buffer_size: u32,
    pub tag: u32,
    pub error: ETrackedPropertyError,
}

// Host interface methods, `this` first.
pub type PfnContextGetGenericInterface =
    unsafe extern "C" fn(this: *mut c_void, version: *const c_char, error: *mut EVRInitError) -> *mut c_void;

pub type PfnSettingsGetBool = unsafe extern "C" fn(
    this: *mut c_void,
    section: *const c_char,
    key: *const c_char,
    error: *mut EVRSettingsError,
) -> bool;
pub type PfnSettingsGetFloat = unsafe extern "C" fn(
    this: *mut c_void,
    section: *const c_char,
    key: *const c_char,
    error: *mut EVRSettingsError,
) -> f32;
pub type PfnSettingsGetString = unsafe extern "C" fn(
    this: *mut c_void,
    section: *const c_char,
    key: *const c_char,
    value: *mut c_char,
    value_len: u32,
    error: *mut EVRSettingsError,
);

pub type PfnTrackedDeviceAdded =
    unsafe extern "C" fn(this: *mut c_void, serial: *const c_char, class: i32, driver: *mut c_void) -> bool;
pub type PfnTrackedDevicePoseUpdated =
    unsafe extern "C" fn(this: *mut c_void, device: TrackedDeviceIndex, pose: *const DriverPose, pose_size: u32);
pub type PfnGetRawTrackedDevicePoses =
    unsafe extern "C" fn(this: *mut c_void, predicted_seconds: f32, poses: *mut TrackedDevicePose, count: u32);

pub type PfnWritePropertyBatch = unsafe extern "C" fn(
    this: *mut c_void,
    container: PropertyContainerHandle,
    batch: *mut PropertyWrite,
    count: u32,
) -> ETrackedPropertyError;
pub type PfnTrackedDeviceToPropertyContainer =
    unsafe extern "C" fn(this: *mut c_void, device: TrackedDeviceIndex) -> PropertyContainerHandle;

pub type PfnCreateScalarComponent = unsafe extern "C" fn(
    this: *mut c_void,
    container: PropertyContainerHandle,
    name: *const c_char,
    handle: *mut VRInputComponentHandle,
    scalar_type: i32,
    units: i32,
) -> EVRInputError;
pub type PfnUpdateScalarComponent = unsafe extern "C" fn(
    this: *mut c_void,
    handle: VRInputComponentHandle,
    value: f32,
    time_offset: f64,
) -> EVRInputError;

pub type PfnDriverLog = unsafe extern "C" fn(this: *mut c_void, message: *const c_char);

/// Vtable slots of the host interfaces.
pub mod slot {
    pub const CONTEXT_GET_GENERIC_INTERFACE: usize = 0;

    pub const SETTINGS_GET_BOOL: usize = 5;
    pub const SETTINGS_GET_FLOAT: usize = 7;
    pub const SETTINGS_GET_STRING: usize = 8;

    pub const HOST_TRACKED_DEVICE_ADDED: usize = 0;
    pub const HOST_TRACKED_DEVICE_POSE_UPDATED: usize = 1;
    pub const HOST_GET_RAW_TRACKED_DEVICE_POSES: usize = 6;

    pub const PROPERTIES_WRITE_BATCH: usize = 1;
    pub const PROPERTIES_TRACKED_DEVICE_TO_CONTAINER: usize = 3;

    pub const INPUT_CREATE_SCALAR: usize = 2;
    pub const INPUT_UPDATE_SCALAR: usize = 3;

    pub const LOG_LOG: usize = 0;
}

// Vtables of the objects handed to the host.

#[repr(C)]
#[derive(Debug)]
pub struct ServerTrackedDeviceProviderVtable {
    pub init: unsafe extern "C" fn(this: *mut c_void, context: *mut c_void) -> EVRInitError,
    pub cleanup: unsafe extern "C" fn(this: *mut c_void),
    pub get_interface_versions: unsafe extern "C" fn(this: *mut c_void) -> *const *const c_char,
    pub run_frame: unsafe extern "C" fn(this: *mut c_void),
    pub should_block_standby_mode: unsafe extern "C" fn(this: *mut c_void) -> bool,
    pub enter_standby: unsafe extern "C" fn(this: *mut c_void),
    pub leave_standby: unsafe extern "C" fn(this: *mut c_void),
}

/// `GetPose` returns `DriverPose_t` by value through a hidden pointer. MSVC
/// passes it after `this`, the Itanium ABI before.
#[cfg(windows)]
pub type PfnGetPose = unsafe extern "C" fn(this: *mut c_void, out: *mut DriverPose) -> *mut DriverPose;
#[cfg(not(windows))]
pub type PfnGetPose = unsafe extern "C" fn(out: *mut DriverPose, this: *mut c_void) -> *mut DriverPose;

#[repr(C)]
#[derive(Debug)]
pub struct TrackedDeviceServerDriverVtable {
    pub activate: unsafe extern "C" fn(this: *mut c_void, device: TrackedDeviceIndex) -> EVRInitError,
    pub deactivate: unsafe extern "C" fn(this: *mut c_void),
    pub enter_standby: unsafe extern "C" fn(this: *mut c_void),
    pub get_component: unsafe extern "C" fn(this: *mut c_void, name_and_version: *const c_char) -> *mut c_void,
    pub debug_request:
        unsafe extern "C" fn(this: *mut c_void, request: *const c_char, response: *mut c_char, response_size: u32),
    pub get_pose: PfnGetPose,
}

/// A C++ object whose only state is its vtable pointer.
#[repr(C)]
#[derive(Debug)]
pub struct VtableObject<V: 'static> {
    pub vtable: &'static V,
}

/// `size_of::<T>()` as the `u32` the host APIs take.
pub fn size_u32<T>() -> u32 {
    u32::try_from(size_of::<T>()).unwrap_or(u32::MAX)
}
