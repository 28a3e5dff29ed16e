//! `HmdDriverFactory` and the C++ objects handed to SteamVR.
//!
//! The provider and both devices are statics whose first word points at a
//! static vtable of `extern "C"` trampolines. Every trampoline forwards to
//! [`DRIVER`] inside [`ffi_guard`].

use std::ffi::{CStr, c_char, c_int, c_void};
use std::path::PathBuf;
use std::sync::Arc;

use openstride_runtime::{RuntimeOptions, ffi_guard, module_dir_of};

use crate::debug_request::write_response;
use crate::driver::{DeviceObjects, TreadmillDriver};
use crate::ffi::{
    DriverPose, EVRInitError, SERVER_TRACKED_DEVICE_PROVIDER_VERSION, ServerTrackedDeviceProviderVtable,
    TrackedDeviceIndex, TrackedDeviceServerDriverVtable, VR_INIT_ERROR_DRIVER_FAILED,
    VR_INIT_ERROR_INTERFACE_NOT_FOUND, VtableObject,
};
use crate::host::ContextHost;
use crate::settings::DriverSettings;

/// Log file written to the driver's directory.
pub const LOG_FILE_NAME: &str = "treadmill_driver.log";
/// Vendor module looked for next to the driver when settings name none.
pub const VENDOR_MODULE_NAME: &str = "OmniBridge.dll";

/// The process-wide driver.
pub static DRIVER: TreadmillDriver = TreadmillDriver::new(default_options);

fn module_dir() -> PathBuf {
    module_dir_of((&raw const DRIVER).cast::<c_void>())
}

fn default_options(settings: &DriverSettings) -> RuntimeOptions {
    let dir = module_dir();
    let module_path = settings
        .omnibridge_dll_path
        .clone()
        .unwrap_or_else(|| dir.join(VENDOR_MODULE_NAME));
    RuntimeOptions::new("steamvr-driver")
        .with_config(settings.runtime_config())
        .with_log_file(dir.join(LOG_FILE_NAME))
        .with_module_path(module_path)
}

static PROVIDER_VTABLE: ServerTrackedDeviceProviderVtable = ServerTrackedDeviceProviderVtable {
    init: provider_init,
    cleanup: provider_cleanup,
    get_interface_versions: provider_get_interface_versions,
    run_frame: provider_run_frame,
    should_block_standby_mode: provider_should_block_standby_mode,
    enter_standby: provider_enter_standby,
    leave_standby: provider_leave_standby,
};

static CONTROLLER_VTABLE: TrackedDeviceServerDriverVtable = TrackedDeviceServerDriverVtable {
    activate: controller_activate,
    deactivate: controller_deactivate,
    enter_standby: device_enter_standby,
    get_component: device_get_component,
    debug_request: controller_debug_request,
    get_pose: controller_get_pose,
};

static TRACKER_VTABLE: TrackedDeviceServerDriverVtable = TrackedDeviceServerDriverVtable {
    activate: tracker_activate,
    deactivate: tracker_deactivate,
    enter_standby: device_enter_standby,
    get_component: device_get_component,
    debug_request: tracker_debug_request,
    get_pose: tracker_get_pose,
};

/// `IServerTrackedDeviceProvider` returned by [`HmdDriverFactory`].
pub static PROVIDER: VtableObject<ServerTrackedDeviceProviderVtable> = VtableObject {
    vtable: &PROVIDER_VTABLE,
};
/// `ITrackedDeviceServerDriver` of the treadmill controller.
pub static CONTROLLER_OBJECT: VtableObject<TrackedDeviceServerDriverVtable> = VtableObject {
    vtable: &CONTROLLER_VTABLE,
};
/// `ITrackedDeviceServerDriver` of the visual tracker.
pub static TRACKER_OBJECT: VtableObject<TrackedDeviceServerDriverVtable> = VtableObject {
    vtable: &TRACKER_VTABLE,
};

struct InterfaceVersions([*const c_char; 3]);

// SAFETY: the array only points at static, immutable C strings.
unsafe impl Sync for InterfaceVersions {}

static INTERFACE_VERSIONS: InterfaceVersions = InterfaceVersions([
    c"ITrackedDeviceServerDriver_005".as_ptr(),
    c"IServerTrackedDeviceProvider_004".as_ptr(),
    std::ptr::null(),
]);

fn object_ptr<V>(object: &'static VtableObject<V>) -> *mut c_void {
    std::ptr::from_ref(object).cast_mut().cast::<c_void>()
}

/// Raw pointer SteamVR holds for the provider.
pub fn provider_ptr() -> *mut c_void {
    object_ptr(&PROVIDER)
}

fn device_objects() -> DeviceObjects {
    DeviceObjects {
        controller: object_ptr(&CONTROLLER_OBJECT),
        tracker: object_ptr(&TRACKER_OBJECT),
    }
}

/// `HmdDriverFactory`: the one symbol SteamVR looks up in a driver.
///
/// # Safety
///
/// `interface_name` must be null or a C string and `return_code` null or
/// writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn HmdDriverFactory(interface_name: *const c_char, return_code: *mut c_int) -> *mut c_void {
    let set_code = |code: c_int| {
        if !return_code.is_null() {
            // SAFETY: the caller passes a writable slot or null.
            unsafe { return_code.write(code) };
        }
    };
    let provider = ffi_guard("HmdDriverFactory", None, || {
        if interface_name.is_null() {
            return Some(std::ptr::null_mut());
        }
        // SAFETY: non-null, and the caller passes a C string.
        let name = unsafe { CStr::from_ptr(interface_name) };
        if name.to_bytes() == SERVER_TRACKED_DEVICE_PROVIDER_VERSION.as_bytes() {
            tracing::debug!("HmdDriverFactory: provider requested");
            Some(provider_ptr())
        } else {
            tracing::debug!(interface = %name.to_string_lossy(), "HmdDriverFactory: interface not provided");
            Some(std::ptr::null_mut())
        }
    });
    match provider {
        Some(ptr) if !ptr.is_null() => ptr,
        Some(_) => {
            set_code(VR_INIT_ERROR_INTERFACE_NOT_FOUND);
            std::ptr::null_mut()
        }
        None => {
            set_code(VR_INIT_ERROR_DRIVER_FAILED);
            std::ptr::null_mut()
        }
    }
}

unsafe extern "C" fn provider_init(_this: *mut c_void, context: *mut c_void) -> EVRInitError {
    ffi_guard("IServerTrackedDeviceProvider::Init", VR_INIT_ERROR_DRIVER_FAILED, || {
        // SAFETY: SteamVR passes its live driver context.
        match unsafe { ContextHost::from_context(context) } {
            Ok(host) => DRIVER.init(Arc::new(host), device_objects()),
            Err(err) => {
                tracing::error!(error = %err, "Driver context unusable");
                VR_INIT_ERROR_DRIVER_FAILED
            }
        }
    })
}

unsafe extern "C" fn provider_cleanup(_this: *mut c_void) {
    ffi_guard("IServerTrackedDeviceProvider::Cleanup", (), || DRIVER.cleanup());
}

unsafe extern "C" fn provider_get_interface_versions(_this: *mut c_void) -> *const *const c_char {
    INTERFACE_VERSIONS.0.as_ptr()
}

unsafe extern "C" fn provider_run_frame(_this: *mut c_void) {
    ffi_guard("IServerTrackedDeviceProvider::RunFrame", (), || DRIVER.run_frame());
}

unsafe extern "C" fn provider_should_block_standby_mode(_this: *mut c_void) -> bool {
    false
}

unsafe extern "C" fn provider_enter_standby(_this: *mut c_void) {}

unsafe extern "C" fn provider_leave_standby(_this: *mut c_void) {}

unsafe extern "C" fn device_enter_standby(_this: *mut c_void) {}

unsafe extern "C" fn device_get_component(_this: *mut c_void, _name_and_version: *const c_char) -> *mut c_void {
    std::ptr::null_mut()
}

unsafe extern "C" fn controller_activate(_this: *mut c_void, object_id: TrackedDeviceIndex) -> EVRInitError {
    ffi_guard("TreadmillController::Activate", VR_INIT_ERROR_DRIVER_FAILED, || {
        DRIVER.activate_controller(object_id)
    })
}

unsafe extern "C" fn controller_deactivate(_this: *mut c_void) {
    ffi_guard("TreadmillController::Deactivate", (), || DRIVER.deactivate_controller());
}

unsafe extern "C" fn tracker_activate(_this: *mut c_void, object_id: TrackedDeviceIndex) -> EVRInitError {
    ffi_guard("VisualTracker::Activate", VR_INIT_ERROR_DRIVER_FAILED, || {
        DRIVER.activate_tracker(object_id)
    })
}

unsafe extern "C" fn tracker_deactivate(_this: *mut c_void) {
    ffi_guard("VisualTracker::Deactivate", (), || DRIVER.deactivate_tracker());
}

/// Read a request string; null reads as empty.
///
/// # Safety
///
/// `request` must be null or a C string.
unsafe fn request_text(request: *const c_char) -> String {
    if request.is_null() {
        return String::new();
    }
    // SAFETY: non-null, and the caller guarantees a C string.
    unsafe { CStr::from_ptr(request) }.to_string_lossy().into_owned()
}

unsafe extern "C" fn controller_debug_request(
    _this: *mut c_void,
    request: *const c_char,
    response: *mut c_char,
    response_size: u32,
) {
    ffi_guard("TreadmillController::DebugRequest", (), || {
        // SAFETY: SteamVR passes a C string.
        let request = unsafe { request_text(request) };
        let answer = DRIVER.controller_debug_request(&request);
        // SAFETY: SteamVR's buffer holds `response_size` bytes.
        unsafe { write_response(response, response_size, &answer) };
    });
}

unsafe extern "C" fn tracker_debug_request(
    _this: *mut c_void,
    request: *const c_char,
    response: *mut c_char,
    response_size: u32,
) {
    ffi_guard("VisualTracker::DebugRequest", (), || {
        // SAFETY: SteamVR passes a C string.
        let request = unsafe { request_text(request) };
        let answer = DRIVER.tracker_debug_request(&request);
        // SAFETY: SteamVR's buffer holds `response_size` bytes.
        unsafe { write_response(response, response_size, &answer) };
    });
}

/// Store `pose` in the caller's return slot.
///
/// # Safety
///
/// `out` must be writable for one [`DriverPose`].
unsafe fn return_pose(out: *mut DriverPose, pose: DriverPose) -> *mut DriverPose {
    // SAFETY: the caller provides the hidden return slot.
    unsafe { out.write(pose) };
    out
}

fn guarded_pose(entry: &'static str, pose: impl FnOnce() -> DriverPose) -> DriverPose {
    ffi_guard(entry, crate::devices::base_pose(), pose)
}

#[cfg(windows)]
unsafe extern "C" fn controller_get_pose(_this: *mut c_void, out: *mut DriverPose) -> *mut DriverPose {
    let pose = guarded_pose("TreadmillController::GetPose", || DRIVER.controller_pose());
    // SAFETY: MSVC passes the return slot after `this`.
    unsafe { return_pose(out, pose) }
}

#[cfg(not(windows))]
unsafe extern "C" fn controller_get_pose(out: *mut DriverPose, _this: *mut c_void) -> *mut DriverPose {
    let pose = guarded_pose("TreadmillController::GetPose", || DRIVER.controller_pose());
    // SAFETY: the Itanium ABI passes the return slot first.
    unsafe { return_pose(out, pose) }
}

#[cfg(windows)]
unsafe extern "C" fn tracker_get_pose(_this: *mut c_void, out: *mut DriverPose) -> *mut DriverPose {
    let pose = guarded_pose("VisualTracker::GetPose", || DRIVER.tracker_pose());
    // SAFETY: MSVC passes the return slot after `this`.
    unsafe { return_pose(out, pose) }
}

#[cfg(not(windows))]
unsafe extern "C" fn tracker_get_pose(out: *mut DriverPose, _this: *mut c_void) -> *mut DriverPose {
    let pose = guarded_pose("VisualTracker::GetPose", || DRIVER.tracker_pose());
    // SAFETY: the Itanium ABI passes the return slot first.
    unsafe { return_pose(out, pose) }
}

#[cfg(windows)]
mod dll {
    use std::ffi::c_void;

    const DLL_PROCESS_DETACH: u32 = 0;

    /// Shut the runtime down when SteamVR unloads the driver.
    #[unsafe(no_mangle)]
    extern "system" fn DllMain(_module: *mut c_void, reason: u32, reserved: *mut c_void) -> i32 {
        if reason == DLL_PROCESS_DETACH && reserved.is_null() {
            openstride_runtime::ffi_guard("DllMain", (), || super::DRIVER.runtime_slot().shutdown());
        }
        1
    }
}
