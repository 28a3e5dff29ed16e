//! Exported entry points.
//!
//! The loader only ever calls `xrNegotiateLoaderApiLayerInterface` by name;
//! everything else is reached through the pointers handed back from it and
//! from `xrGetInstanceProcAddr`.

use std::ffi::{c_char, c_void};

use openstride_runtime::{RuntimeOptions, ffi_guard, module_dir_of};

use crate::ffi::{
    PfnCreateAction, PfnCreateActionSet, PfnDestroyInstance, PfnGetActionStateFloat, PfnGetActionStateVector2f,
    PfnGetInstanceProcAddr, PfnSyncActions, PfnVoidFunction, XR_ERROR_INITIALIZATION_FAILED,
    XR_ERROR_RUNTIME_FAILURE, XR_ERROR_VALIDATION_FAILURE, XR_SUCCESS, XrAction, XrActionCreateInfo, XrActionSet, XrActionSetCreateInfo, XrActionStateFloat,
    XrActionStateGetInfo, XrActionStateVector2f, XrActionsSyncInfo, XrApiLayerCreateInfo, XrInstance,
    XrInstanceCreateInfo, XrNegotiateApiLayerRequest, XrNegotiateLoaderInfo, XrResult, XrSession, c_name,
};
use crate::layer::{Layer, LayerEntryPoints};

/// Config file read from the layer's directory.
pub const CONFIG_FILE_NAME: &str = "treadmill_layer_config.json";
/// Log file written to the layer's directory.
pub const LOG_FILE_NAME: &str = "treadmill_layer.log";
/// Vendor module looked for in the layer's directory.
pub const VENDOR_MODULE_NAME: &str = "OmniBridge.dll";

/// The process-wide layer.
pub static LAYER: Layer = Layer::new(default_options);

fn default_options() -> RuntimeOptions {
    let dir = module_dir_of((&raw const LAYER).cast::<c_void>());
    RuntimeOptions::new("openxr-layer")
        .with_config_file(dir.join(CONFIG_FILE_NAME))
        .with_log_file(dir.join(LOG_FILE_NAME))
        .with_module_path(dir.join(VENDOR_MODULE_NAME))
}

const ENTRY_POINTS: LayerEntryPoints = LayerEntryPoints {
    get_instance_proc_addr: layer_get_instance_proc_addr,
    create_api_layer_instance: layer_create_api_layer_instance,
};

/// Loader negotiation.
///
/// # Safety
///
/// Called by the OpenXR loader with loader-owned structures.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn xrNegotiateLoaderApiLayerInterface(
    loader_info: *const XrNegotiateLoaderInfo,
    layer_name: *const c_char,
    request: *mut XrNegotiateApiLayerRequest,
) -> XrResult {
    ffi_guard("xrNegotiateLoaderApiLayerInterface", XR_ERROR_INITIALIZATION_FAILED, || {
        // SAFETY: loader-provided pointers, checked inside.
        unsafe { LAYER.negotiate(loader_info, layer_name, request, ENTRY_POINTS) }
    })
}

/// The layer's `xrCreateApiLayerInstance`.
///
/// # Safety
///
/// Called by the loader with valid create infos.
pub unsafe extern "system" fn layer_create_api_layer_instance(
    create_info: *const XrInstanceCreateInfo,
    layer_info: *const XrApiLayerCreateInfo,
    instance: *mut XrInstance,
) -> XrResult {
    ffi_guard("xrCreateApiLayerInstance", XR_ERROR_INITIALIZATION_FAILED, || {
        // SAFETY: loader-provided pointers, checked inside.
        unsafe { LAYER.create_api_layer_instance(create_info, layer_info, instance) }
    })
}

macro_rules! erase {
    ($f:expr, $ty:ty) => {{
        let f: $ty = $f;
        // SAFETY: only the type is erased; the caller casts it back to the
        // signature registered under this name.
        Some(unsafe { std::mem::transmute::<$ty, unsafe extern "system" fn()>(f) })
    }};
}

/// Entry point for `name` if the layer wraps it.
pub fn intercepted(name: &[u8]) -> PfnVoidFunction {
    match name {
        b"xrGetInstanceProcAddr" => erase!(layer_get_instance_proc_addr, PfnGetInstanceProcAddr),
        b"xrDestroyInstance" => erase!(layer_destroy_instance, PfnDestroyInstance),
        b"xrGetActionStateFloat" => erase!(layer_get_action_state_float, PfnGetActionStateFloat),
        b"xrGetActionStateVector2f" => erase!(layer_get_action_state_vector2f, PfnGetActionStateVector2f),
        b"xrSyncActions" => erase!(layer_sync_actions, PfnSyncActions),
        b"xrCreateActionSet" => erase!(layer_create_action_set, PfnCreateActionSet),
        b"xrCreateAction" => erase!(layer_create_action, PfnCreateAction),
        _ => None,
    }
}

/// The layer's `xrGetInstanceProcAddr`.
///
/// # Safety
///
/// `name` must be a NUL-terminated string and `function` writable.
pub unsafe extern "system" fn layer_get_instance_proc_addr(
    instance: XrInstance,
    name: *const c_char,
    function: *mut PfnVoidFunction,
) -> XrResult {
    ffi_guard("xrGetInstanceProcAddr", XR_ERROR_RUNTIME_FAILURE, || {
        // SAFETY: null or a NUL-terminated host string.
        let Some(requested) = (unsafe { c_name(name) }) else {
            return XR_ERROR_VALIDATION_FAILURE;
        };
        if function.is_null() {
            return XR_ERROR_VALIDATION_FAILURE;
        }
        match intercepted(requested.to_bytes()) {
            Some(own) => {
                // SAFETY: checked non-null; the host provides the out slot.
                unsafe { function.write(Some(own)) };
                XR_SUCCESS
            }
            // SAFETY: arguments forwarded unchanged.
            None => unsafe { LAYER.forward_proc_addr(instance, name, function) },
        }
    })
}

unsafe extern "system" fn layer_destroy_instance(instance: XrInstance) -> XrResult {
    ffi_guard("xrDestroyInstance", XR_ERROR_RUNTIME_FAILURE, || {
        // SAFETY: forwarded host handle.
        unsafe { LAYER.destroy_instance(instance) }
    })
}

unsafe extern "system" fn layer_create_action_set(
    instance: XrInstance,
    create_info: *const XrActionSetCreateInfo,
    action_set: *mut XrActionSet,
) -> XrResult {
    ffi_guard("xrCreateActionSet", XR_ERROR_RUNTIME_FAILURE, || {
        // SAFETY: host pointers, forwarded.
        unsafe { LAYER.create_action_set(instance, create_info, action_set) }
    })
}

unsafe extern "system" fn layer_create_action(
    action_set: XrActionSet,
    create_info: *const XrActionCreateInfo,
    action: *mut XrAction,
) -> XrResult {
    ffi_guard("xrCreateAction", XR_ERROR_RUNTIME_FAILURE, || {
        // SAFETY: host pointers, forwarded.
        unsafe { LAYER.create_action(action_set, create_info, action) }
    })
}

unsafe extern "system" fn layer_sync_actions(session: XrSession, sync_info: *const XrActionsSyncInfo) -> XrResult {
    ffi_guard("xrSyncActions", XR_ERROR_RUNTIME_FAILURE, || {
        // SAFETY: host pointers, forwarded.
        unsafe { LAYER.sync_actions(session, sync_info) }
    })
}

unsafe extern "system" fn layer_get_action_state_float(
    session: XrSession,
    get_info: *const XrActionStateGetInfo,
    state: *mut XrActionStateFloat,
) -> XrResult {
    ffi_guard("xrGetActionStateFloat", XR_ERROR_RUNTIME_FAILURE, || {
        // SAFETY: host pointers, checked inside.
        unsafe { LAYER.get_action_state_float(session, get_info, state) }
    })
}

unsafe extern "system" fn layer_get_action_state_vector2f(
    session: XrSession,
    get_info: *const XrActionStateGetInfo,
    state: *mut XrActionStateVector2f,
) -> XrResult {
    ffi_guard("xrGetActionStateVector2f", XR_ERROR_RUNTIME_FAILURE, || {
        // SAFETY: host pointers, checked inside.
        unsafe { LAYER.get_action_state_vector2f(session, get_info, state) }
    })
}

#[cfg(windows)]
mod dll {
    use std::ffi::c_void;

    const DLL_PROCESS_DETACH: u32 = 0;

    /// Tear the runtime down when the layer is unloaded with `FreeLibrary`.
    /// At process exit (`reserved` non-null) other threads are already gone.
    #[unsafe(no_mangle)]
    extern "system" fn DllMain(_module: *mut c_void, reason: u32, reserved: *mut c_void) -> i32 {
        if reason == DLL_PROCESS_DETACH && reserved.is_null() {
            openstride_runtime::ffi_guard("DllMain", (), || super::LAYER.shutdown());
        }
        1
    }
}
