//! Layer state and the bodies of the intercepted functions.
//!
//! The exported `extern "system"` functions in [`crate::entry`] are thin
//! wrappers that forward here with the process-wide [`Layer`].

use std::ffi::c_char;
use std::fmt;
use std::sync::Arc;

use openstride_injection::{ActionRegistry, FloatAxis, Sample, Vec2};
use openstride_runtime::{MotionRuntime, RuntimeOptions, RuntimeSlot, SnapshotCell};
use parking_lot::Mutex;

use crate::dispatch::NextDispatch;
use crate::ffi::{
    API_LAYER_INFO_STRUCT_VERSION, LAYER_API_VERSION, LOADER_API_LAYER_VERSION, LOADER_INFO_STRUCT_VERSION,
    PfnCreateApiLayerInstance, PfnGetInstanceProcAddr, PfnVoidFunction, STRUCT_API_LAYER_REQUEST,
    STRUCT_LOADER_INFO, XR_ERROR_FUNCTION_UNSUPPORTED, XR_ERROR_HANDLE_INVALID, XR_ERROR_INITIALIZATION_FAILED,
    XR_ERROR_VALIDATION_FAILURE, XR_FALSE, XR_SUCCESS, XR_TRUE, XrAction, XrActionCreateInfo, XrActionSet,
    XrActionSetCreateInfo, XrActionStateFloat, XrActionStateGetInfo, XrActionStateVector2f, XrActionsSyncInfo,
    XrApiLayerCreateInfo, XrBool32, XrInstance, XrInstanceCreateInfo, XrNegotiateApiLayerRequest,
    XrNegotiateLoaderInfo, XrResult, XrSession, c_name, fixed_name, succeeded,
};

/// The layer's own entry points, handed to the loader during negotiation.
#[derive(Debug, Clone, Copy)]
pub struct LayerEntryPoints {
    /// This layer's `xrGetInstanceProcAddr`
    pub get_instance_proc_addr: PfnGetInstanceProcAddr,
    /// This layer's `xrCreateApiLayerInstance`
    pub create_api_layer_instance: PfnCreateApiLayerInstance,
}

/// Per-process layer state.
///
/// The action-state calls only load snapshots. Changes to the action table
/// copy it under `action_writes` and publish the copy.
pub struct Layer {
    runtime: RuntimeSlot,
    options: fn() -> RuntimeOptions,
    dispatch: SnapshotCell<NextDispatch>,
    actions: SnapshotCell<ActionRegistry<XrAction>>,
    action_writes: Mutex<()>,
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("runtime", &self.runtime)
            .field("dispatch", &self.dispatch.is_set())
            .field("actions", &self.tracked_actions())
            .finish()
    }
}

fn bool32(value: bool) -> XrBool32 {
    if value { XR_TRUE } else { XR_FALSE }
}

impl Layer {
    /// Layer that starts its runtime from `options` on first use.
    pub const fn new(options: fn() -> RuntimeOptions) -> Self {
        Self {
            runtime: RuntimeSlot::new(),
            options,
            dispatch: SnapshotCell::new(),
            actions: SnapshotCell::new(),
            action_writes: parking_lot::const_mutex(()),
        }
    }

    /// The runtime slot; tests pre-start it with their own options.
    pub fn runtime_slot(&self) -> &RuntimeSlot {
        &self.runtime
    }

    /// Start the runtime if needed.
    pub fn start(&self) -> Arc<MotionRuntime> {
        self.runtime.get_or_start(self.options)
    }

    /// Stop the runtime and forget the next layer.
    pub fn shutdown(&self) {
        tracing::info!("OpenXR layer shutting down");
        self.runtime.shutdown();
        self.dispatch.store(None);
        let _writes = self.action_writes.lock();
        self.actions.store(None);
    }

    /// Functions resolved from the next layer, if an instance exists.
    pub fn dispatch(&self) -> Option<NextDispatch> {
        self.dispatch.load(|dispatch| dispatch.copied())
    }

    /// Number of actions seen since the last instance destruction.
    pub fn tracked_actions(&self) -> usize {
        self.actions.load(|actions| actions.map_or(0, ActionRegistry::len))
    }

    /// `xrNegotiateLoaderApiLayerInterface`
    ///
    /// # Safety
    ///
    /// Pointers must be null or valid for the duration of the call, as the
    /// OpenXR loader guarantees.
    pub unsafe fn negotiate(
        &self,
        loader_info: *const XrNegotiateLoaderInfo,
        layer_name: *const c_char,
        request: *mut XrNegotiateApiLayerRequest,
        own: LayerEntryPoints,
    ) -> XrResult {
        let runtime = self.start();
        // SAFETY: null or a NUL-terminated loader string.
        let name = unsafe { c_name(layer_name) }.map(|name| name.to_string_lossy().into_owned());
        tracing::info!(layer = ?name, enabled = runtime.config().enabled, "Loader negotiation");

        // SAFETY: null or a valid loader structure.
        let Some(info) = (unsafe { loader_info.as_ref() }) else {
            tracing::error!("Negotiation without loader info");
            return XR_ERROR_INITIALIZATION_FAILED;
        };
        // SAFETY: null or a valid, writable loader structure.
        let Some(request) = (unsafe { request.as_mut() }) else {
            tracing::error!("Negotiation without layer request");
            return XR_ERROR_INITIALIZATION_FAILED;
        };

        if info.struct_type != STRUCT_LOADER_INFO
            || info.struct_version != LOADER_INFO_STRUCT_VERSION
            || info.struct_size != size_of::<XrNegotiateLoaderInfo>()
        {
            tracing::error!(
                struct_type = info.struct_type,
                struct_version = info.struct_version,
                struct_size = info.struct_size,
                "Loader info structure mismatch"
            );
            return XR_ERROR_INITIALIZATION_FAILED;
        }
        if request.struct_type != STRUCT_API_LAYER_REQUEST
            || request.struct_version != API_LAYER_INFO_STRUCT_VERSION
            || request.struct_size != size_of::<XrNegotiateApiLayerRequest>()
        {
            tracing::error!(
                struct_type = request.struct_type,
                struct_version = request.struct_version,
                struct_size = request.struct_size,
                "Layer request structure mismatch"
            );
            return XR_ERROR_INITIALIZATION_FAILED;
        }
        if info.min_interface_version > LOADER_API_LAYER_VERSION || info.max_interface_version < LOADER_API_LAYER_VERSION
        {
            tracing::error!(
                min = info.min_interface_version,
                max = info.max_interface_version,
                "Loader interface version unsupported"
            );
            return XR_ERROR_INITIALIZATION_FAILED;
        }

        request.layer_interface_version = LOADER_API_LAYER_VERSION;
        request.layer_api_version = LAYER_API_VERSION;
        request.get_instance_proc_addr = Some(own.get_instance_proc_addr);
        request.create_api_layer_instance = Some(own.create_api_layer_instance);
        tracing::info!("Layer negotiation successful");
        XR_SUCCESS
    }

    /// `xrCreateApiLayerInstance`
    ///
    /// # Safety
    ///
    /// Pointers must be null or valid as the loader guarantees; the next-info
    /// chain must be well formed.
    pub unsafe fn create_api_layer_instance(
        &self,
        create_info: *const XrInstanceCreateInfo,
        layer_info: *const XrApiLayerCreateInfo,
        instance: *mut XrInstance,
    ) -> XrResult {
        // SAFETY: null or a valid loader structure.
        let layer = unsafe { layer_info.as_ref() };
        let (Some(layer), false, false) = (layer, create_info.is_null(), instance.is_null()) else {
            return XR_ERROR_VALIDATION_FAILURE;
        };
        // SAFETY: null or the loader's next-info entry for this layer.
        let Some(next) = (unsafe { layer.next_info.as_ref() }) else {
            tracing::error!("Layer create info has no next layer");
            return XR_ERROR_INITIALIZATION_FAILED;
        };
        let (Some(next_gipa), Some(next_create)) = (next.next_get_instance_proc_addr, next.next_create_api_layer_instance)
        else {
            tracing::error!("Next layer entry points missing");
            return XR_ERROR_INITIALIZATION_FAILED;
        };

        let mut downstream = *layer;
        downstream.next_info = next.next;
        // SAFETY: arguments are the caller's, with our entry removed from the
        // chain as the loader protocol requires.
        let result = unsafe { next_create(create_info, &downstream, instance) };
        if !succeeded(result) {
            tracing::warn!(result, "Next layer failed to create the instance");
            return result;
        }

        // SAFETY: the next layer reported success, so `instance` is written.
        let handle = unsafe { *instance };
        // SAFETY: `next_gipa` belongs to the layer that just created `handle`.
        let dispatch = unsafe { NextDispatch::resolve(handle, next_gipa) };
        tracing::info!(
            instance = format_args!("{:#x}", handle.0),
            resolved = dispatch.resolved_count(),
            "Instance created"
        );
        self.dispatch.store(Some(dispatch));
        result
    }

    /// Forward a `xrGetInstanceProcAddr` lookup the layer does not handle.
    ///
    /// # Safety
    ///
    /// `name` and `function` must be valid as the OpenXR contract requires.
    pub unsafe fn forward_proc_addr(
        &self,
        instance: XrInstance,
        name: *const c_char,
        function: *mut PfnVoidFunction,
    ) -> XrResult {
        match self.dispatch() {
            // SAFETY: arguments forwarded unchanged to the next layer.
            Some(dispatch) => unsafe { (dispatch.get_instance_proc_addr)(instance, name, function) },
            None => XR_ERROR_FUNCTION_UNSUPPORTED,
        }
    }

    /// `xrDestroyInstance`
    ///
    /// # Safety
    ///
    /// `instance` is forwarded to the next layer unchanged.
    pub unsafe fn destroy_instance(&self, instance: XrInstance) -> XrResult {
        {
            let _writes = self.action_writes.lock();
            if let Some(mut registry) = self.actions.load(|actions| actions.cloned()) {
                registry.forget_all();
                self.actions.store(Some(registry));
            }
        }
        tracing::info!(instance = format_args!("{:#x}", instance.0), "Instance destroyed");
        match self.dispatch().and_then(|d| d.destroy_instance) {
            // SAFETY: forwarded unchanged.
            Some(destroy) => unsafe { destroy(instance) },
            None => XR_ERROR_HANDLE_INVALID,
        }
    }

    /// `xrCreateActionSet`
    ///
    /// # Safety
    ///
    /// Pointers must be null or valid for the call.
    pub unsafe fn create_action_set(
        &self,
        instance: XrInstance,
        create_info: *const XrActionSetCreateInfo,
        action_set: *mut XrActionSet,
    ) -> XrResult {
        let Some(create) = self.dispatch().and_then(|d| d.create_action_set) else {
            return XR_ERROR_FUNCTION_UNSUPPORTED;
        };
        // SAFETY: forwarded unchanged.
        let result = unsafe { create(instance, create_info, action_set) };
        // SAFETY: null or the caller's create info.
        if let (true, Some(info)) = (succeeded(result), unsafe { create_info.as_ref() }) {
            tracing::info!(action_set = %fixed_name(&info.action_set_name), "Action set created");
        }
        result
    }

    /// `xrCreateAction`: classify successful creations.
    ///
    /// # Safety
    ///
    /// Pointers must be null or valid for the call.
    pub unsafe fn create_action(
        &self,
        action_set: XrActionSet,
        create_info: *const XrActionCreateInfo,
        action: *mut XrAction,
    ) -> XrResult {
        let Some(create) = self.dispatch().and_then(|d| d.create_action) else {
            return XR_ERROR_FUNCTION_UNSUPPORTED;
        };
        // SAFETY: forwarded unchanged.
        let result = unsafe { create(action_set, create_info, action) };
        if !succeeded(result) || action.is_null() {
            return result;
        }
        // SAFETY: null or the caller's create info.
        let Some(info) = (unsafe { create_info.as_ref() }) else {
            return result;
        };
        // SAFETY: non-null and written by the successful call.
        let handle = unsafe { *action };
        let name = fixed_name(&info.action_name);

        let runtime = self.start();
        let _writes = self.action_writes.lock();
        let mut registry = self
            .actions
            .load(|actions| actions.cloned())
            .unwrap_or_else(|| runtime.new_action_registry());
        if registry.register(handle, &name) {
            tracing::debug!(action = %name, action_type = info.action_type, "Movement action will receive treadmill input");
        }
        self.actions.store(Some(registry));
        result
    }

    /// `xrSyncActions`: pass-through.
    ///
    /// # Safety
    ///
    /// Arguments are forwarded unchanged.
    pub unsafe fn sync_actions(&self, session: XrSession, sync_info: *const XrActionsSyncInfo) -> XrResult {
        match self.dispatch().and_then(|d| d.sync_actions) {
            // SAFETY: forwarded unchanged.
            Some(sync) => unsafe { sync(session, sync_info) },
            None => XR_ERROR_FUNCTION_UNSUPPORTED,
        }
    }

    /// `xrGetActionStateFloat`: call through, then blend movement actions.
    ///
    /// # Safety
    ///
    /// Pointers must be null or valid for the call.
    pub unsafe fn get_action_state_float(
        &self,
        session: XrSession,
        get_info: *const XrActionStateGetInfo,
        state: *mut XrActionStateFloat,
    ) -> XrResult {
        let Some(real) = self.dispatch().and_then(|d| d.get_action_state_float) else {
            return XR_ERROR_VALIDATION_FAILURE;
        };
        if get_info.is_null() || state.is_null() {
            return XR_ERROR_VALIDATION_FAILURE;
        }
        // SAFETY: both pointers checked non-null; the host owns them.
        let result = unsafe { real(session, get_info, state) };
        if succeeded(result) {
            // SAFETY: checked non-null above and valid per the host contract.
            let (info, state) = unsafe { (&*get_info, &mut *state) };
            self.inject_float(info.action, state);
        }
        result
    }

    /// `xrGetActionStateVector2f`: call through, then blend movement actions.
    ///
    /// # Safety
    ///
    /// Pointers must be null or valid for the call.
    pub unsafe fn get_action_state_vector2f(
        &self,
        session: XrSession,
        get_info: *const XrActionStateGetInfo,
        state: *mut XrActionStateVector2f,
    ) -> XrResult {
        let Some(real) = self.dispatch().and_then(|d| d.get_action_state_vector2f) else {
            return XR_ERROR_VALIDATION_FAILURE;
        };
        if get_info.is_null() || state.is_null() {
            return XR_ERROR_VALIDATION_FAILURE;
        }
        // SAFETY: both pointers checked non-null; the host owns them.
        let result = unsafe { real(session, get_info, state) };
        if succeeded(result) {
            // SAFETY: checked non-null above and valid per the host contract.
            let (info, state) = unsafe { (&*get_info, &mut *state) };
            self.inject_vector(info.action, state);
        }
        result
    }

    fn movement_axis(&self, action: XrAction) -> Option<FloatAxis> {
        self.actions
            .load(|actions| actions.and_then(|registry| registry.movement_axis(action)))
    }

    fn inject_float(&self, action: XrAction, state: &mut XrActionStateFloat) {
        let Some(axis) = self.movement_axis(action) else {
            return;
        };
        let Some(runtime) = self.runtime.get() else {
            return;
        };
        let prior = Sample::new(state.current_state, state.is_active != XR_FALSE);
        if let Some(blended) = runtime.injector().inject_float(prior, axis) {
            state.current_state = blended.value;
            state.is_active = bool32(blended.active);
        }
    }

    fn inject_vector(&self, action: XrAction, state: &mut XrActionStateVector2f) {
        if self.movement_axis(action).is_none() {
            return;
        }
        let Some(runtime) = self.runtime.get() else {
            return;
        };
        let prior = Sample::new(
            Vec2::new(state.current_state.x, state.current_state.y),
            state.is_active != XR_FALSE,
        );
        if let Some(blended) = runtime.injector().inject_vector(prior) {
            state.current_state.x = blended.value.x;
            state.current_state.y = blended.value.y;
            state.is_active = bool32(blended.active);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openstride_config::Config;

    fn disabled() -> RuntimeOptions {
        RuntimeOptions::new("openxr-test")
            .with_config(Config {
                enabled: false,
                ..Config::default()
            })
            .without_logging()
    }

    unsafe extern "system" fn no_gipa(_: XrInstance, _: *const c_char, _: *mut PfnVoidFunction) -> XrResult {
        XR_ERROR_FUNCTION_UNSUPPORTED
    }

    unsafe extern "system" fn no_create(
        _: *const XrInstanceCreateInfo,
        _: *const XrApiLayerCreateInfo,
        _: *mut XrInstance,
    ) -> XrResult {
        XR_ERROR_INITIALIZATION_FAILED
    }

    const OWN: LayerEntryPoints = LayerEntryPoints {
        get_instance_proc_addr: no_gipa,
        create_api_layer_instance: no_create,
    };

    fn loader_info() -> XrNegotiateLoaderInfo {
        XrNegotiateLoaderInfo {
            struct_type: STRUCT_LOADER_INFO,
            struct_version: LOADER_INFO_STRUCT_VERSION,
            struct_size: size_of::<XrNegotiateLoaderInfo>(),
            min_interface_version: 1,
            max_interface_version: 1,
            min_api_version: 0,
            max_api_version: LAYER_API_VERSION,
        }
    }

    fn request() -> XrNegotiateApiLayerRequest {
        XrNegotiateApiLayerRequest {
            struct_type: STRUCT_API_LAYER_REQUEST,
            struct_version: API_LAYER_INFO_STRUCT_VERSION,
            struct_size: size_of::<XrNegotiateApiLayerRequest>(),
            layer_interface_version: 0,
            layer_api_version: 0,
            get_instance_proc_addr: None,
            create_api_layer_instance: None,
        }
    }

    #[test]
    fn test_negotiation_fills_request() {
        let layer = Layer::new(disabled);
        let info = loader_info();
        let mut req = request();

        // SAFETY: locals outlive the call.
        let result = unsafe { layer.negotiate(&info, c"XR_APILAYER_openstride".as_ptr(), &mut req, OWN) };

        assert_eq!(result, XR_SUCCESS);
        assert_eq!(req.layer_interface_version, 1);
        assert_eq!(req.layer_api_version, LAYER_API_VERSION);
        assert!(req.get_instance_proc_addr.is_some());
        assert!(req.create_api_layer_instance.is_some());
    }

    #[test]
    fn test_negotiation_rejects_mismatches() {
        let layer = Layer::new(disabled);

        let mut wrong_size = loader_info();
        wrong_size.struct_size = wrong_size.struct_size.saturating_sub(8);
        let mut wrong_type = request();
        wrong_type.struct_type = STRUCT_LOADER_INFO;
        let mut too_new = loader_info();
        too_new.min_interface_version = 2;
        too_new.max_interface_version = 3;

        let cases = [
            (wrong_size, request()),
            (loader_info(), wrong_type),
            (too_new, request()),
        ];
        for (info, mut req) in cases {
            // SAFETY: locals outlive the call.
            let result = unsafe { layer.negotiate(&info, std::ptr::null(), &mut req, OWN) };
            assert_eq!(result, XR_ERROR_INITIALIZATION_FAILED);
            assert!(req.get_instance_proc_addr.is_none());
        }

        // SAFETY: null pointers are checked.
        let result = unsafe { layer.negotiate(std::ptr::null(), std::ptr::null(), std::ptr::null_mut(), OWN) };
        assert_eq!(result, XR_ERROR_INITIALIZATION_FAILED);
    }

    #[test]
    fn test_calls_without_instance_report_errors() {
        let layer = Layer::new(disabled);
        let info = XrActionStateGetInfo {
            ty: 0,
            next: std::ptr::null(),
            action: XrAction(1),
            subaction_path: 0,
        };
        let mut state = XrActionStateFloat {
            ty: 0,
            next: std::ptr::null_mut(),
            current_state: 0.5,
            changed_since_last_sync: 0,
            last_change_time: 0,
            is_active: XR_TRUE,
        };

        // SAFETY: locals outlive each call; no next layer is installed.
        unsafe {
            assert_eq!(layer.get_action_state_float(XrSession(1), &info, &mut state), XR_ERROR_VALIDATION_FAILURE);
            assert_eq!(layer.sync_actions(XrSession(1), std::ptr::null()), XR_ERROR_FUNCTION_UNSUPPORTED);
            assert_eq!(
                layer.create_action(XrActionSet(1), std::ptr::null(), std::ptr::null_mut()),
                XR_ERROR_FUNCTION_UNSUPPORTED
            );
            assert_eq!(layer.destroy_instance(XrInstance(1)), XR_ERROR_HANDLE_INVALID);
        }
        assert!((state.current_state - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_create_instance_validates_arguments() {
        let layer = Layer::new(disabled);
        // SAFETY: null pointers are checked before use.
        let result = unsafe { layer.create_api_layer_instance(std::ptr::null(), std::ptr::null(), std::ptr::null_mut()) };
        assert_eq!(result, XR_ERROR_VALIDATION_FAILURE);
    }
}
