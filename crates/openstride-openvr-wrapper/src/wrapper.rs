//! Wrapper state and the bodies of the wrapped calls.

use std::ffi::{CStr, c_char, c_int, c_void};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use openstride_injection::{ActionRegistry, Sample, Vec2};
use openstride_runtime::{MotionRuntime, RuntimeOptions, RuntimeSlot, SnapshotCell};
use parking_lot::{Mutex, RwLock};

use crate::ffi::{
    EVRInitError, EVRInputError, InputAnalogActionData, JOYSTICK_AXIS, TrackedDeviceIndex,
    VR_INIT_ERROR_INSTALLATION_NOT_FOUND, VR_INPUT_ERROR_INVALID_HANDLE, VR_INPUT_ERROR_NONE, VRActionHandle,
    VRControllerAxis, VRControllerState, VRInputValueHandle, size_covers,
};
use crate::interface::{InputBackend, InterfaceKind, InterfaceTable, Overrides, RealInterface, SystemBackend};
use crate::library::{RealExports, RealLibrary};

/// Answer of error-description queries without a real library.
pub const UNKNOWN_ERROR: &CStr = c"Unknown error";
/// Answer of error-symbol queries without a real library.
pub const UNKNOWN_ERROR_SYMBOL: &CStr = c"VRInitError_Unknown";

enum RealState {
    Unloaded,
    Loaded(Arc<RealLibrary>),
    Missing,
}

/// Per-process wrapper state.
///
/// The per-frame calls only load snapshots: `reals` mirrors the patched
/// objects and `actions` the classified handles. Writers update them under
/// `interfaces` and `action_writes`.
pub struct OpenVrWrapper {
    runtime: RuntimeSlot,
    options: fn() -> RuntimeOptions,
    library_path: fn() -> PathBuf,
    real: RwLock<RealState>,
    interfaces: Mutex<InterfaceTable>,
    reals: SnapshotCell<Vec<RealInterface>>,
    actions: SnapshotCell<ActionRegistry<VRActionHandle>>,
    action_writes: Mutex<()>,
}

impl fmt::Debug for OpenVrWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let real = match &*self.real.read() {
            RealState::Unloaded => "unloaded",
            RealState::Loaded(_) => "loaded",
            RealState::Missing => "missing",
        };
        f.debug_struct("OpenVrWrapper")
            .field("runtime", &self.runtime)
            .field("real", &real)
            .field("interfaces", &self.interfaces.lock().len())
            .field("actions", &self.tracked_actions())
            .finish()
    }
}

impl OpenVrWrapper {
    /// Wrapper that starts from `options` and loads the real library from
    /// `library_path` on first use.
    pub const fn new(options: fn() -> RuntimeOptions, library_path: fn() -> PathBuf) -> Self {
        Self {
            runtime: RuntimeSlot::new(),
            options,
            library_path,
            real: parking_lot::const_rwlock(RealState::Unloaded),
            interfaces: parking_lot::const_mutex(InterfaceTable::new()),
            reals: SnapshotCell::new(),
            actions: SnapshotCell::new(),
            action_writes: parking_lot::const_mutex(()),
        }
    }

    /// The runtime slot; tests pre-start it with their own options.
    pub fn runtime_slot(&self) -> &RuntimeSlot {
        &self.runtime
    }

    /// Use `library` instead of loading the real one from disk.
    pub fn install_library(&self, library: RealLibrary) {
        *self.real.write() = RealState::Loaded(Arc::new(library));
    }

    /// Start the runtime and load the real library if not done yet.
    ///
    /// A library that failed to load is not retried.
    pub fn initialize(&self) -> (Arc<MotionRuntime>, RealExports) {
        let runtime = self.runtime.get_or_start(self.options);
        if !matches!(*self.real.read(), RealState::Unloaded) {
            return (runtime, self.exports());
        }

        let mut real = self.real.write();
        if matches!(*real, RealState::Unloaded) {
            let path = (self.library_path)();
            *real = match RealLibrary::load(&path) {
                Ok(library) => {
                    tracing::info!(path = %path.display(), "Real OpenVR library loaded");
                    RealState::Loaded(Arc::new(library))
                }
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        "Rename the original openvr_api.dll to openvr_api_original.dll next to the wrapper"
                    );
                    RealState::Missing
                }
            };
        }
        drop(real);
        (runtime, self.exports())
    }

    /// Exports of the real library, empty when it is not loaded.
    pub fn exports(&self) -> RealExports {
        match &*self.real.read() {
            RealState::Loaded(library) => *library.exports(),
            RealState::Unloaded | RealState::Missing => RealExports::default(),
        }
    }

    /// Stop the runtime and release the real library.
    ///
    /// Patched vtables stay installed; the objects using them belong to the
    /// real library.
    pub fn shutdown(&self) {
        tracing::info!("OpenVR wrapper shutting down");
        self.runtime.shutdown();
        self.forget_actions();
        *self.real.write() = RealState::Unloaded;
    }

    /// Drop every classified handle; the handles die with the host session.
    fn forget_actions(&self) {
        let _writes = self.action_writes.lock();
        self.actions.store(None);
    }

    /// Number of actions whose handle has been seen.
    pub fn tracked_actions(&self) -> usize {
        self.actions.load(|actions| actions.map_or(0, ActionRegistry::len))
    }

    fn real_for(&self, this: *mut c_void) -> Option<RealInterface> {
        self.reals
            .load(|reals| reals.and_then(|reals| reals.iter().find(|real| real.this() == this).copied()))
    }

    /// Number of patched interface objects.
    pub fn patched_interfaces(&self) -> usize {
        self.interfaces.lock().len()
    }

    /// `VR_InitInternal`
    ///
    /// # Safety
    ///
    /// `error` must be null or writable.
    pub unsafe fn init_internal(&self, error: *mut EVRInitError, application_type: c_int) -> *mut c_void {
        let (_, exports) = self.initialize();
        tracing::debug!(application_type, "VR_InitInternal");
        match exports.init_internal {
            // SAFETY: forwarded unchanged.
            Some(real) => unsafe { real(error, application_type) },
            // SAFETY: null or writable per the caller.
            None => unsafe { installation_not_found(error) },
        }
    }

    /// `VR_InitInternal2`
    ///
    /// # Safety
    ///
    /// `error` must be null or writable, `startup_info` null or a C string.
    pub unsafe fn init_internal2(
        &self,
        error: *mut EVRInitError,
        application_type: c_int,
        startup_info: *const c_char,
    ) -> *mut c_void {
        let (_, exports) = self.initialize();
        tracing::debug!(application_type, "VR_InitInternal2");
        match exports.init_internal2 {
            // SAFETY: forwarded unchanged.
            Some(real) => unsafe { real(error, application_type, startup_info) },
            // SAFETY: null or writable per the caller.
            None => unsafe { installation_not_found(error) },
        }
    }

    /// `VR_ShutdownInternal`: forward, then forget the session's action
    /// handles.
    pub fn shutdown_internal(&self) {
        tracing::debug!("VR_ShutdownInternal");
        if let Some(real) = self.exports().shutdown_internal {
            // SAFETY: no arguments; the real library is loaded.
            unsafe { real() };
        }
        self.forget_actions();
    }

    /// `VR_GetVRInitErrorAsEnglishDescription`
    pub fn init_error_as_english_description(&self, error: c_int) -> *const c_char {
        match self.exports().init_error_as_english_description {
            // SAFETY: plain integer argument.
            Some(real) => unsafe { real(error) },
            None => UNKNOWN_ERROR.as_ptr(),
        }
    }

    /// `VR_GetVRInitErrorAsSymbol`
    pub fn init_error_as_symbol(&self, error: c_int) -> *const c_char {
        match self.exports().init_error_as_symbol {
            // SAFETY: plain integer argument.
            Some(real) => unsafe { real(error) },
            None => UNKNOWN_ERROR_SYMBOL.as_ptr(),
        }
    }

    /// `VR_GetStringForHmdError`
    pub fn string_for_hmd_error(&self, error: c_int) -> *const c_char {
        match self.exports().string_for_hmd_error {
            // SAFETY: plain integer argument.
            Some(real) => unsafe { real(error) },
            None => UNKNOWN_ERROR.as_ptr(),
        }
    }

    /// `VR_IsHmdPresent`
    pub fn is_hmd_present(&self) -> bool {
        let (_, exports) = self.initialize();
        // SAFETY: no arguments.
        exports.is_hmd_present.is_some_and(|real| unsafe { real() })
    }

    /// `VR_IsRuntimeInstalled`
    pub fn is_runtime_installed(&self) -> bool {
        // SAFETY: no arguments.
        self.exports().is_runtime_installed.is_some_and(|real| unsafe { real() })
    }

    /// `VR_GetRuntimePath`
    ///
    /// # Safety
    ///
    /// Buffers as the OpenVR contract requires.
    pub unsafe fn get_runtime_path(&self, buffer: *mut c_char, buffer_size: u32, required_size: *mut u32) -> bool {
        // SAFETY: forwarded unchanged.
        self.exports()
            .get_runtime_path
            .is_some_and(|real| unsafe { real(buffer, buffer_size, required_size) })
    }

    /// `VR_IsInterfaceVersionValid`
    ///
    /// # Safety
    ///
    /// `version` must be null or a C string.
    pub unsafe fn is_interface_version_valid(&self, version: *const c_char) -> bool {
        // SAFETY: forwarded unchanged.
        self.exports()
            .is_interface_version_valid
            .is_some_and(|real| unsafe { real(version) })
    }

    /// `VR_GetInitToken`
    pub fn get_init_token(&self) -> u32 {
        // SAFETY: no arguments.
        self.exports().get_init_token.map_or(0, |real| unsafe { real() })
    }

    /// `VR_GetGenericInterface`: forward, then patch `IVRSystem` and
    /// `IVRInput` objects.
    ///
    /// # Safety
    ///
    /// `version` must be null or a C string and `error` null or writable.
    pub unsafe fn get_generic_interface(
        &self,
        version: *const c_char,
        error: *mut EVRInitError,
        overrides: &Overrides,
    ) -> *mut c_void {
        let (_, exports) = self.initialize();
        let Some(real) = exports.get_generic_interface else {
            // SAFETY: null or writable per the caller.
            return unsafe { installation_not_found(error) };
        };
        // SAFETY: null or a NUL-terminated host string.
        let name = (!version.is_null()).then(|| unsafe { CStr::from_ptr(version) });
        tracing::debug!(interface = ?name, "VR_GetGenericInterface");

        // SAFETY: forwarded unchanged.
        let object = unsafe { real(version, error) };
        let kind = name.and_then(InterfaceKind::from_version);
        match kind {
            // SAFETY: a non-null object handed out for this interface version
            // by the real runtime.
            Some(kind) if !object.is_null() => {
                let mut interfaces = self.interfaces.lock();
                // SAFETY: as above.
                let wrapped = unsafe { interfaces.wrap(kind, object, overrides) };
                self.reals.store(Some(interfaces.reals()));
                wrapped
            }
            _ => object,
        }
    }

    /// `IVRInput::GetActionHandle` on patched object `this`.
    ///
    /// # Safety
    ///
    /// Arguments as the OpenVR contract requires.
    pub unsafe fn input_get_action_handle(
        &self,
        this: *mut c_void,
        name: *const c_char,
        handle: *mut VRActionHandle,
    ) -> EVRInputError {
        let Some(real) = self.real_for(this) else {
            return VR_INPUT_ERROR_INVALID_HANDLE;
        };
        // SAFETY: forwarded from the caller.
        unsafe { self.get_action_handle(&real, name, handle) }
    }

    /// `IVRInput::GetAnalogActionData` on patched object `this`.
    ///
    /// # Safety
    ///
    /// Arguments as the OpenVR contract requires.
    pub unsafe fn input_get_analog_action_data(
        &self,
        this: *mut c_void,
        action: VRActionHandle,
        data: *mut InputAnalogActionData,
        data_size: u32,
        restrict_to_device: VRInputValueHandle,
    ) -> EVRInputError {
        let Some(real) = self.real_for(this) else {
            return VR_INPUT_ERROR_INVALID_HANDLE;
        };
        // SAFETY: forwarded from the caller.
        unsafe { self.get_analog_action_data(&real, action, data, data_size, restrict_to_device) }
    }

    /// `IVRSystem::GetControllerState` on patched object `this`.
    ///
    /// # Safety
    ///
    /// Arguments as the OpenVR contract requires.
    pub unsafe fn system_get_controller_state(
        &self,
        this: *mut c_void,
        device: TrackedDeviceIndex,
        state: *mut VRControllerState,
        state_size: u32,
    ) -> bool {
        let Some(real) = self.real_for(this) else {
            return false;
        };
        // SAFETY: forwarded from the caller.
        unsafe { self.get_controller_state(&real, device, state, state_size) }
    }

    /// `IVRSystem::GetControllerStateWithPose` on patched object `this`.
    ///
    /// # Safety
    ///
    /// Arguments as the OpenVR contract requires.
    pub unsafe fn system_get_controller_state_with_pose(
        &self,
        this: *mut c_void,
        origin: c_int,
        device: TrackedDeviceIndex,
        state: *mut VRControllerState,
        state_size: u32,
        pose: *mut c_void,
    ) -> bool {
        let Some(real) = self.real_for(this) else {
            return false;
        };
        // SAFETY: forwarded from the caller.
        unsafe { self.get_controller_state_with_pose(&real, origin, device, state, state_size, pose) }
    }

    /// Call through `backend`, then classify the action name.
    ///
    /// # Safety
    ///
    /// Arguments as the OpenVR contract requires.
    pub unsafe fn get_action_handle<B: InputBackend>(
        &self,
        backend: &B,
        name: *const c_char,
        handle: *mut VRActionHandle,
    ) -> EVRInputError {
        // SAFETY: forwarded unchanged.
        let result = unsafe { backend.get_action_handle(name, handle) };
        if result != VR_INPUT_ERROR_NONE || name.is_null() || handle.is_null() {
            return result;
        }
        // SAFETY: both non-null; the call succeeded, so `handle` is written.
        let (name, handle) = unsafe { (CStr::from_ptr(name).to_string_lossy(), *handle) };

        let runtime = self.runtime.get_or_start(self.options);
        let _writes = self.action_writes.lock();
        let mut registry = self
            .actions
            .load(|actions| actions.cloned())
            .unwrap_or_else(|| runtime.new_action_registry());
        if registry.register(handle, &name) {
            tracing::debug!(action = %name, handle = format_args!("{handle:#x}"), "Detected movement action");
        }
        self.actions.store(Some(registry));
        result
    }

    /// Call through `backend`, then blend treadmill motion into movement
    /// actions.
    ///
    /// # Safety
    ///
    /// Arguments as the OpenVR contract requires.
    pub unsafe fn get_analog_action_data<B: InputBackend>(
        &self,
        backend: &B,
        action: VRActionHandle,
        data: *mut InputAnalogActionData,
        data_size: u32,
        restrict_to_device: VRInputValueHandle,
    ) -> EVRInputError {
        // SAFETY: forwarded unchanged.
        let result = unsafe { backend.get_analog_action_data(action, data, data_size, restrict_to_device) };
        if result != VR_INPUT_ERROR_NONE || data.is_null() || !size_covers::<InputAnalogActionData>(data_size) {
            return result;
        }
        let is_movement = self.actions.load(|actions| actions.is_some_and(|r| r.is_movement(action)));
        let Some(runtime) = self.runtime.get().filter(|_| is_movement) else {
            return result;
        };

        // SAFETY: non-null and at least as large as the mirror, per the size check.
        let mut value = unsafe { data.read_unaligned() };
        let prior = Sample::new(Vec2::new(value.x, value.y), value.b_active);
        if let Some(blended) = runtime.injector().inject_vector(prior) {
            value.x = blended.value.x;
            value.y = blended.value.y;
            value.b_active = blended.active;
            // SAFETY: as above.
            unsafe { data.write_unaligned(value) };
        }
        result
    }

    /// Call through `backend`, then blend into the joystick axis of the
    /// targeted controller.
    ///
    /// # Safety
    ///
    /// Arguments as the OpenVR contract requires.
    pub unsafe fn get_controller_state<B: SystemBackend>(
        &self,
        backend: &B,
        device: TrackedDeviceIndex,
        state: *mut VRControllerState,
        state_size: u32,
    ) -> bool {
        // SAFETY: forwarded unchanged.
        let ok = unsafe { backend.get_controller_state(device, state, state_size) };
        if ok {
            // SAFETY: forwarded from the caller.
            unsafe { self.inject_joystick(device, state, state_size) };
        }
        ok
    }

    /// As [`Self::get_controller_state`], with a pose.
    ///
    /// # Safety
    ///
    /// Arguments as the OpenVR contract requires.
    pub unsafe fn get_controller_state_with_pose<B: SystemBackend>(
        &self,
        backend: &B,
        origin: c_int,
        device: TrackedDeviceIndex,
        state: *mut VRControllerState,
        state_size: u32,
        pose: *mut c_void,
    ) -> bool {
        // SAFETY: forwarded unchanged.
        let ok = unsafe { backend.get_controller_state_with_pose(origin, device, state, state_size, pose) };
        if ok {
            // SAFETY: forwarded from the caller.
            unsafe { self.inject_joystick(device, state, state_size) };
        }
        ok
    }

    /// # Safety
    ///
    /// `state` must be null or valid for `state_size` bytes.
    unsafe fn inject_joystick(&self, device: TrackedDeviceIndex, state: *mut VRControllerState, state_size: u32) {
        if state.is_null() || !size_covers::<VRControllerState>(state_size) {
            return;
        }
        let Some(runtime) = self.runtime.get() else {
            return;
        };
        // SAFETY: non-null and large enough per the checks above.
        let mut value = unsafe { state.read_unaligned() };
        let mut axes = value.axis;
        let Some(joystick) = axes.get_mut(JOYSTICK_AXIS) else {
            return;
        };
        // Controller state has no activity flag of its own.
        let prior = Sample::new(Vec2::new(joystick.x, joystick.y), false);
        if let Some(blended) = runtime.injector().inject_joystick(device, prior, runtime.controller_filter()) {
            *joystick = VRControllerAxis {
                x: blended.value.x,
                y: blended.value.y,
            };
            value.axis = axes;
            // SAFETY: as above.
            unsafe { state.write_unaligned(value) };
        }
    }
}

/// # Safety
///
/// `error` must be null or writable.
unsafe fn installation_not_found(error: *mut EVRInitError) -> *mut c_void {
    if !error.is_null() {
        // SAFETY: checked non-null; writable per the caller.
        unsafe { error.write(VR_INIT_ERROR_INSTALLATION_NOT_FOUND) };
    }
    std::ptr::null_mut()
}

#[cfg(test)]
mod tests {
    use super::*;
    use openstride_config::Config;

    fn disabled() -> RuntimeOptions {
        RuntimeOptions::new("openvr-test")
            .with_config(Config {
                enabled: false,
                ..Config::default()
            })
            .without_logging()
    }

    fn missing_library() -> PathBuf {
        PathBuf::from("/nonexistent/openvr_api_original.dll")
    }

    #[test]
    fn test_fallbacks_without_real_library() {
        let wrapper = OpenVrWrapper::new(disabled, missing_library);
        let mut error: EVRInitError = 0;

        // SAFETY: `error` is a valid out slot.
        let context = unsafe { wrapper.init_internal(&mut error, 1) };
        assert!(context.is_null());
        assert_eq!(error, VR_INIT_ERROR_INSTALLATION_NOT_FOUND);

        error = 0;
        let overrides = Overrides {
            system: [std::ptr::null(); 2],
            input: [std::ptr::null(); 2],
        };
        // SAFETY: valid C string and out slot.
        let object = unsafe { wrapper.get_generic_interface(c"IVRSystem_022".as_ptr(), &mut error, &overrides) };
        assert!(object.is_null());
        assert_eq!(error, VR_INIT_ERROR_INSTALLATION_NOT_FOUND);

        assert!(!wrapper.is_hmd_present());
        assert!(!wrapper.is_runtime_installed());
        assert_eq!(wrapper.get_init_token(), 0);
        // SAFETY: the fallbacks are static C strings.
        let (description, symbol) = unsafe {
            (
                CStr::from_ptr(wrapper.init_error_as_english_description(110)),
                CStr::from_ptr(wrapper.init_error_as_symbol(110)),
            )
        };
        assert_eq!(description, UNKNOWN_ERROR);
        assert_eq!(symbol, UNKNOWN_ERROR_SYMBOL);
        wrapper.shutdown_internal();
        wrapper.shutdown();
    }

    #[test]
    fn test_null_error_slot_is_tolerated() {
        let wrapper = OpenVrWrapper::new(disabled, missing_library);
        // SAFETY: null out slot is allowed.
        let context = unsafe { wrapper.init_internal2(std::ptr::null_mut(), 1, std::ptr::null()) };
        assert!(context.is_null());
        wrapper.shutdown();
    }

    struct FixedInput {
        handle: VRActionHandle,
        value: InputAnalogActionData,
    }

    impl InputBackend for FixedInput {
        unsafe fn get_action_handle(&self, _name: *const c_char, handle: *mut VRActionHandle) -> EVRInputError {
            // SAFETY: test callers pass a valid slot.
            unsafe { handle.write(self.handle) };
            VR_INPUT_ERROR_NONE
        }

        unsafe fn get_analog_action_data(
            &self,
            _action: VRActionHandle,
            data: *mut InputAnalogActionData,
            _data_size: u32,
            _restrict_to_device: VRInputValueHandle,
        ) -> EVRInputError {
            // SAFETY: test callers pass a valid slot.
            unsafe { data.write(self.value) };
            VR_INPUT_ERROR_NONE
        }
    }

    #[test]
    fn test_classification_without_live_data_is_pass_through() {
        let wrapper = OpenVrWrapper::new(disabled, missing_library);
        let backend = FixedInput {
            handle: 0x1234,
            value: InputAnalogActionData {
                x: 0.3,
                y: -0.2,
                ..Default::default()
            },
        };
        let mut handle = 0;
        // SAFETY: valid name and slot.
        let result = unsafe { wrapper.get_action_handle(&backend, c"/actions/main/in/Move".as_ptr(), &mut handle) };
        assert_eq!(result, VR_INPUT_ERROR_NONE);
        assert_eq!(handle, 0x1234);
        assert_eq!(wrapper.tracked_actions(), 1);

        let mut data = InputAnalogActionData::default();
        let size = u32::try_from(size_of::<InputAnalogActionData>()).unwrap_or(u32::MAX);
        // SAFETY: valid slot of the declared size.
        let result = unsafe { wrapper.get_analog_action_data(&backend, handle, &mut data, size, 0) };
        assert_eq!(result, VR_INPUT_ERROR_NONE);
        let (x, y) = (data.x, data.y);
        assert!((x - 0.3).abs() < 1e-6 && (y + 0.2).abs() < 1e-6);
        wrapper.shutdown();
        assert_eq!(wrapper.tracked_actions(), 0);
    }
}
