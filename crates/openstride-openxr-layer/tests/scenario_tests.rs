//! The layer driven the way the OpenXR loader and an application drive it,
//! with a fake runtime behind it.

#![expect(unsafe_code, reason = "the fake runtime implements OpenXR C entry points")]

use std::ffi::c_char;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use openstride_config::{Config, InputMode};
use openstride_filters::RawSample;
use openstride_openxr_layer::prelude::*;
use openstride_runtime::RuntimeOptions;
use openstride_shm::{ProcessProbe, TransportOptions};
use openstride_test_helpers::prelude::*;

const PID: u32 = 52_001;
const INSTANCE: XrInstance = XrInstance(0xA11CE);

static SERIAL: Mutex<()> = Mutex::new(());
static BRIDGE: OnceLock<FakeBridgeHandle> = OnceLock::new();
static NEXT_ACTION: AtomicU64 = AtomicU64::new(100);
static NEXT_RESULT: AtomicI32 = AtomicI32::new(XR_SUCCESS);

// Native values the fake runtime reports for every action.
const NATIVE_FLOAT: f32 = 0.25;
const NATIVE_VECTOR: XrVector2f = XrVector2f { x: -0.5, y: 0.1 };

unsafe extern "system" fn next_destroy_instance(_: XrInstance) -> XrResult {
    XR_SUCCESS
}

unsafe extern "system" fn next_create_action_set(
    _: XrInstance,
    _: *const XrActionSetCreateInfo,
    action_set: *mut XrActionSet,
) -> XrResult {
    // SAFETY: the test passes a valid out slot.
    unsafe { action_set.write(XrActionSet(7)) };
    XR_SUCCESS
}

unsafe extern "system" fn next_create_action(
    _: XrActionSet,
    _: *const XrActionCreateInfo,
    action: *mut XrAction,
) -> XrResult {
    // SAFETY: the test passes a valid out slot.
    unsafe { action.write(XrAction(NEXT_ACTION.fetch_add(1, Ordering::SeqCst))) };
    XR_SUCCESS
}

unsafe extern "system" fn next_sync_actions(_: XrSession, _: *const XrActionsSyncInfo) -> XrResult {
    XR_SUCCESS
}

unsafe extern "system" fn next_get_float(
    _: XrSession,
    _: *const XrActionStateGetInfo,
    state: *mut XrActionStateFloat,
) -> XrResult {
    // SAFETY: the layer checked the pointer before calling through.
    let state = unsafe { &mut *state };
    state.current_state = NATIVE_FLOAT;
    state.is_active = XR_TRUE;
    NEXT_RESULT.load(Ordering::SeqCst)
}

unsafe extern "system" fn next_get_vector(
    _: XrSession,
    _: *const XrActionStateGetInfo,
    state: *mut XrActionStateVector2f,
) -> XrResult {
    // SAFETY: the layer checked the pointer before calling through.
    let state = unsafe { &mut *state };
    state.current_state = NATIVE_VECTOR;
    state.is_active = XR_TRUE;
    NEXT_RESULT.load(Ordering::SeqCst)
}

macro_rules! void_fn {
    ($f:expr, $ty:ty) => {{
        let f: $ty = $f;
        // SAFETY: type erasure only; the layer casts back to the same type.
        Some(unsafe { std::mem::transmute::<$ty, unsafe extern "system" fn()>(f) })
    }};
}

unsafe extern "system" fn next_gipa(_: XrInstance, name: *const c_char, function: *mut PfnVoidFunction) -> XrResult {
    // SAFETY: the layer passes NUL-terminated names.
    let name = unsafe { std::ffi::CStr::from_ptr(name) }.to_bytes();
    let found = match name {
        b"xrDestroyInstance" => void_fn!(next_destroy_instance, PfnDestroyInstance),
        b"xrGetActionStateFloat" => void_fn!(next_get_float, PfnGetActionStateFloat),
        b"xrGetActionStateVector2f" => void_fn!(next_get_vector, PfnGetActionStateVector2f),
        b"xrSyncActions" => void_fn!(next_sync_actions, PfnSyncActions),
        b"xrCreateActionSet" => void_fn!(next_create_action_set, PfnCreateActionSet),
        b"xrCreateAction" => void_fn!(next_create_action, PfnCreateAction),
        _ => None,
    };
    // SAFETY: valid out slot from the layer.
    unsafe { function.write(found) };
    if found.is_some() { XR_SUCCESS } else { XR_ERROR_FUNCTION_UNSUPPORTED }
}

unsafe extern "system" fn next_create_instance(
    _: *const XrInstanceCreateInfo,
    layer_info: *const XrApiLayerCreateInfo,
    instance: *mut XrInstance,
) -> XrResult {
    // SAFETY: the layer forwards its own copy of the create info.
    let layer_info = unsafe { &*layer_info };
    if !layer_info.next_info.is_null() {
        // This fake is the last link; the layer must have unlinked itself.
        return XR_ERROR_VALIDATION_FAILURE;
    }
    // SAFETY: valid out slot from the test.
    unsafe { instance.write(INSTANCE) };
    XR_SUCCESS
}

fn name_field<const N: usize>(name: &str) -> [c_char; N] {
    let mut field = [0 as c_char; N];
    write_fixed_name(&mut field, name);
    field
}

/// Start the layer's runtime on a fake bridge, negotiate and create an
/// instance. Runs once per test binary.
fn setup() -> FakeBridgeHandle {
    BRIDGE
        .get_or_init(|| {
            let bridge = FakeBridge::new();
            let probe: Arc<dyn ProcessProbe> = Arc::new(FakeProcessProbe::with_alive([PID]));
            let config = Config {
                deadzone: 0.0,
                speed_multiplier: 1.0,
                smoothing: 1.0,
                input_mode: InputMode::Smart,
                ..Config::default()
            };
            let options = RuntimeOptions::new("openxr-test")
                .with_config(config)
                .without_logging()
                .with_transport(TransportOptions {
                    segment_name: unique_segment_name("xr"),
                    process_id: PID,
                    poll_interval: Duration::from_millis(2),
                    ..TransportOptions::default()
                })
                .with_probe(probe)
                .with_bridge_factory(bridge.factory());
            LAYER.runtime_slot().get_or_start(|| options);

            let info = XrNegotiateLoaderInfo {
                struct_type: STRUCT_LOADER_INFO,
                struct_version: LOADER_INFO_STRUCT_VERSION,
                struct_size: size_of::<XrNegotiateLoaderInfo>(),
                min_interface_version: 1,
                max_interface_version: 1,
                min_api_version: 0,
                max_api_version: LAYER_API_VERSION,
            };
            let mut request = XrNegotiateApiLayerRequest {
                struct_type: STRUCT_API_LAYER_REQUEST,
                struct_version: API_LAYER_INFO_STRUCT_VERSION,
                struct_size: size_of::<XrNegotiateApiLayerRequest>(),
                layer_interface_version: 0,
                layer_api_version: 0,
                get_instance_proc_addr: None,
                create_api_layer_instance: None,
            };
            // SAFETY: locals outlive the call.
            let negotiated = unsafe { xrNegotiateLoaderApiLayerInterface(&info, c"openstride".as_ptr(), &mut request) };
            assert_eq!(negotiated, XR_SUCCESS);
            let create = must_some(request.create_api_layer_instance, "negotiation hands back create");

            let mut next = XrApiLayerNextInfo {
                struct_type: STRUCT_API_LAYER_NEXT_INFO,
                struct_version: 1,
                struct_size: size_of::<XrApiLayerNextInfo>(),
                layer_name: name_field("runtime"),
                next_get_instance_proc_addr: Some(next_gipa),
                next_create_api_layer_instance: Some(next_create_instance),
                next: std::ptr::null_mut(),
            };
            let layer_info = XrApiLayerCreateInfo {
                struct_type: STRUCT_API_LAYER_CREATE_INFO,
                struct_version: 1,
                struct_size: size_of::<XrApiLayerCreateInfo>(),
                loader_instance: std::ptr::null_mut(),
                settings_file_location: name_field(""),
                next_info: &mut next,
            };
            let create_info = std::ptr::NonNull::<XrInstanceCreateInfo>::dangling();
            let mut instance = XrInstance::NULL;
            // SAFETY: the create info is opaque to the layer and only forwarded.
            let created = unsafe { create(create_info.as_ptr(), &layer_info, &mut instance) };
            assert_eq!(created, XR_SUCCESS);
            assert_eq!(instance, INSTANCE);

            bridge.handle()
        })
        .clone()
}

fn resolve<T>(name: &std::ffi::CStr) -> T {
    let mut function: PfnVoidFunction = None;
    // SAFETY: valid name and out slot.
    let result = unsafe { openstride_openxr_layer::layer_get_instance_proc_addr(INSTANCE, name.as_ptr(), &mut function) };
    assert_eq!(result, XR_SUCCESS);
    let function = must_some(function, "intercepted function resolved");
    // SAFETY: the layer registered a function of type `T` under `name`.
    unsafe { std::mem::transmute_copy::<unsafe extern "system" fn(), T>(&function) }
}

fn create_action(name: &str) -> XrAction {
    let create: PfnCreateAction = resolve(c"xrCreateAction");
    let info = XrActionCreateInfo {
        ty: 0,
        next: std::ptr::null(),
        action_name: name_field(name),
        action_type: 3,
        count_subaction_paths: 0,
        subaction_paths: std::ptr::null(),
        localized_action_name: name_field(name),
    };
    let mut action = XrAction::NULL;
    // SAFETY: locals outlive the call.
    assert_eq!(unsafe { create(XrActionSet(7), &info, &mut action) }, XR_SUCCESS);
    action
}

fn read_float(action: XrAction) -> (XrResult, XrActionStateFloat) {
    let get: PfnGetActionStateFloat = resolve(c"xrGetActionStateFloat");
    let info = XrActionStateGetInfo {
        ty: 0,
        next: std::ptr::null(),
        action,
        subaction_path: 0,
    };
    let mut state = XrActionStateFloat {
        ty: 0,
        next: std::ptr::null_mut(),
        current_state: 0.0,
        changed_since_last_sync: 0,
        last_change_time: 0,
        is_active: XR_FALSE,
    };
    // SAFETY: locals outlive the call.
    let result = unsafe { get(XrSession(1), &info, &mut state) };
    (result, state)
}

fn read_vector(action: XrAction) -> (XrResult, XrActionStateVector2f) {
    let get: PfnGetActionStateVector2f = resolve(c"xrGetActionStateVector2f");
    let info = XrActionStateGetInfo {
        ty: 0,
        next: std::ptr::null(),
        action,
        subaction_path: 0,
    };
    let mut state = XrActionStateVector2f {
        ty: 0,
        next: std::ptr::null_mut(),
        current_state: XrVector2f::default(),
        changed_since_last_sync: 0,
        last_change_time: 0,
        is_active: XR_FALSE,
    };
    // SAFETY: locals outlive the call.
    let result = unsafe { get(XrSession(1), &info, &mut state) };
    (result, state)
}

fn walk_forward(bridge: &FakeBridgeHandle) {
    assert!(bridge.emit(RawSample::new(0.0, 127, 0)));
}

fn stand_still(bridge: &FakeBridgeHandle) {
    assert!(bridge.emit(RawSample::new(0.0, 127, 127)));
}

#[test]
fn test_movement_vector_receives_treadmill_motion() -> TestResult {
    let _serial = SERIAL.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let bridge = setup();
    let action = create_action("move");

    walk_forward(&bridge);
    let (result, state) = read_vector(action);

    assert_eq!(result, XR_SUCCESS);
    assert!(state.current_state.x.abs() < 0.01);
    assert!(state.current_state.y > 0.9);
    assert_eq!(state.is_active, XR_TRUE);
    Ok(())
}

#[test]
fn test_idle_treadmill_leaves_native_input() -> TestResult {
    let _serial = SERIAL.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let bridge = setup();
    let action = create_action("locomotion");

    stand_still(&bridge);
    let (_, state) = read_vector(action);

    assert_eq!(state.current_state, NATIVE_VECTOR);
    Ok(())
}

#[test]
fn test_float_actions_pick_axis_by_name() -> TestResult {
    let _serial = SERIAL.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let bridge = setup();
    let forward = create_action("walk_forward");
    let strafe = create_action("walk_strafe");

    walk_forward(&bridge);
    let (_, forward_state) = read_float(forward);
    let (_, strafe_state) = read_float(strafe);

    assert!(forward_state.current_state > 0.9);
    assert_eq!(forward_state.is_active, XR_TRUE);
    // The strafe axis is idle, so Smart keeps the native value.
    assert!((strafe_state.current_state - NATIVE_FLOAT).abs() < f32::EPSILON);
    Ok(())
}

#[test]
fn test_other_actions_are_untouched() -> TestResult {
    let _serial = SERIAL.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let bridge = setup();
    let grab = create_action("grab_object");

    walk_forward(&bridge);
    let (_, state) = read_vector(grab);

    assert_eq!(state.current_state, NATIVE_VECTOR);
    Ok(())
}

#[test]
fn test_failed_call_through_is_returned_unmodified() -> TestResult {
    let _serial = SERIAL.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let bridge = setup();
    let action = create_action("move");

    walk_forward(&bridge);
    NEXT_RESULT.store(XR_ERROR_HANDLE_INVALID, Ordering::SeqCst);
    let (result, state) = read_vector(action);
    NEXT_RESULT.store(XR_SUCCESS, Ordering::SeqCst);

    assert_eq!(result, XR_ERROR_HANDLE_INVALID);
    assert_eq!(state.current_state, NATIVE_VECTOR);
    Ok(())
}

#[test]
fn test_null_arguments_fail_validation() -> TestResult {
    let _serial = SERIAL.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    setup();
    let get: PfnGetActionStateFloat = resolve(c"xrGetActionStateFloat");

    // SAFETY: the layer checks for null before calling through.
    let result = unsafe { get(XrSession(1), std::ptr::null(), std::ptr::null_mut()) };
    assert_eq!(result, XR_ERROR_VALIDATION_FAILURE);
    Ok(())
}

#[test]
fn test_unknown_functions_forward_to_next_layer() -> TestResult {
    let _serial = SERIAL.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    setup();
    let mut function: PfnVoidFunction = None;

    // SAFETY: valid name and out slot.
    let result = unsafe {
        openstride_openxr_layer::layer_get_instance_proc_addr(INSTANCE, c"xrLocateSpace".as_ptr(), &mut function)
    };

    assert_eq!(result, XR_ERROR_FUNCTION_UNSUPPORTED);
    assert!(function.is_none());
    Ok(())
}

#[test]
fn test_destroy_instance_forgets_classifications() -> TestResult {
    let _serial = SERIAL.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let bridge = setup();
    let action = create_action("move");
    assert!(LAYER.tracked_actions() > 0);

    let destroy: PfnDestroyInstance = resolve(c"xrDestroyInstance");
    // SAFETY: plain handle.
    assert_eq!(unsafe { destroy(INSTANCE) }, XR_SUCCESS);
    assert_eq!(LAYER.tracked_actions(), 0);

    walk_forward(&bridge);
    let (_, state) = read_vector(action);
    assert_eq!(state.current_state, NATIVE_VECTOR);
    Ok(())
}
