//! The driver loaded the way SteamVR loads it: `HmdDriverFactory`, then the
//! provider and device vtables, against a fake driver context.

#![expect(unsafe_code, reason = "fake driver context objects are C++ vtables")]

use std::collections::HashMap;
use std::ffi::{CStr, c_char, c_int, c_void};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use openstride_config::Config;
use openstride_filters::RawSample;
use openstride_runtime::RuntimeOptions;
use openstride_shm::{ProcessProbe, TransportOptions};
use openstride_steamvr_driver::prelude::*;
use openstride_steamvr_driver::{CONTROLLER_OBJECT, TRACKER_OBJECT};
use openstride_test_helpers::prelude::*;

const PID: u32 = 61_002;
const HMD_POSITION: [f32; 3] = [0.5, 1.7, -0.25];

static SERIAL: Mutex<()> = Mutex::new(());
static FIXTURE: OnceLock<FakeBridgeHandle> = OnceLock::new();
static RECORD: Mutex<Record> = Mutex::new(Record::new());

/// What the fake SteamVR saw.
struct Record {
    added: Vec<(String, i32, TrackedDeviceIndex)>,
    poses: Vec<(TrackedDeviceIndex, DriverPose)>,
    property_batches: Vec<(PropertyContainerHandle, Vec<ETrackedDeviceProperty>)>,
    scalars: Vec<(VRInputComponentHandle, String)>,
    scalar_values: Vec<(VRInputComponentHandle, f32)>,
    log: Vec<String>,
}

impl Record {
    const fn new() -> Self {
        Self {
            added: Vec::new(),
            poses: Vec::new(),
            property_batches: Vec::new(),
            scalars: Vec::new(),
            scalar_values: Vec::new(),
            log: Vec::new(),
        }
    }

    fn scalar_handle(&self, name: &str) -> Option<VRInputComponentHandle> {
        self.scalars.iter().find(|(_, n)| n == name).map(|(handle, _)| *handle)
    }

    fn last_value(&self, handle: VRInputComponentHandle) -> Option<f32> {
        self.scalar_values.iter().rev().find(|(h, _)| *h == handle).map(|(_, v)| *v)
    }

    fn last_pose(&self, device: TrackedDeviceIndex) -> Option<DriverPose> {
        self.poses.iter().rev().find(|(d, _)| *d == device).map(|(_, pose)| *pose)
    }

    fn device(&self, serial: &str) -> Option<TrackedDeviceIndex> {
        self.added.iter().find(|(s, _, _)| s == serial).map(|(_, _, id)| *id)
    }
}

fn record() -> MutexGuard<'static, Record> {
    RECORD.lock().unwrap_or_else(PoisonError::into_inner)
}

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

#[repr(C)]
struct FakeObject {
    vtable: *const *const c_void,
}

fn fake_object(len: usize, entries: &[(usize, *const c_void)]) -> *mut c_void {
    let mut vtable = vec![std::ptr::null::<c_void>(); len];
    for &(index, entry) in entries {
        vtable[index] = entry;
    }
    let vtable = Box::leak(vtable.into_boxed_slice());
    Box::into_raw(Box::new(FakeObject {
        vtable: vtable.as_ptr(),
    }))
    .cast::<c_void>()
}

/// Interface objects by version, shared with the context's lookup.
struct Interfaces(HashMap<&'static str, usize>);

static INTERFACES: OnceLock<Interfaces> = OnceLock::new();

unsafe fn text(ptr: *const c_char) -> String {
    // SAFETY: the driver passes C strings.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

unsafe extern "C" fn fake_get_generic_interface(
    _this: *mut c_void,
    version: *const c_char,
    error: *mut c_int,
) -> *mut c_void {
    // SAFETY: as above.
    let version = unsafe { text(version) };
    let object = INTERFACES
        .get()
        .and_then(|interfaces| interfaces.0.get(version.as_str()).copied())
        .unwrap_or(0);
    if object == 0 {
        // SAFETY: the driver passes its out slot.
        unsafe { error.write(VR_INIT_ERROR_INTERFACE_NOT_FOUND) };
    }
    object as *mut c_void
}

const SETTINGS_NOT_FOUND: i32 = 1;

unsafe extern "C" fn fake_get_bool(
    _this: *mut c_void,
    _section: *const c_char,
    key: *const c_char,
    error: *mut i32,
) -> bool {
    // SAFETY: as above.
    match unsafe { text(key) }.as_str() {
        "debug" => false,
        _ => {
            // SAFETY: the driver passes its out slot.
            unsafe { error.write(SETTINGS_NOT_FOUND) };
            false
        }
    }
}

unsafe extern "C" fn fake_get_float(
    _this: *mut c_void,
    _section: *const c_char,
    key: *const c_char,
    error: *mut i32,
) -> f32 {
    // SAFETY: as above.
    match unsafe { text(key) }.as_str() {
        "speed_factor" => 1.0,
        "smoothing_factor" => 1.0,
        _ => {
            // SAFETY: the driver passes its out slot.
            unsafe { error.write(SETTINGS_NOT_FOUND) };
            0.0
        }
    }
}

unsafe extern "C" fn fake_get_string(
    _this: *mut c_void,
    _section: *const c_char,
    _key: *const c_char,
    _value: *mut c_char,
    _value_len: u32,
    error: *mut i32,
) {
    // SAFETY: the driver passes its out slot.
    unsafe { error.write(SETTINGS_NOT_FOUND) };
}

unsafe extern "C" fn fake_tracked_device_added(
    _this: *mut c_void,
    serial: *const c_char,
    class: i32,
    device: *mut c_void,
) -> bool {
    // SAFETY: as above.
    let serial = unsafe { text(serial) };
    let id = {
        let mut record = record();
        let id = u32::try_from(record.added.len()).unwrap_or(u32::MAX) + 1;
        record.added.push((serial, class, id));
        id
    };
    // SteamVR activates the device right away.
    // SAFETY: the driver hands over an ITrackedDeviceServerDriver.
    let vtable = unsafe { device.cast::<VtableObject<TrackedDeviceServerDriverVtable>>().read() }.vtable;
    // SAFETY: the object's own Activate.
    unsafe { (vtable.activate)(device, id) == VR_INIT_ERROR_NONE }
}

unsafe extern "C" fn fake_pose_updated(
    _this: *mut c_void,
    device: TrackedDeviceIndex,
    pose: *const DriverPose,
    _size: u32,
) {
    // SAFETY: the driver passes a live pose.
    let pose = unsafe { pose.read() };
    record().poses.push((device, pose));
}

unsafe extern "C" fn fake_raw_poses(
    _this: *mut c_void,
    _predicted: f32,
    poses: *mut TrackedDevicePose,
    count: u32,
) {
    if count == 0 {
        return;
    }
    let mut hmd = TrackedDevicePose {
        pose_is_valid: true,
        device_is_connected: true,
        ..TrackedDevicePose::default()
    };
    for (row, value) in HMD_POSITION.iter().enumerate() {
        hmd.device_to_absolute_tracking.m[row][3] = *value;
    }
    // SAFETY: the driver passes `count >= 1` slots.
    unsafe { poses.write(hmd) };
}

unsafe extern "C" fn fake_write_batch(
    _this: *mut c_void,
    container: PropertyContainerHandle,
    batch: *mut PropertyWrite,
    count: u32,
) -> i32 {
    // SAFETY: the driver passes `count` entries.
    let entries = unsafe { std::slice::from_raw_parts(batch, count as usize) };
    let props = entries.iter().map(|entry| entry.prop).collect();
    record().property_batches.push((container, props));
    TRACKED_PROP_SUCCESS
}

unsafe extern "C" fn fake_to_container(_this: *mut c_void, device: TrackedDeviceIndex) -> PropertyContainerHandle {
    0x1000 + u64::from(device)
}

unsafe extern "C" fn fake_create_scalar(
    _this: *mut c_void,
    _container: PropertyContainerHandle,
    name: *const c_char,
    handle: *mut VRInputComponentHandle,
    _scalar_type: i32,
    _units: i32,
) -> i32 {
    // SAFETY: as above.
    let name = unsafe { text(name) };
    let mut record = record();
    let next = record.scalars.len() as u64 + 7;
    record.scalars.push((next, name));
    // SAFETY: the driver passes its out slot.
    unsafe { handle.write(next) };
    VR_INPUT_ERROR_NONE
}

unsafe extern "C" fn fake_update_scalar(
    _this: *mut c_void,
    handle: VRInputComponentHandle,
    value: f32,
    _offset: f64,
) -> i32 {
    record().scalar_values.push((handle, value));
    VR_INPUT_ERROR_NONE
}

unsafe extern "C" fn fake_log(_this: *mut c_void, message: *const c_char) {
    // SAFETY: as above.
    let message = unsafe { text(message) };
    record().log.push(message);
}

fn context() -> *mut c_void {
    INTERFACES.get_or_init(|| {
        let objects = [
            (
                SETTINGS_VERSION,
                fake_object(
                    9,
                    &[
                        (5, fake_get_bool as *const c_void),
                        (7, fake_get_float as *const c_void),
                        (8, fake_get_string as *const c_void),
                    ],
                ),
            ),
            (
                SERVER_DRIVER_HOST_VERSION,
                fake_object(
                    7,
                    &[
                        (0, fake_tracked_device_added as *const c_void),
                        (1, fake_pose_updated as *const c_void),
                        (6, fake_raw_poses as *const c_void),
                    ],
                ),
            ),
            (
                PROPERTIES_VERSION,
                fake_object(
                    4,
                    &[
                        (1, fake_write_batch as *const c_void),
                        (3, fake_to_container as *const c_void),
                    ],
                ),
            ),
            (
                DRIVER_INPUT_VERSION,
                fake_object(
                    4,
                    &[
                        (2, fake_create_scalar as *const c_void),
                        (3, fake_update_scalar as *const c_void),
                    ],
                ),
            ),
            (DRIVER_LOG_VERSION, fake_object(1, &[(0, fake_log as *const c_void)])),
        ];
        Interfaces(objects.into_iter().map(|(version, object)| (version, object as usize)).collect())
    });
    static CONTEXT: OnceLock<usize> = OnceLock::new();
    *CONTEXT.get_or_init(|| fake_object(1, &[(0, fake_get_generic_interface as *const c_void)]) as usize) as *mut c_void
}

fn provider() -> *mut c_void {
    let mut code = -1;
    // SAFETY: valid C string and out slot.
    let provider = unsafe { HmdDriverFactory(c"IServerTrackedDeviceProvider_004".as_ptr(), &mut code) };
    assert!(!provider.is_null());
    provider
}

fn provider_vtable() -> &'static ServerTrackedDeviceProviderVtable {
    // SAFETY: the factory hands out a provider object.
    unsafe { provider().cast::<VtableObject<ServerTrackedDeviceProviderVtable>>().read() }.vtable
}

/// Pre-start the driver's runtime on a fake bridge, then `Init` through the
/// provider vtable. Runs once per test binary.
fn setup() -> FakeBridgeHandle {
    FIXTURE
        .get_or_init(|| {
            let bridge = FakeBridge::new();
            let probe: Arc<dyn ProcessProbe> = Arc::new(FakeProcessProbe::with_alive([PID]));
            let config = Config {
                deadzone: 0.0,
                speed_multiplier: 1.0,
                smoothing: 1.0,
                ..Config::default()
            };
            let options = RuntimeOptions::new("steamvr-test")
                .with_config(config)
                .without_logging()
                .with_transport(TransportOptions {
                    segment_name: unique_segment_name("driver"),
                    process_id: PID,
                    poll_interval: Duration::from_millis(2),
                    ..TransportOptions::default()
                })
                .with_probe(probe)
                .with_bridge_factory(bridge.factory());
            DRIVER.runtime_slot().get_or_start(|| options);

            let provider = provider();
            // SAFETY: the provider's own Init with a complete fake context.
            let result = unsafe { (provider_vtable().init)(provider, context()) };
            assert_eq!(result, VR_INIT_ERROR_NONE);
            bridge.handle()
        })
        .clone()
}

fn run_frame() {
    // SAFETY: the provider's own RunFrame.
    unsafe { (provider_vtable().run_frame)(provider()) };
}

fn device_vtable(object: &'static VtableObject<TrackedDeviceServerDriverVtable>) -> (*mut c_void, &'static TrackedDeviceServerDriverVtable) {
    (std::ptr::from_ref(object).cast_mut().cast::<c_void>(), object.vtable)
}

fn debug_request(object: &'static VtableObject<TrackedDeviceServerDriverVtable>, request: &CStr) -> String {
    let (this, vtable) = device_vtable(object);
    let mut buffer = [0 as c_char; 64];
    // SAFETY: the object's own DebugRequest with a 64-byte buffer.
    unsafe { (vtable.debug_request)(this, request.as_ptr(), buffer.as_mut_ptr(), 64) };
    // SAFETY: the driver terminates the answer.
    unsafe { CStr::from_ptr(buffer.as_ptr()) }.to_string_lossy().into_owned()
}

fn get_pose(object: &'static VtableObject<TrackedDeviceServerDriverVtable>) -> DriverPose {
    let (this, vtable) = device_vtable(object);
    let mut out = DriverPose::default();
    // SAFETY: the object's own GetPose with a pose-sized return slot.
    #[cfg(windows)]
    let returned = unsafe { (vtable.get_pose)(this, &mut out) };
    // SAFETY: as above.
    #[cfg(not(windows))]
    let returned = unsafe { (vtable.get_pose)(&mut out, this) };
    assert_eq!(returned, &raw mut out);
    out
}

#[test]
fn test_factory_only_provides_the_device_provider() -> TestResult {
    let _serial = serial();
    let mut code = 0;
    // SAFETY: valid C string and out slot.
    let other = unsafe { HmdDriverFactory(c"IVRWatchdogProvider_001".as_ptr(), &mut code) };
    assert!(other.is_null());
    assert_eq!(code, VR_INIT_ERROR_INTERFACE_NOT_FOUND);

    // SAFETY: null name and out slot are tolerated.
    assert!(unsafe { HmdDriverFactory(std::ptr::null(), std::ptr::null_mut()) }.is_null());

    let versions = {
        // SAFETY: the provider's own GetInterfaceVersions.
        let list = unsafe { (provider_vtable().get_interface_versions)(provider()) };
        let mut versions = Vec::new();
        for index in 0.. {
            // SAFETY: the list is null-terminated.
            let entry = unsafe { list.add(index).read() };
            if entry.is_null() {
                break;
            }
            // SAFETY: entries are C strings.
            versions.push(unsafe { text(entry) });
        }
        versions
    };
    assert!(versions.contains(&"IServerTrackedDeviceProvider_004".to_string()));
    assert!(versions.contains(&"ITrackedDeviceServerDriver_005".to_string()));
    Ok(())
}

#[test]
fn test_init_registers_and_activates_both_devices() -> TestResult {
    let _serial = serial();
    setup();
    let record = record();

    let controller = must_some(record.device("treadmill_controller"), "controller registered");
    let tracker = must_some(record.device("treadmill_visual_tracker"), "tracker registered");
    assert_ne!(controller, tracker);
    assert!(record.added.iter().any(|(_, class, id)| *id == controller && *class == TRACKED_DEVICE_CLASS_CONTROLLER));
    assert!(record.added.iter().any(|(_, class, id)| *id == tracker && *class == TRACKED_DEVICE_CLASS_GENERIC_TRACKER));
    assert_eq!(DRIVER.active_devices(), (Some(controller), Some(tracker)));

    assert!(record.scalar_handle("/input/joystick/x").is_some());
    assert!(record.scalar_handle("/input/joystick/y").is_some());

    let controller_props = must_some(
        record
            .property_batches
            .iter()
            .find(|(container, _)| *container == 0x1000 + u64::from(controller)),
        "controller properties written",
    );
    assert!(controller_props.1.contains(&prop::CONTROLLER_ROLE_HINT_INT32));
    assert!(controller_props.1.contains(&prop::INPUT_PROFILE_PATH_STRING));
    assert!(record.log.iter().any(|line| line.contains("Init called")));

    // Settings from the fake host reached the tunables.
    assert!(!DRIVER.tunables().debug());
    Ok(())
}

#[test]
fn test_run_frame_pushes_treadmill_joystick() -> TestResult {
    let _serial = serial();
    let bridge = setup();

    assert!(bridge.emit(RawSample::new(0.0, 127, 0)));
    run_frame();

    let record = record();
    let x = must_some(record.scalar_handle("/input/joystick/x"), "x input");
    let y = must_some(record.scalar_handle("/input/joystick/y"), "y input");
    let forward = must_some(record.last_value(y), "y pushed");
    let sideways = must_some(record.last_value(x), "x pushed");
    assert!(forward > 0.9, "forward {forward}");
    assert!(sideways.abs() < 0.01, "sideways {sideways}");

    let controller = must_some(record.device("treadmill_controller"), "controller registered");
    let pose = must_some(record.last_pose(controller), "controller pose");
    assert!(pose.pose_is_valid);
    assert!(pose.device_is_connected);
    Ok(())
}

#[test]
fn test_idle_treadmill_centres_the_joystick() -> TestResult {
    let _serial = serial();
    let bridge = setup();

    assert!(bridge.emit(RawSample::new(0.0, 127, 127)));
    run_frame();

    let record = record();
    let y = must_some(record.scalar_handle("/input/joystick/y"), "y input");
    let value = must_some(record.last_value(y), "y pushed");
    assert!(value.abs() < 0.01, "idle {value}");
    Ok(())
}

#[test]
fn test_tracker_follows_the_hmd() -> TestResult {
    let _serial = serial();
    setup();
    run_frame();

    let tracker = must_some(record().device("treadmill_visual_tracker"), "tracker registered");
    let pushed = must_some(record().last_pose(tracker), "tracker pose");
    let polled = get_pose(&TRACKER_OBJECT);

    for pose in [pushed, polled] {
        assert!((pose.position[0] - f64::from(HMD_POSITION[0])).abs() < 1e-6);
        assert!((pose.position[1] - (f64::from(HMD_POSITION[1]) - 0.3)).abs() < 1e-6);
        assert!((pose.position[2] - (f64::from(HMD_POSITION[2]) - 0.5)).abs() < 1e-6);
    }
    Ok(())
}

#[test]
fn test_controller_pose_carries_the_heading() -> TestResult {
    let _serial = serial();
    let bridge = setup();

    assert!(bridge.emit(RawSample::new(90.0, 127, 127)));
    run_frame();

    let pose = get_pose(&CONTROLLER_OBJECT);
    assert_eq!(pose.position, [0.0; 3]);
    let half = std::f64::consts::FRAC_PI_4;
    assert!((pose.rotation.w - half.cos()).abs() < 1e-3, "{:?}", pose.rotation);
    assert!((pose.rotation.y + half.sin()).abs() < 1e-3, "{:?}", pose.rotation);
    Ok(())
}

#[test]
fn test_debug_requests_through_the_vtable() -> TestResult {
    let _serial = serial();
    setup();

    assert_eq!(debug_request(&CONTROLLER_OBJECT, c"speed 1.5"), "SPEED=1.5");
    assert_eq!(debug_request(&CONTROLLER_OBJECT, c"smoothing 2"), "Invalid SMOOTHING (0.0-1.0)");
    assert_eq!(debug_request(&CONTROLLER_OBJECT, c"jump"), "Unknown command");
    assert_eq!(debug_request(&CONTROLLER_OBJECT, c""), "No request");
    assert_eq!(debug_request(&TRACKER_OBJECT, c"speed 3"), "VisualTracker");
    assert!((DRIVER.tunables().speed_factor() - 1.5).abs() < f32::EPSILON);

    assert_eq!(debug_request(&CONTROLLER_OBJECT, c"speed 1"), "SPEED=1");
    Ok(())
}
