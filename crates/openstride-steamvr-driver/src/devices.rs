//! The two tracked devices the driver registers.

use openstride_errors::HostError;

use crate::diagnostic::DirectionDiagnostic;
use crate::ffi::{
    CONTROLLER_AXIS_NONE, CONTROLLER_ROLE_INVALID, CONTROLLER_ROLE_TREADMILL, DriverPose, HmdQuaternion,
    TRACKED_DEVICE_CLASS_CONTROLLER, TRACKED_DEVICE_CLASS_GENERIC_TRACKER, TRACKING_RESULT_RUNNING_OK,
    TrackedDeviceIndex, TrackedDevicePose, VRInputComponentHandle, prop,
};
use crate::host::{DriverHost, Property, PropertyValue};
use crate::motion::{DriverMotion, expected_direction, yaw_quaternion};

/// Frames between two periodic input or pose log lines.
pub const LOG_INTERVAL_FRAMES: u64 = 50;

/// Serial the controller is registered under.
pub const CONTROLLER_REGISTRATION_SERIAL: &str = "treadmill_controller";
/// Serial number property of the controller.
pub const CONTROLLER_SERIAL_NUMBER: &str = "treadmill_xy";
/// Controller type, also its render model.
pub const CONTROLLER_TYPE: &str = "treadmill_controller";
/// Input profile of the controller.
pub const CONTROLLER_INPUT_PROFILE: &str = "{treadmill}/input/treadmill_profile.json";
/// Tracking system both devices report.
pub const TRACKING_SYSTEM_NAME: &str = "treadmill";
/// Scalar input paths, x then y.
pub const JOYSTICK_PATHS: [&str; 2] = ["/input/joystick/x", "/input/joystick/y"];

/// Serial the visual tracker is registered under.
pub const TRACKER_REGISTRATION_SERIAL: &str = "treadmill_visual_tracker";
/// Serial number property of the visual tracker.
pub const TRACKER_SERIAL_NUMBER: &str = "treadmill_visual_001";
/// Model number of the visual tracker.
pub const TRACKER_MODEL_NUMBER: &str = "Treadmill_Orientation_Tracker";
/// Offset from the HMD: lower and in front of the user.
pub const TRACKER_HMD_OFFSET: [f64; 3] = [0.0, -0.3, -0.5];
/// Tracker position while the HMD pose is invalid.
pub const TRACKER_FALLBACK_POSITION: [f64; 3] = [0.0, 1.2, -0.5];

/// Valid, connected, unmoving pose with identity frames.
pub fn base_pose() -> DriverPose {
    DriverPose {
        world_from_driver_rotation: HmdQuaternion::IDENTITY,
        driver_from_head_rotation: HmdQuaternion::IDENTITY,
        rotation: HmdQuaternion::IDENTITY,
        result: TRACKING_RESULT_RUNNING_OK,
        pose_is_valid: true,
        device_is_connected: true,
        ..DriverPose::default()
    }
}

/// The invisible controller whose joystick carries the treadmill motion and
/// whose orientation carries the treadmill heading.
#[derive(Debug)]
pub struct TreadmillController {
    model_number: String,
    object_id: Option<TrackedDeviceIndex>,
    joystick: [Option<VRInputComponentHandle>; 2],
    frames: u64,
}

impl TreadmillController {
    /// Inactive controller.
    pub const fn new() -> Self {
        Self {
            model_number: String::new(),
            object_id: None,
            joystick: [None, None],
            frames: 0,
        }
    }

    /// Model number reported on activation.
    pub fn set_model_number(&mut self, model_number: &str) {
        self.model_number = model_number.to_string();
    }

    /// Device index while active.
    pub fn object_id(&self) -> Option<TrackedDeviceIndex> {
        self.object_id
    }

    /// Properties written on activation.
    pub fn properties(&self) -> Vec<Property> {
        vec![
            (prop::DEVICE_CLASS_INT32, TRACKED_DEVICE_CLASS_CONTROLLER.into()),
            (prop::CONTROLLER_TYPE_STRING, CONTROLLER_TYPE.into()),
            (prop::INPUT_PROFILE_PATH_STRING, CONTROLLER_INPUT_PROFILE.into()),
            (prop::SERIAL_NUMBER_STRING, CONTROLLER_SERIAL_NUMBER.into()),
            (prop::TRACKING_SYSTEM_NAME_STRING, TRACKING_SYSTEM_NAME.into()),
            (prop::MODEL_NUMBER_STRING, self.model_number.as_str().into()),
            (prop::RENDER_MODEL_NAME_STRING, CONTROLLER_TYPE.into()),
            (prop::CONTROLLER_ROLE_HINT_INT32, CONTROLLER_ROLE_TREADMILL.into()),
            (prop::HAS_DISPLAY_COMPONENT_BOOL, false.into()),
            (prop::HAS_CAMERA_COMPONENT_BOOL, false.into()),
            (prop::HAS_DRIVER_DIRECT_MODE_COMPONENT_BOOL, false.into()),
            (prop::HAS_VIRTUAL_DISPLAY_COMPONENT_BOOL, false.into()),
        ]
    }

    /// Write the properties and create both joystick inputs. Failures are
    /// logged; the device stays active without the failed parts.
    pub fn activate(&mut self, host: &dyn DriverHost, object_id: TrackedDeviceIndex) {
        self.object_id = Some(object_id);
        self.frames = 0;
        let container = host.property_container(object_id);
        tracing::info!(object_id, container, "Treadmill controller activating");

        if let Err(err) = host.set_properties(container, &self.properties()) {
            tracing::warn!(error = %err, "Controller properties incomplete");
        }
        for (slot, path) in self.joystick.iter_mut().zip(JOYSTICK_PATHS) {
            *slot = match host.create_scalar_component(container, path) {
                Ok(handle) => Some(handle),
                Err(err) => {
                    tracing::warn!(path, error = %err, "Joystick input not created");
                    None
                }
            };
        }
        host.log(&format!("treadmill: controller activated, objectId={object_id}"));
    }

    /// Stop reporting.
    pub fn deactivate(&mut self) {
        if let Some(object_id) = self.object_id.take() {
            tracing::info!(object_id, "Treadmill controller deactivated");
        }
        self.joystick = [None, None];
    }

    /// Push the joystick values for this frame. Returns what was pushed, or
    /// `None` while inactive.
    pub fn update_inputs(&mut self, host: &dyn DriverHost, motion: DriverMotion, speed_factor: f32) -> Option<(f32, f32)> {
        self.object_id?;
        let (x, y) = motion.joystick(speed_factor);
        for (handle, value, axis) in [(self.joystick[0], x, "x"), (self.joystick[1], y, "y")] {
            let Some(handle) = handle else { continue };
            if let Err(err) = host.update_scalar_component(handle, value) {
                tracing::debug!(axis, error = %err, "Joystick update failed");
            }
        }

        self.frames = self.frames.wrapping_add(1);
        if self.frames.is_multiple_of(LOG_INTERVAL_FRAMES) {
            tracing::trace!(frame = self.frames, yaw = motion.yaw, x, y, "Controller input");
        }
        Some((x, y))
    }

    /// Pose at the origin, rotated to the treadmill heading.
    pub fn pose(&self, motion: DriverMotion) -> DriverPose {
        DriverPose {
            rotation: yaw_quaternion(motion.yaw),
            ..base_pose()
        }
    }
}

impl Default for TreadmillController {
    fn default() -> Self {
        Self::new()
    }
}

/// A visible tracker in front of the user that shows the treadmill heading.
#[derive(Debug)]
pub struct VisualTracker {
    object_id: Option<TrackedDeviceIndex>,
    diagnostic: DirectionDiagnostic,
    frames: u64,
}

const NAMED_ICONS: [(i32, &str); 8] = [
    (prop::NAMED_ICON_PATH_DEVICE_OFF_STRING, "{htc}/icons/tracker_status_off.png"),
    (prop::NAMED_ICON_PATH_DEVICE_SEARCHING_STRING, "{htc}/icons/tracker_status_searching.gif"),
    (prop::NAMED_ICON_PATH_DEVICE_SEARCHING_ALERT_STRING, "{htc}/icons/tracker_status_searching_alert.gif"),
    (prop::NAMED_ICON_PATH_DEVICE_READY_STRING, "{htc}/icons/tracker_status_ready.png"),
    (prop::NAMED_ICON_PATH_DEVICE_READY_ALERT_STRING, "{htc}/icons/tracker_status_ready_alert.png"),
    (prop::NAMED_ICON_PATH_DEVICE_NOT_READY_STRING, "{htc}/icons/tracker_status_error.png"),
    (prop::NAMED_ICON_PATH_DEVICE_STANDBY_STRING, "{htc}/icons/tracker_status_standby.png"),
    (prop::NAMED_ICON_PATH_DEVICE_ALERT_LOW_STRING, "{htc}/icons/tracker_status_ready_low.png"),
];

impl VisualTracker {
    /// Inactive tracker.
    pub const fn new() -> Self {
        Self {
            object_id: None,
            diagnostic: DirectionDiagnostic::new(),
            frames: 0,
        }
    }

    /// Device index while active.
    pub fn object_id(&self) -> Option<TrackedDeviceIndex> {
        self.object_id
    }

    /// Properties written on activation.
    pub fn properties() -> Vec<Property> {
        let mut properties: Vec<Property> = vec![
            (prop::DEVICE_CLASS_INT32, TRACKED_DEVICE_CLASS_GENERIC_TRACKER.into()),
            (prop::TRACKING_SYSTEM_NAME_STRING, TRACKING_SYSTEM_NAME.into()),
            (prop::MODEL_NUMBER_STRING, TRACKER_MODEL_NUMBER.into()),
            (prop::SERIAL_NUMBER_STRING, TRACKER_SERIAL_NUMBER.into()),
            (prop::RENDER_MODEL_NAME_STRING, "{htc}vr_tracker_vive_1_0".into()),
            (prop::MANUFACTURER_NAME_STRING, "Treadmill".into()),
        ];
        properties.extend(NAMED_ICONS.iter().map(|&(id, path)| (id, PropertyValue::from(path))));
        properties.extend([
            (prop::WILL_DRIFT_IN_YAW_BOOL, false.into()),
            (prop::DEVICE_IS_WIRELESS_BOOL, false.into()),
            (prop::DEVICE_IS_CHARGING_BOOL, false.into()),
            (prop::DEVICE_BATTERY_PERCENTAGE_FLOAT, 1.0f32.into()),
            (prop::IDENTIFIABLE_BOOL, true.into()),
        ]);
        properties.extend((0..5).map(|axis| (prop::AXIS0_TYPE_INT32 + axis, PropertyValue::from(CONTROLLER_AXIS_NONE))));
        properties.push((prop::CONTROLLER_ROLE_HINT_INT32, CONTROLLER_ROLE_INVALID.into()));
        properties
    }

    /// Write the tracker properties.
    ///
    /// # Errors
    ///
    /// The host's property error; the tracker is active regardless.
    pub fn activate(&mut self, host: &dyn DriverHost, object_id: TrackedDeviceIndex) -> Result<(), HostError> {
        self.object_id = Some(object_id);
        self.diagnostic = DirectionDiagnostic::new();
        self.frames = 0;
        let container = host.property_container(object_id);
        tracing::info!(object_id, container, "Visual tracker activating");
        host.log(&format!("treadmill: visual tracker activated, objectId={object_id}"));
        host.set_properties(container, &Self::properties())
    }

    /// Stop reporting.
    pub fn deactivate(&mut self) {
        if let Some(object_id) = self.object_id.take() {
            tracing::info!(object_id, "Visual tracker deactivated");
        }
    }

    /// Pose that follows the HMD position but not its rotation.
    pub fn pose(&self, hmd: Option<&TrackedDevicePose>, motion: DriverMotion) -> DriverPose {
        let position = match hmd {
            Some(hmd) => {
                let m = &hmd.device_to_absolute_tracking.m;
                [
                    f64::from(m[0][3]) + TRACKER_HMD_OFFSET[0],
                    f64::from(m[1][3]) + TRACKER_HMD_OFFSET[1],
                    f64::from(m[2][3]) + TRACKER_HMD_OFFSET[2],
                ]
            }
            None => TRACKER_FALLBACK_POSITION,
        };
        DriverPose {
            position,
            rotation: yaw_quaternion(motion.yaw),
            ..base_pose()
        }
    }

    /// Advance the direction diagnostic by one frame and log its verdict.
    pub fn observe(&mut self, hmd: Option<&TrackedDevicePose>, motion: DriverMotion) {
        let hmd_xz = hmd.map(|pose| {
            let m = &pose.device_to_absolute_tracking.m;
            (m[0][3], m[2][3])
        });
        let expected = expected_direction(motion.x, motion.y, motion.yaw);
        if let Some(report) = self.diagnostic.on_frame(hmd_xz, expected) {
            if report.is_mismatch() {
                tracing::warn!(
                    deviation_deg = report.deviation_deg,
                    actual_x = report.actual.0,
                    actual_z = report.actual.1,
                    expected_x = report.expected.0,
                    expected_z = report.expected.1,
                    yaw = motion.yaw,
                    joystick_x = motion.x,
                    joystick_y = motion.y,
                    "Walking direction mismatch"
                );
            } else {
                tracing::debug!(deviation_deg = report.deviation_deg, "Walking direction ok");
            }
        }

        self.frames = self.frames.wrapping_add(1);
        if self.frames.is_multiple_of(LOG_INTERVAL_FRAMES) {
            tracing::trace!(frame = self.frames, yaw = motion.yaw, hmd_valid = hmd.is_some(), "Visual tracker pose");
        }
    }
}

impl Default for VisualTracker {
    fn default() -> Self {
        Self::new()
    }
}
