//! Driver state and the bodies of the provider and device calls.

use std::ffi::c_void;
use std::fmt;
use std::sync::Arc;

use openstride_runtime::{MotionRuntime, RuntimeOptions, RuntimeSlot};
use parking_lot::{Mutex, RwLock};

use crate::debug_request::{VISUAL_TRACKER_RESPONSE, handle_request};
use crate::devices::{
    CONTROLLER_REGISTRATION_SERIAL, TRACKER_REGISTRATION_SERIAL, TreadmillController, VisualTracker, base_pose,
};
use crate::ffi::{
    DriverPose, EVRInitError, TRACKED_DEVICE_CLASS_CONTROLLER, TRACKED_DEVICE_CLASS_GENERIC_TRACKER,
    TrackedDeviceIndex, VR_INIT_ERROR_NONE,
};
use crate::host::DriverHost;
use crate::motion::{DriverMotion, MotionSmoother, Tunables};
use crate::settings::DriverSettings;

/// The C++ objects SteamVR is given for the two devices.
#[derive(Debug, Clone, Copy)]
pub struct DeviceObjects {
    /// `ITrackedDeviceServerDriver` of the controller
    pub controller: *mut c_void,
    /// `ITrackedDeviceServerDriver` of the visual tracker
    pub tracker: *mut c_void,
}

/// Per-process driver state.
pub struct TreadmillDriver {
    runtime: RuntimeSlot,
    options: fn(&DriverSettings) -> RuntimeOptions,
    host: RwLock<Option<Arc<dyn DriverHost>>>,
    tunables: Tunables,
    smoother: Mutex<MotionSmoother>,
    controller: Mutex<TreadmillController>,
    tracker: Mutex<VisualTracker>,
}

impl fmt::Debug for TreadmillDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreadmillDriver")
            .field("runtime", &self.runtime)
            .field("host", &self.host.read().is_some())
            .field("tunables", &self.tunables)
            .field("controller", &self.controller.lock().object_id())
            .field("tracker", &self.tracker.lock().object_id())
            .finish()
    }
}

impl TreadmillDriver {
    /// Driver whose runtime is started from `options` on `Init`.
    pub const fn new(options: fn(&DriverSettings) -> RuntimeOptions) -> Self {
        Self {
            runtime: RuntimeSlot::new(),
            options,
            host: parking_lot::const_rwlock(None),
            tunables: Tunables::new(),
            smoother: parking_lot::const_mutex(MotionSmoother::new()),
            controller: parking_lot::const_mutex(TreadmillController::new()),
            tracker: parking_lot::const_mutex(VisualTracker::new()),
        }
    }

    /// The runtime slot; tests pre-start it with their own options.
    pub fn runtime_slot(&self) -> &RuntimeSlot {
        &self.runtime
    }

    /// Live tunables.
    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    fn host(&self) -> Option<Arc<dyn DriverHost>> {
        self.host.read().clone()
    }

    /// `IServerTrackedDeviceProvider::Init` after the host interfaces are
    /// resolved: read the settings, start the runtime and register both
    /// devices.
    pub fn init(&self, host: Arc<dyn DriverHost>, devices: DeviceObjects) -> EVRInitError {
        let settings = DriverSettings::load(&*host);
        self.tunables.apply(&settings);
        let runtime = self.runtime.get_or_start(|| (self.options)(&settings));
        tracing::info!(
            com_port = %settings.com_port,
            speed_factor = settings.speed_factor,
            smoothing_factor = settings.smoothing_factor,
            role = ?runtime.role(),
            "Treadmill driver initialising"
        );
        host.log("treadmill: Init called");

        self.smoother.lock().reset();
        self.controller.lock().set_model_number(&settings.model_number);
        *self.host.write() = Some(Arc::clone(&host));

        // No driver lock is held here: SteamVR may activate a device from
        // inside TrackedDeviceAdded.
        let controller_added =
            host.tracked_device_added(CONTROLLER_REGISTRATION_SERIAL, TRACKED_DEVICE_CLASS_CONTROLLER, devices.controller);
        let tracker_added = host.tracked_device_added(
            TRACKER_REGISTRATION_SERIAL,
            TRACKED_DEVICE_CLASS_GENERIC_TRACKER,
            devices.tracker,
        );
        tracing::info!(controller_added, tracker_added, "Treadmill devices registered");
        host.log(&format!("treadmill: controller added: {controller_added}, visual tracker added: {tracker_added}"));
        VR_INIT_ERROR_NONE
    }

    /// `IServerTrackedDeviceProvider::Cleanup`
    pub fn cleanup(&self) {
        tracing::info!("Treadmill driver cleaning up");
        self.controller.lock().deactivate();
        self.tracker.lock().deactivate();
        *self.host.write() = None;
        self.runtime.shutdown();
    }

    /// Fold the latest runtime sample into the driver's smoothing.
    fn advance(&self, runtime: &MotionRuntime) -> DriverMotion {
        let snapshot = runtime.state().snapshot();
        let connected = runtime.is_connected();
        self.smoother
            .lock()
            .update(&snapshot, connected, self.tunables.smoothing_factor())
    }

    fn current_motion(&self) -> DriverMotion {
        self.smoother.lock().motion()
    }

    /// `IServerTrackedDeviceProvider::RunFrame`: push controller inputs and
    /// both poses.
    pub fn run_frame(&self) {
        let (Some(host), Some(runtime)) = (self.host(), self.runtime.get()) else {
            return;
        };
        let motion = self.advance(&runtime);

        let controller_update = {
            let mut controller = self.controller.lock();
            controller.object_id().map(|id| {
                controller.update_inputs(&*host, motion, self.tunables.speed_factor());
                (id, controller.pose(motion))
            })
        };
        if let Some((id, pose)) = controller_update {
            host.tracked_device_pose_updated(id, &pose);
        }

        let tracker_update = {
            let mut tracker = self.tracker.lock();
            tracker.object_id().map(|id| {
                let hmd = host.hmd_pose();
                tracker.observe(hmd.as_ref(), motion);
                (id, tracker.pose(hmd.as_ref(), motion))
            })
        };
        if let Some((id, pose)) = tracker_update {
            host.tracked_device_pose_updated(id, &pose);
        }
    }

    /// Controller `Activate`.
    pub fn activate_controller(&self, object_id: TrackedDeviceIndex) -> EVRInitError {
        let Some(host) = self.host() else {
            tracing::error!(object_id, "Controller activated before Init");
            return crate::ffi::VR_INIT_ERROR_DRIVER_FAILED;
        };
        self.controller.lock().activate(&*host, object_id);
        VR_INIT_ERROR_NONE
    }

    /// Visual tracker `Activate`.
    pub fn activate_tracker(&self, object_id: TrackedDeviceIndex) -> EVRInitError {
        let Some(host) = self.host() else {
            tracing::error!(object_id, "Visual tracker activated before Init");
            return crate::ffi::VR_INIT_ERROR_DRIVER_FAILED;
        };
        if let Err(err) = self.tracker.lock().activate(&*host, object_id) {
            tracing::warn!(error = %err, "Visual tracker properties incomplete");
        }
        VR_INIT_ERROR_NONE
    }

    /// Controller `Deactivate`.
    pub fn deactivate_controller(&self) {
        self.controller.lock().deactivate();
    }

    /// Visual tracker `Deactivate`.
    pub fn deactivate_tracker(&self) {
        self.tracker.lock().deactivate();
    }

    /// Controller `DebugRequest`.
    pub fn controller_debug_request(&self, request: &str) -> String {
        handle_request(request, &self.tunables, |debug| {
            let handle = self.runtime.get().and_then(|runtime| runtime.log_handle().cloned());
            if let Some(handle) = handle
                && let Err(err) = handle.set_debug(debug)
            {
                tracing::warn!(error = %err, "Log level unchanged");
            }
        })
    }

    /// Visual tracker `DebugRequest`.
    pub fn tracker_debug_request(&self, _request: &str) -> String {
        VISUAL_TRACKER_RESPONSE.to_string()
    }

    /// Controller `GetPose`.
    pub fn controller_pose(&self) -> DriverPose {
        self.controller.lock().pose(self.current_motion())
    }

    /// Visual tracker `GetPose`.
    pub fn tracker_pose(&self) -> DriverPose {
        let Some(host) = self.host() else {
            return base_pose();
        };
        let hmd = host.hmd_pose();
        self.tracker.lock().pose(hmd.as_ref(), self.current_motion())
    }

    /// Active device indices, controller then tracker.
    pub fn active_devices(&self) -> (Option<TrackedDeviceIndex>, Option<TrackedDeviceIndex>) {
        (self.controller.lock().object_id(), self.tracker.lock().object_id())
    }

    /// Latest smoothed motion.
    pub fn motion(&self) -> DriverMotion {
        self.current_motion()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openstride_config::Config;

    fn disabled(_: &DriverSettings) -> RuntimeOptions {
        RuntimeOptions::new("driver-test")
            .with_config(Config {
                enabled: false,
                ..Config::default()
            })
            .without_logging()
    }

    #[test]
    fn test_calls_before_init_are_harmless() {
        let driver = TreadmillDriver::new(disabled);
        driver.run_frame();
        assert_eq!(driver.activate_controller(3), crate::ffi::VR_INIT_ERROR_DRIVER_FAILED);
        assert_eq!(driver.active_devices(), (None, None));
        assert_eq!(driver.tracker_pose(), base_pose());
        assert_eq!(driver.tracker_debug_request("anything"), "VisualTracker");
        driver.cleanup();
    }

    #[test]
    fn test_debug_request_changes_tunables() {
        let driver = TreadmillDriver::new(disabled);
        assert_eq!(driver.controller_debug_request("speed 3"), "SPEED=3");
        assert_eq!(driver.controller_debug_request("debug off"), "DEBUG=false");
        assert!((driver.tunables().speed_factor() - 3.0).abs() < f32::EPSILON);
        assert!(!driver.tunables().debug());
    }
}
