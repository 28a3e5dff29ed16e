//! SteamVR driver that exposes the treadmill as two devices.
//!
//! | Device | Class | Reports |
//! |---|---|---|
//! | `treadmill_controller` | controller, treadmill role | `/input/joystick/x` and `/input/joystick/y` scalars, heading as its rotation |
//! | `treadmill_visual_tracker` | generic tracker | the smoothed heading, placed just below and in front of the HMD |
//!
//! SteamVR loads the module and calls [`HmdDriverFactory`] for
//! `IServerTrackedDeviceProvider_004`. `Init` reads the `driver_treadmill`
//! settings section, starts the shared motion runtime and registers both
//! devices. `RunFrame` folds the latest sample into the driver's smoothing
//! and pushes inputs and poses. Without treadmill hardware the driver still
//! loads and reports a centred joystick.
//!
//! Both devices answer `DebugRequest`; the controller accepts `debug`,
//! `speed` and `smoothing` commands (see [`debug_request`]).
//!
//! C++ methods are called with the C ABI, which matches MSVC member
//! functions on 64-bit targets. `GetPose` returns its struct through a
//! hidden pointer, placed per platform in [`ffi::PfnGetPose`].

#![expect(unsafe_code, reason = "exposes C++ interface vtables to SteamVR")]
#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod debug_request;
pub mod devices;
pub mod diagnostic;
pub mod driver;
pub mod entry;
pub mod ffi;
pub mod host;
pub mod motion;
pub mod prelude;
pub mod settings;

pub use debug_request::{DebugCommand, handle_request};
pub use devices::{TreadmillController, VisualTracker};
pub use diagnostic::{DirectionDiagnostic, DirectionReport};
pub use driver::{DeviceObjects, TreadmillDriver};
pub use entry::{
    CONTROLLER_OBJECT, DRIVER, HmdDriverFactory, LOG_FILE_NAME, PROVIDER, TRACKER_OBJECT, VENDOR_MODULE_NAME,
    provider_ptr,
};
pub use host::{ContextHost, DriverHost, Property, PropertyValue};
pub use motion::{DriverMotion, MotionSmoother, Tunables};
pub use settings::{DriverSettings, SETTINGS_SECTION, SettingsSource};
