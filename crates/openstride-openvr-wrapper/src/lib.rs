//! Drop-in `openvr_api.dll` that feeds treadmill motion into OpenVR input.
//!
//! The original library is renamed to `openvr_api_original.dll` and this
//! module takes its place. Every `VR_*` export forwards to the original,
//! which is loaded on the first `VR_InitInternal`, `VR_InitInternal2`,
//! `VR_IsHmdPresent` or `VR_GetGenericInterface` call. Interfaces whose
//! version contains `IVRInput` or `IVRSystem` get four vtable entries
//! replaced:
//!
//! | Method | Behavior |
//! |---|---|
//! | `IVRInput::GetActionHandle` | classify the action name against the movement patterns |
//! | `IVRInput::GetAnalogActionData` | call through, then blend both treadmill axes |
//! | `IVRSystem::GetControllerState[WithPose]` | call through, then blend into the joystick axis of the targeted controller |
//!
//! The patched vtable is installed on the real object itself instead of on a
//! separate forwarding object. Every unreplaced entry is the runtime's own
//! method and reads the object's fields through `this`, so `this` must stay
//! the real object. The game also gets back the pointer it would have got
//! without the wrapper, which keeps identity checks and later
//! `VR_GetGenericInterface` calls consistent. The copies live for the rest
//! of the process because the real objects keep pointing at them.
//! Action classifications are dropped on `VR_ShutdownInternal`, when the
//! session's handles become invalid.
//!
//! Without the original library the exports answer with OpenVR's own
//! "not installed" results. Config is read from `treadmill_config.json`
//! next to the module and logs go to `treadmill_wrapper.log`.
//!
//! Vtable entries are called with the C ABI, which is what MSVC uses for
//! member functions on 64-bit targets.

#![expect(unsafe_code, reason = "replaces openvr_api exports and patches interface vtables")]
#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod entry;
pub mod ffi;
pub mod interface;
pub mod library;
pub mod prelude;
pub mod wrapper;

pub use entry::{
    CONFIG_FILE_NAME, LOG_FILE_NAME, VENDOR_MODULE_NAME, VR_GetGenericInterface, VR_GetInitToken, VR_GetRuntimePath,
    VR_GetStringForHmdError, VR_GetVRInitErrorAsEnglishDescription, VR_GetVRInitErrorAsSymbol, VR_InitInternal,
    VR_InitInternal2, VR_IsHmdPresent, VR_IsInterfaceVersionValid, VR_IsRuntimeInstalled, VR_ShutdownInternal, WRAPPER,
    overrides,
};
pub use interface::{InputBackend, InterfaceKind, InterfaceTable, Overrides, RealInterface, SystemBackend};
pub use library::{REAL_LIBRARY_NAME, RealExports, RealLibrary};
pub use wrapper::{OpenVrWrapper, UNKNOWN_ERROR, UNKNOWN_ERROR_SYMBOL};
