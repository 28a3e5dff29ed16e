//! Commonly used driver types.

pub use crate::driver::TreadmillDriver;
pub use crate::entry::{DRIVER, HmdDriverFactory};
pub use crate::ffi::*;
pub use crate::host::{DriverHost, PropertyValue};
pub use crate::motion::{DriverMotion, Tunables};
pub use crate::settings::{DriverSettings, SettingsSource};
