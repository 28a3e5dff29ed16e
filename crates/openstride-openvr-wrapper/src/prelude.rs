//! Commonly used wrapper types.

pub use crate::entry::WRAPPER;
pub use crate::ffi::*;
pub use crate::interface::{InputBackend, InterfaceKind, SystemBackend};
pub use crate::library::{RealExports, RealLibrary};
pub use crate::wrapper::OpenVrWrapper;
