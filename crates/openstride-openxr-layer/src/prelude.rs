//! Commonly used layer types.

pub use crate::dispatch::NextDispatch;
pub use crate::entry::{LAYER, xrNegotiateLoaderApiLayerInterface};
pub use crate::ffi::*;
pub use crate::layer::{Layer, LayerEntryPoints};
