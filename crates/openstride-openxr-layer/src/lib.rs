//! OpenXR API layer that feeds treadmill motion into movement actions.
//!
//! The loader negotiates with [`xrNegotiateLoaderApiLayerInterface`], after
//! which the layer sits between the application and the next layer for six
//! functions:
//!
//! | Function | Behavior |
//! |---|---|
//! | `xrCreateAction` | classify the action name against the movement patterns |
//! | `xrGetActionStateFloat` | call through, then blend the treadmill axis the name selects |
//! | `xrGetActionStateVector2f` | call through, then blend both treadmill axes |
//! | `xrDestroyInstance` | forget every classification |
//! | `xrCreateActionSet`, `xrSyncActions` | pass through |
//!
//! A failed call-through is returned unchanged and nothing is injected.
//! While the treadmill is not connected every call behaves as if the layer
//! were absent.
//!
//! Config is read from `treadmill_layer_config.json` next to the layer
//! module and logs go to `treadmill_layer.log` beside it.

#![expect(unsafe_code, reason = "OpenXR entry points take raw loader pointers")]
#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod dispatch;
pub mod entry;
pub mod ffi;
pub mod layer;
pub mod prelude;

pub use dispatch::NextDispatch;
pub use entry::{
    CONFIG_FILE_NAME, LAYER, LOG_FILE_NAME, VENDOR_MODULE_NAME, intercepted, layer_create_api_layer_instance,
    layer_get_instance_proc_addr, xrNegotiateLoaderApiLayerInterface,
};
pub use layer::{Layer, LayerEntryPoints};
