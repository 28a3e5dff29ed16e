//! The next layer's entry points for the functions this layer wraps.

use std::ffi::CStr;

use crate::ffi::{
    PfnCreateAction, PfnCreateActionSet, PfnDestroyInstance, PfnGetActionStateFloat,
    PfnGetActionStateVector2f, PfnGetInstanceProcAddr, PfnSyncActions, PfnVoidFunction, XrInstance,
    succeeded,
};

/// Functions resolved from the next layer when an instance is created.
///
/// A function the next layer does not provide stays `None`; the matching
/// wrapper then answers with an error code instead of calling through.
#[derive(Debug, Clone, Copy)]
pub struct NextDispatch {
    /// Next `xrGetInstanceProcAddr`
    pub get_instance_proc_addr: PfnGetInstanceProcAddr,
    /// `xrDestroyInstance`
    pub destroy_instance: Option<PfnDestroyInstance>,
    /// `xrGetActionStateFloat`
    pub get_action_state_float: Option<PfnGetActionStateFloat>,
    /// `xrGetActionStateVector2f`
    pub get_action_state_vector2f: Option<PfnGetActionStateVector2f>,
    /// `xrSyncActions`
    pub sync_actions: Option<PfnSyncActions>,
    /// `xrCreateActionSet`
    pub create_action_set: Option<PfnCreateActionSet>,
    /// `xrCreateAction`
    pub create_action: Option<PfnCreateAction>,
}

impl NextDispatch {
    /// Look up every wrapped function through `gipa`.
    ///
    /// # Safety
    ///
    /// `gipa` must be the next layer's `xrGetInstanceProcAddr` and `instance`
    /// an instance it created.
    pub unsafe fn resolve(instance: XrInstance, gipa: PfnGetInstanceProcAddr) -> Self {
        // SAFETY: forwarded from this function's contract; each name below
        // is paired with its OpenXR signature.
        unsafe {
            Self {
                get_instance_proc_addr: gipa,
                destroy_instance: lookup(gipa, instance, c"xrDestroyInstance"),
                get_action_state_float: lookup(gipa, instance, c"xrGetActionStateFloat"),
                get_action_state_vector2f: lookup(gipa, instance, c"xrGetActionStateVector2f"),
                sync_actions: lookup(gipa, instance, c"xrSyncActions"),
                create_action_set: lookup(gipa, instance, c"xrCreateActionSet"),
                create_action: lookup(gipa, instance, c"xrCreateAction"),
            }
        }
    }

    /// Number of wrapped functions the next layer provides.
    pub fn resolved_count(&self) -> usize {
        [
            self.destroy_instance.is_some(),
            self.get_action_state_float.is_some(),
            self.get_action_state_vector2f.is_some(),
            self.sync_actions.is_some(),
            self.create_action_set.is_some(),
            self.create_action.is_some(),
        ]
        .into_iter()
        .filter(|&present| present)
        .count()
    }
}

/// Resolve `name` and reinterpret it as `F`.
///
/// # Safety
///
/// `F` must be a function pointer type matching the OpenXR signature of
/// `name`, and `gipa`/`instance` must be valid as for [`NextDispatch::resolve`].
unsafe fn lookup<F: Copy>(gipa: PfnGetInstanceProcAddr, instance: XrInstance, name: &CStr) -> Option<F> {
    debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<unsafe extern "system" fn()>());
    let mut function: PfnVoidFunction = None;
    // SAFETY: `name` is NUL-terminated and `function` is a valid out slot.
    let result = unsafe { gipa(instance, name.as_ptr(), &mut function) };
    if !succeeded(result) {
        tracing::warn!(function = ?name, result, "Next layer does not provide function");
        return None;
    }
    let function = function?;
    // SAFETY: the loader hands back the entry point registered under `name`;
    // `F` is that entry point's real signature.
    Some(unsafe { std::mem::transmute_copy::<unsafe extern "system" fn(), F>(&function) })
}
