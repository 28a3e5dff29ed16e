//! Vtable patching of the two wrapped interfaces.
//!
//! The real object's vtable pointer is redirected to a copy of its vtable in
//! which a few entries are replaced. Every call keeps the real object as
//! `this`, so untouched methods behave exactly as before. The replaced
//! entries look `this` up in an [`InterfaceTable`] to find the original
//! entry, and reach the real behavior through [`InputBackend`] or
//! [`SystemBackend`].

use std::ffi::{CStr, c_char, c_int, c_void};
use std::fmt;

use crate::ffi::{
    EVRInputError, IVR_INPUT_GET_ACTION_HANDLE, IVR_INPUT_GET_ANALOG_ACTION_DATA, IVR_INPUT_VTABLE_LEN,
    IVR_SYSTEM_GET_CONTROLLER_STATE, IVR_SYSTEM_GET_CONTROLLER_STATE_WITH_POSE, IVR_SYSTEM_VTABLE_LEN,
    InputAnalogActionData, PfnGetActionHandle, PfnGetAnalogActionData, PfnGetControllerState,
    PfnGetControllerStateWithPose, TrackedDeviceIndex, VR_INPUT_ERROR_INVALID_HANDLE, VRActionHandle,
    VRControllerState, VRInputValueHandle,
};

/// Interfaces the wrapper proxies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    /// `IVRSystem_*`: legacy controller-state polling
    System,
    /// `IVRInput_*`: named actions
    Input,
}

impl InterfaceKind {
    /// Recognise an interface version string such as `IVRInput_010`.
    pub fn from_version(version: &CStr) -> Option<Self> {
        let version = version.to_bytes();
        if contains(version, b"IVRSystem") {
            Some(Self::System)
        } else if contains(version, b"IVRInput") {
            Some(Self::Input)
        } else {
            None
        }
    }

    fn vtable_len(self) -> usize {
        match self {
            Self::System => IVR_SYSTEM_VTABLE_LEN,
            Self::Input => IVR_INPUT_VTABLE_LEN,
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// The real `IVRInput` methods the wrapper overrides.
pub trait InputBackend {
    /// `IVRInput::GetActionHandle`
    ///
    /// # Safety
    ///
    /// Arguments as the OpenVR contract requires.
    unsafe fn get_action_handle(&self, name: *const c_char, handle: *mut VRActionHandle) -> EVRInputError;

    /// `IVRInput::GetAnalogActionData`
    ///
    /// # Safety
    ///
    /// Arguments as the OpenVR contract requires.
    unsafe fn get_analog_action_data(
        &self,
        action: VRActionHandle,
        data: *mut InputAnalogActionData,
        data_size: u32,
        restrict_to_device: VRInputValueHandle,
    ) -> EVRInputError;
}

/// The real `IVRSystem` methods the wrapper overrides.
pub trait SystemBackend {
    /// `IVRSystem::GetControllerState`
    ///
    /// # Safety
    ///
    /// Arguments as the OpenVR contract requires.
    unsafe fn get_controller_state(
        &self,
        device: TrackedDeviceIndex,
        state: *mut VRControllerState,
        state_size: u32,
    ) -> bool;

    /// `IVRSystem::GetControllerStateWithPose`
    ///
    /// # Safety
    ///
    /// Arguments as the OpenVR contract requires.
    unsafe fn get_controller_state_with_pose(
        &self,
        origin: c_int,
        device: TrackedDeviceIndex,
        state: *mut VRControllerState,
        state_size: u32,
        pose: *mut c_void,
    ) -> bool;
}

/// The real object plus the original entries of the replaced slots.
#[derive(Debug, Clone, Copy)]
pub struct RealInterface {
    this: *mut c_void,
    originals: [*const c_void; 2],
}

// SAFETY: plain addresses into the real runtime; they are only dereferenced
// inside host calls, which OpenVR permits from any thread.
unsafe impl Send for RealInterface {}
// SAFETY: as above; nothing is mutated through a shared reference.
unsafe impl Sync for RealInterface {}

impl RealInterface {
    /// The real object.
    pub fn this(&self) -> *mut c_void {
        self.this
    }

    /// # Safety
    ///
    /// `F` must be the signature of the original entry at `index`.
    unsafe fn original<F: Copy>(&self, index: usize) -> Option<F> {
        let entry = *self.originals.get(index)?;
        if entry.is_null() {
            return None;
        }
        // SAFETY: non-null vtable entry; the caller names its signature.
        Some(unsafe { std::mem::transmute_copy::<*const c_void, F>(&entry) })
    }
}

impl InputBackend for RealInterface {
    unsafe fn get_action_handle(&self, name: *const c_char, handle: *mut VRActionHandle) -> EVRInputError {
        // SAFETY: slot 0 holds the original `GetActionHandle`.
        match unsafe { self.original::<PfnGetActionHandle>(0) } {
            // SAFETY: forwarded with the real object as `this`.
            Some(real) => unsafe { real(self.this, name, handle) },
            None => VR_INPUT_ERROR_INVALID_HANDLE,
        }
    }

    unsafe fn get_analog_action_data(
        &self,
        action: VRActionHandle,
        data: *mut InputAnalogActionData,
        data_size: u32,
        restrict_to_device: VRInputValueHandle,
    ) -> EVRInputError {
        // SAFETY: slot 1 holds the original `GetAnalogActionData`.
        match unsafe { self.original::<PfnGetAnalogActionData>(1) } {
            // SAFETY: forwarded with the real object as `this`.
            Some(real) => unsafe { real(self.this, action, data, data_size, restrict_to_device) },
            None => VR_INPUT_ERROR_INVALID_HANDLE,
        }
    }
}

impl SystemBackend for RealInterface {
    unsafe fn get_controller_state(
        &self,
        device: TrackedDeviceIndex,
        state: *mut VRControllerState,
        state_size: u32,
    ) -> bool {
        // SAFETY: slot 0 holds the original `GetControllerState`.
        match unsafe { self.original::<PfnGetControllerState>(0) } {
            // SAFETY: forwarded with the real object as `this`.
            Some(real) => unsafe { real(self.this, device, state, state_size) },
            None => false,
        }
    }

    unsafe fn get_controller_state_with_pose(
        &self,
        origin: c_int,
        device: TrackedDeviceIndex,
        state: *mut VRControllerState,
        state_size: u32,
        pose: *mut c_void,
    ) -> bool {
        // SAFETY: slot 1 holds the original `GetControllerStateWithPose`.
        match unsafe { self.original::<PfnGetControllerStateWithPose>(1) } {
            // SAFETY: forwarded with the real object as `this`.
            Some(real) => unsafe { real(self.this, origin, device, state, state_size, pose) },
            None => false,
        }
    }
}

/// Replacement entries for one interface kind.
#[derive(Debug, Clone, Copy)]
pub struct Overrides {
    /// Entries for `IVRSystem` slots 34 and 35
    pub system: [*const c_void; 2],
    /// Entries for `IVRInput` slots 2 and 6
    pub input: [*const c_void; 2],
}

impl Overrides {
    fn slots(&self, kind: InterfaceKind) -> [(usize, *const c_void); 2] {
        match kind {
            InterfaceKind::System => [
                (IVR_SYSTEM_GET_CONTROLLER_STATE, self.system[0]),
                (IVR_SYSTEM_GET_CONTROLLER_STATE_WITH_POSE, self.system[1]),
            ],
            InterfaceKind::Input => [
                (IVR_INPUT_GET_ACTION_HANDLE, self.input[0]),
                (IVR_INPUT_GET_ANALOG_ACTION_DATA, self.input[1]),
            ],
        }
    }
}

struct Patched {
    kind: InterfaceKind,
    real: RealInterface,
    vtable: Box<[*const c_void]>,
}

impl Patched {
    fn vtable_ptr(&self) -> *const *const c_void {
        self.vtable.as_ptr()
    }
}

/// Every patched vtable, kept for the life of the process because the real
/// objects keep pointing at them.
#[derive(Default)]
pub struct InterfaceTable {
    patched: Vec<Patched>,
}

// SAFETY: the table owns the vtable copies; the object pointers it stores are
// only dereferenced inside host calls, which OpenVR permits from any thread.
unsafe impl Send for InterfaceTable {}

impl fmt::Debug for InterfaceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.patched.iter().map(|p| (p.kind, p.real.this)))
            .finish()
    }
}

impl InterfaceTable {
    /// Empty table.
    pub const fn new() -> Self {
        Self { patched: Vec::new() }
    }

    /// Redirect `real`'s vtable pointer to a patched copy and return `real`.
    ///
    /// An object that already points at its patched copy is left alone. One
    /// that was re-created at the same address is patched again.
    ///
    /// # Safety
    ///
    /// `real` must be a live, writable interface object of `kind` whose
    /// vtable has at least as many readable entries as the wrapper copies
    /// for that kind.
    pub unsafe fn wrap(&mut self, kind: InterfaceKind, real: *mut c_void, overrides: &Overrides) -> *mut c_void {
        let slot = real.cast::<*const *const c_void>();
        // SAFETY: the first field of a C++ object with virtual methods is its
        // vtable pointer.
        let current = unsafe { slot.read() };
        if let Some(position) = self.patched.iter().position(|p| p.real.this == real) {
            if self.patched.get(position).is_some_and(|p| p.vtable_ptr() == current) {
                return real;
            }
            tracing::debug!(?kind, real = ?real, "Interface object re-created, patching again");
            // The object no longer points at the stale copy.
            self.patched.swap_remove(position);
        }

        // SAFETY: the caller guarantees the entry count.
        let copied = unsafe { std::slice::from_raw_parts(current, kind.vtable_len()) };
        let mut vtable: Box<[*const c_void]> = copied.into();
        let mut originals = [std::ptr::null(); 2];
        for ((index, replacement), original) in overrides.slots(kind).into_iter().zip(originals.iter_mut()) {
            if let Some(entry) = vtable.get_mut(index) {
                *original = std::mem::replace(entry, replacement);
            }
        }

        let patched = Patched {
            kind,
            real: RealInterface { this: real, originals },
            vtable,
        };
        // SAFETY: writable per the caller; the copy outlives the object
        // because the table never drops entries that are still installed.
        unsafe { slot.write(patched.vtable_ptr()) };
        tracing::info!(?kind, real = ?real, "Interface vtable patched");
        self.patched.push(patched);
        real
    }

    /// The original entries behind patched object `this`.
    pub fn real_for(&self, this: *mut c_void) -> Option<RealInterface> {
        self.patched.iter().find(|p| p.real.this == this).map(|p| p.real)
    }

    /// Every patched object, in patch order.
    pub fn reals(&self) -> Vec<RealInterface> {
        self.patched.iter().map(|p| p.real).collect()
    }

    /// Number of patched objects.
    pub fn len(&self) -> usize {
        self.patched.len()
    }

    /// Whether nothing has been patched.
    pub fn is_empty(&self) -> bool {
        self.patched.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_kind_by_substring() {
        assert_eq!(InterfaceKind::from_version(c"IVRSystem_022"), Some(InterfaceKind::System));
        assert_eq!(InterfaceKind::from_version(c"FnTable:IVRInput_010"), Some(InterfaceKind::Input));
        assert_eq!(InterfaceKind::from_version(c"IVRCompositor_027"), None);
        assert_eq!(InterfaceKind::from_version(c""), None);
    }

    #[repr(C)]
    struct FakeObject {
        vtable: *const *const c_void,
    }

    fn vtable_of(object: *mut c_void) -> *const *const c_void {
        // SAFETY: test objects are `FakeObject`s.
        unsafe { object.cast::<FakeObject>().read().vtable }
    }

    #[test]
    fn test_wrap_patches_only_overridden_slots() {
        let entries: Vec<*const c_void> = (1..=IVR_INPUT_VTABLE_LEN).map(|i| i as *const c_void).collect();
        let real = Box::into_raw(Box::new(FakeObject {
            vtable: entries.as_ptr(),
        }))
        .cast::<c_void>();
        let overrides = Overrides {
            system: [std::ptr::null(); 2],
            input: [0xAAAA as *const c_void, 0xBBBB as *const c_void],
        };

        let mut table = InterfaceTable::default();
        // SAFETY: the fake vtable has IVR_INPUT_VTABLE_LEN entries.
        let returned = unsafe { table.wrap(InterfaceKind::Input, real, &overrides) };
        assert_eq!(returned, real);
        assert_ne!(vtable_of(real), entries.as_ptr());

        // SAFETY: the patched copy has the same length.
        let patched = unsafe { std::slice::from_raw_parts(vtable_of(real), IVR_INPUT_VTABLE_LEN) };
        assert_eq!(patched.get(IVR_INPUT_GET_ACTION_HANDLE).copied(), Some(0xAAAA as *const c_void));
        assert_eq!(patched.get(IVR_INPUT_GET_ANALOG_ACTION_DATA).copied(), Some(0xBBBB as *const c_void));
        assert_eq!(patched.get(0).copied(), Some(1 as *const c_void));
        assert_eq!(patched.get(5).copied(), Some(6 as *const c_void));

        let originals = table.real_for(real).map(|r| r.originals);
        assert_eq!(originals, Some([3 as *const c_void, 7 as *const c_void]));
        assert!(table.real_for(std::ptr::null_mut()).is_none());

        // SAFETY: as above.
        unsafe { table.wrap(InterfaceKind::Input, real, &overrides) };
        assert_eq!(table.len(), 1);

        // SAFETY: test-owned object.
        unsafe { real.cast::<FakeObject>().write(FakeObject { vtable: entries.as_ptr() }) };
        // SAFETY: as above.
        unsafe { table.wrap(InterfaceKind::Input, real, &overrides) };
        assert_eq!(table.len(), 1);
        assert_ne!(vtable_of(real), entries.as_ptr());

        // SAFETY: allocated above with `Box::into_raw`.
        drop(unsafe { Box::from_raw(real.cast::<FakeObject>()) });
    }
}
