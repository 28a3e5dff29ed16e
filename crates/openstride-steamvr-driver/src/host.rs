//! The SteamVR side of the driver.
//!
//! [`DriverHost`] is everything the devices ask of SteamVR. [`ContextHost`]
//! implements it over the interfaces a driver context hands out; tests use
//! recording fakes.

use std::ffi::{CStr, CString, c_char, c_void};
use std::fmt;

use openstride_errors::HostError;

use crate::ffi::{
    DRIVER_INPUT_VERSION, DRIVER_LOG_VERSION, DriverPose, EVRInitError, EVRInputError, EVRSettingsError,
    ETrackedDeviceProperty, FLOAT_PROPERTY_TAG, HMD_DEVICE_INDEX, INT32_PROPERTY_TAG, BOOL_PROPERTY_TAG,
    PROPERTIES_VERSION, PROPERTY_WRITE_SET, PfnContextGetGenericInterface, PfnCreateScalarComponent, PfnDriverLog,
    PfnGetRawTrackedDevicePoses, PfnSettingsGetBool, PfnSettingsGetFloat, PfnSettingsGetString,
    PfnTrackedDeviceAdded, PfnTrackedDevicePoseUpdated, PfnTrackedDeviceToPropertyContainer,
    PfnUpdateScalarComponent, PfnWritePropertyBatch, PropertyContainerHandle, PropertyWrite, SCALAR_TYPE_RELATIVE,
    SCALAR_UNITS_NORMALIZED_TWO_SIDED, SERVER_DRIVER_HOST_VERSION, SETTINGS_VERSION, STRING_PROPERTY_TAG,
    TRACKED_PROP_SUCCESS, TrackedDeviceIndex, TrackedDevicePose, VR_INIT_ERROR_NONE, VR_INPUT_ERROR_NONE,
    VR_SETTINGS_ERROR_NONE, VRInputComponentHandle, size_u32, slot,
};
use crate::settings::SettingsSource;

/// A device property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// `*_String`
    String(String),
    /// `*_Bool`
    Bool(bool),
    /// `*_Int32`
    Int32(i32),
    /// `*_Float`
    Float(f32),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int32(value)
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        PropertyValue::Float(value)
    }
}

/// One property to write.
pub type Property = (ETrackedDeviceProperty, PropertyValue);

/// What the driver needs from SteamVR.
pub trait DriverHost: SettingsSource + Send + Sync {
    /// Register a device object. `device` is handed to SteamVR as is.
    fn tracked_device_added(&self, serial: &str, class: i32, device: *mut c_void) -> bool;

    /// Push a device pose.
    fn tracked_device_pose_updated(&self, device: TrackedDeviceIndex, pose: &DriverPose);

    /// Raw HMD pose, when SteamVR has one.
    fn hmd_pose(&self) -> Option<TrackedDevicePose>;

    /// Property container of a device.
    fn property_container(&self, device: TrackedDeviceIndex) -> PropertyContainerHandle;

    /// Write `properties` to `container`.
    ///
    /// # Errors
    ///
    /// [`HostError::CallFailed`] with the first property error.
    fn set_properties(&self, container: PropertyContainerHandle, properties: &[Property]) -> Result<(), HostError>;

    /// Create a relative, two-sided scalar input.
    ///
    /// # Errors
    ///
    /// [`HostError::CallFailed`] with the input error.
    fn create_scalar_component(
        &self,
        container: PropertyContainerHandle,
        name: &str,
    ) -> Result<VRInputComponentHandle, HostError>;

    /// Update a scalar input.
    ///
    /// # Errors
    ///
    /// [`HostError::CallFailed`] with the input error.
    fn update_scalar_component(&self, handle: VRInputComponentHandle, value: f32) -> Result<(), HostError>;

    /// Write a line to the SteamVR driver log.
    fn log(&self, message: &str);
}

/// Host interfaces resolved from an `IVRDriverContext`.
pub struct ContextHost {
    settings: *mut c_void,
    server: *mut c_void,
    properties: *mut c_void,
    input: *mut c_void,
    log: *mut c_void,
}

// SAFETY: SteamVR's driver interfaces are process-wide singletons that may
// be called from any driver thread.
unsafe impl Send for ContextHost {}
// SAFETY: as above; the struct only holds the interface pointers.
unsafe impl Sync for ContextHost {}

impl fmt::Debug for ContextHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHost")
            .field("settings", &self.settings)
            .field("server", &self.server)
            .field("properties", &self.properties)
            .field("input", &self.input)
            .field("log", &self.log)
            .finish()
    }
}

/// Entry `index` of the vtable of `object`.
///
/// # Safety
///
/// `object` must be a live C++ object whose vtable has an entry at `index`
/// of type `F`.
unsafe fn method<F: Copy>(object: *mut c_void, index: usize) -> F {
    // SAFETY: the first word of the object is its vtable pointer.
    let vtable = unsafe { object.cast::<*const *const c_void>().read() };
    // SAFETY: the caller vouches for `index`.
    let entry = unsafe { vtable.add(index).read() };
    // SAFETY: the caller vouches for `F`.
    unsafe { std::mem::transmute_copy::<*const c_void, F>(&entry) }
}

fn c_string(text: &str) -> CString {
    CString::new(text.replace('\0', "")).unwrap_or_default()
}

impl ContextHost {
    /// Resolve the five interfaces from `context`.
    ///
    /// # Errors
    ///
    /// [`HostError::InterfaceNotFound`] naming the first missing interface.
    ///
    /// # Safety
    ///
    /// `context` must be the `IVRDriverContext` SteamVR passed to `Init`.
    pub unsafe fn from_context(context: *mut c_void) -> Result<Self, HostError> {
        if context.is_null() {
            return Err(HostError::InterfaceNotFound("IVRDriverContext".to_string()));
        }
        // SAFETY: slot 0 of IVRDriverContext is GetGenericInterface.
        let get: PfnContextGetGenericInterface = unsafe { method(context, slot::CONTEXT_GET_GENERIC_INTERFACE) };
        let resolve = |version: &str| -> Result<*mut c_void, HostError> {
            let name = c_string(version);
            let mut error: EVRInitError = VR_INIT_ERROR_NONE;
            // SAFETY: valid context, C string and out slot.
            let interface = unsafe { get(context, name.as_ptr(), &mut error) };
            if interface.is_null() || error != VR_INIT_ERROR_NONE {
                tracing::error!(version, error, "Driver context lacks interface");
                return Err(HostError::InterfaceNotFound(version.to_string()));
            }
            Ok(interface)
        };
        Ok(Self {
            settings: resolve(SETTINGS_VERSION)?,
            server: resolve(SERVER_DRIVER_HOST_VERSION)?,
            properties: resolve(PROPERTIES_VERSION)?,
            input: resolve(DRIVER_INPUT_VERSION)?,
            log: resolve(DRIVER_LOG_VERSION)?,
        })
    }
}

impl SettingsSource for ContextHost {
    fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        let (section, key) = (c_string(section), c_string(key));
        let mut error: EVRSettingsError = VR_SETTINGS_ERROR_NONE;
        // SAFETY: IVRSettings_003 slot and signature.
        let get: PfnSettingsGetBool = unsafe { method(self.settings, slot::SETTINGS_GET_BOOL) };
        // SAFETY: C strings and out slot outlive the call.
        let value = unsafe { get(self.settings, section.as_ptr(), key.as_ptr(), &mut error) };
        (error == VR_SETTINGS_ERROR_NONE).then_some(value)
    }

    fn get_float(&self, section: &str, key: &str) -> Option<f32> {
        let (section, key) = (c_string(section), c_string(key));
        let mut error: EVRSettingsError = VR_SETTINGS_ERROR_NONE;
        // SAFETY: IVRSettings_003 slot and signature.
        let get: PfnSettingsGetFloat = unsafe { method(self.settings, slot::SETTINGS_GET_FLOAT) };
        // SAFETY: C strings and out slot outlive the call.
        let value = unsafe { get(self.settings, section.as_ptr(), key.as_ptr(), &mut error) };
        (error == VR_SETTINGS_ERROR_NONE).then_some(value)
    }

    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        let (section, key) = (c_string(section), c_string(key));
        let mut error: EVRSettingsError = VR_SETTINGS_ERROR_NONE;
        let mut buffer = [0 as c_char; 1024];
        // SAFETY: IVRSettings_003 slot and signature.
        let get: PfnSettingsGetString = unsafe { method(self.settings, slot::SETTINGS_GET_STRING) };
        // SAFETY: the buffer length is passed along.
        unsafe {
            get(
                self.settings,
                section.as_ptr(),
                key.as_ptr(),
                buffer.as_mut_ptr(),
                size_u32::<[c_char; 1024]>(),
                &mut error,
            );
        }
        if error != VR_SETTINGS_ERROR_NONE {
            return None;
        }
        if let Some(last) = buffer.last_mut() {
            *last = 0;
        }
        // SAFETY: terminated above.
        let value = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        Some(value.to_string_lossy().into_owned())
    }
}

impl DriverHost for ContextHost {
    fn tracked_device_added(&self, serial: &str, class: i32, device: *mut c_void) -> bool {
        let serial = c_string(serial);
        // SAFETY: IVRServerDriverHost_006 slot and signature.
        let add: PfnTrackedDeviceAdded = unsafe { method(self.server, slot::HOST_TRACKED_DEVICE_ADDED) };
        // SAFETY: `device` is one of the driver's static device objects.
        unsafe { add(self.server, serial.as_ptr(), class, device) }
    }

    fn tracked_device_pose_updated(&self, device: TrackedDeviceIndex, pose: &DriverPose) {
        // SAFETY: IVRServerDriverHost_006 slot and signature.
        let update: PfnTrackedDevicePoseUpdated =
            unsafe { method(self.server, slot::HOST_TRACKED_DEVICE_POSE_UPDATED) };
        // SAFETY: the pose outlives the call.
        unsafe { update(self.server, device, pose, size_u32::<DriverPose>()) };
    }

    fn hmd_pose(&self) -> Option<TrackedDevicePose> {
        const COUNT: usize = HMD_DEVICE_INDEX + 1;
        let mut poses = [TrackedDevicePose::default(); COUNT];
        // SAFETY: IVRServerDriverHost_006 slot and signature.
        let get: PfnGetRawTrackedDevicePoses =
            unsafe { method(self.server, slot::HOST_GET_RAW_TRACKED_DEVICE_POSES) };
        // SAFETY: the array holds `COUNT` poses.
        unsafe { get(self.server, 0.0, poses.as_mut_ptr(), COUNT as u32) };
        poses.get(HMD_DEVICE_INDEX).copied().filter(|pose| pose.pose_is_valid)
    }

    fn property_container(&self, device: TrackedDeviceIndex) -> PropertyContainerHandle {
        // SAFETY: IVRProperties_001 slot and signature.
        let get: PfnTrackedDeviceToPropertyContainer =
            unsafe { method(self.properties, slot::PROPERTIES_TRACKED_DEVICE_TO_CONTAINER) };
        // SAFETY: plain value arguments.
        unsafe { get(self.properties, device) }
    }

    fn set_properties(&self, container: PropertyContainerHandle, properties: &[Property]) -> Result<(), HostError> {
        // Backing storage for every value; the batch points into it.
        let mut strings: Vec<CString> = Vec::new();
        let mut scalars: Vec<[u8; 4]> = Vec::with_capacity(properties.len());
        for (_, value) in properties {
            match value {
                PropertyValue::String(text) => strings.push(c_string(text)),
                PropertyValue::Bool(flag) => scalars.push([u8::from(*flag), 0, 0, 0]),
                PropertyValue::Int32(number) => scalars.push(number.to_ne_bytes()),
                PropertyValue::Float(number) => scalars.push(number.to_ne_bytes()),
            }
        }

        let (mut next_string, mut next_scalar) = (strings.iter(), scalars.iter_mut());
        let mut batch = Vec::with_capacity(properties.len());
        for (prop, value) in properties {
            let (buffer, buffer_size, tag) = match value {
                PropertyValue::String(_) => {
                    let Some(text) = next_string.next() else { break };
                    let size = u32::try_from(text.as_bytes_with_nul().len()).unwrap_or(u32::MAX);
                    (text.as_ptr().cast_mut().cast::<c_void>(), size, STRING_PROPERTY_TAG)
                }
                scalar => {
                    let Some(bytes) = next_scalar.next() else { break };
                    let (size, tag) = match scalar {
                        PropertyValue::Bool(_) => (1, BOOL_PROPERTY_TAG),
                        PropertyValue::Int32(_) => (4, INT32_PROPERTY_TAG),
                        _ => (4, FLOAT_PROPERTY_TAG),
                    };
                    (bytes.as_mut_ptr().cast::<c_void>(), size, tag)
                }
            };
            batch.push(PropertyWrite {
                prop: *prop,
                write_type: PROPERTY_WRITE_SET,
                set_error: TRACKED_PROP_SUCCESS,
                buffer,
                buffer_size,
                tag,
                error: TRACKED_PROP_SUCCESS,
            });
        }

        // SAFETY: IVRProperties_001 slot and signature.
        let write: PfnWritePropertyBatch = unsafe { method(self.properties, slot::PROPERTIES_WRITE_BATCH) };
        let count = u32::try_from(batch.len()).unwrap_or(u32::MAX);
        // SAFETY: the batch and the storage it points into outlive the call.
        let result = unsafe { write(self.properties, container, batch.as_mut_ptr(), count) };
        if result != TRACKED_PROP_SUCCESS {
            return Err(HostError::CallFailed {
                function: "IVRProperties::WritePropertyBatch",
                code: i64::from(result),
            });
        }
        match batch.iter().find(|entry| entry.set_error != TRACKED_PROP_SUCCESS) {
            Some(entry) => {
                let (prop, code) = (entry.prop, entry.set_error);
                tracing::warn!(prop, code, "Property rejected");
                Err(HostError::CallFailed {
                    function: "IVRProperties::WritePropertyBatch",
                    code: i64::from(code),
                })
            }
            None => Ok(()),
        }
    }

    fn create_scalar_component(
        &self,
        container: PropertyContainerHandle,
        name: &str,
    ) -> Result<VRInputComponentHandle, HostError> {
        let name = c_string(name);
        let mut handle: VRInputComponentHandle = 0;
        // SAFETY: IVRDriverInput_003 slot and signature.
        let create: PfnCreateScalarComponent = unsafe { method(self.input, slot::INPUT_CREATE_SCALAR) };
        // SAFETY: C string and out slot outlive the call.
        let result: EVRInputError = unsafe {
            create(
                self.input,
                container,
                name.as_ptr(),
                &mut handle,
                SCALAR_TYPE_RELATIVE,
                SCALAR_UNITS_NORMALIZED_TWO_SIDED,
            )
        };
        if result != VR_INPUT_ERROR_NONE {
            return Err(HostError::CallFailed {
                function: "IVRDriverInput::CreateScalarComponent",
                code: i64::from(result),
            });
        }
        Ok(handle)
    }

    fn update_scalar_component(&self, handle: VRInputComponentHandle, value: f32) -> Result<(), HostError> {
        // SAFETY: IVRDriverInput_003 slot and signature.
        let update: PfnUpdateScalarComponent = unsafe { method(self.input, slot::INPUT_UPDATE_SCALAR) };
        // SAFETY: plain value arguments.
        let result = unsafe { update(self.input, handle, value, 0.0) };
        if result != VR_INPUT_ERROR_NONE {
            return Err(HostError::CallFailed {
                function: "IVRDriverInput::UpdateScalarComponent",
                code: i64::from(result),
            });
        }
        Ok(())
    }

    fn log(&self, message: &str) {
        let message = c_string(message);
        // SAFETY: IVRDriverLog_001 slot and signature.
        let log: PfnDriverLog = unsafe { method(self.log, slot::LOG_LOG) };
        // SAFETY: the C string outlives the call.
        unsafe { log(self.log, message.as_ptr()) };
    }
}
