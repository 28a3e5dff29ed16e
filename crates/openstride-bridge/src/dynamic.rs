//! Vendor module loaded at runtime with `libloading`.
//!
//! Connection order: load the module (configured path, then
//! [`DEFAULT_MODULE_NAME`] on the search path), resolve the entry points,
//! create a reader, open the serial port, register the sample callback.
//! Each failed step releases what the earlier steps acquired.

use std::ffi::{CString, c_char, c_int, c_void};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use openstride_errors::HardwareError;
use openstride_filters::RawSample;
use parking_lot::RwLock;

use crate::native::{NativeBridge, SampleSink};

/// Module name tried on the library search path when the configured path fails.
pub const DEFAULT_MODULE_NAME: &str = "OmniBridge.dll";

/// Callback the vendor invokes once per decoded packet.
pub type SampleCallback = extern "C" fn(ring_angle: f32, gamepad_x: c_int, gamepad_y: c_int);

/// `OmniReader_Create`
pub type CreateFn = unsafe extern "C" fn() -> *mut c_void;
/// `OmniReader_Initialize(reader, port, reserved, baud)`
pub type InitializeFn =
    unsafe extern "C" fn(*mut c_void, *const c_char, c_int, c_int) -> bool;
/// `OmniReader_RegisterCallback`
pub type RegisterCallbackFn = unsafe extern "C" fn(*mut c_void, SampleCallback);
/// `OmniReader_Disconnect` and `OmniReader_Destroy`
pub type ReleaseFn = unsafe extern "C" fn(*mut c_void);

const SYM_CREATE: &[u8] = b"OmniReader_Create\0";
const SYM_INITIALIZE: &[u8] = b"OmniReader_Initialize\0";
const SYM_REGISTER: &[u8] = b"OmniReader_RegisterCallback\0";
const SYM_DISCONNECT: &[u8] = b"OmniReader_Disconnect\0";
const SYM_DESTROY: &[u8] = b"OmniReader_Destroy\0";

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Configured vendor module path
    pub module_path: PathBuf,
    /// Serial port name, e.g. `COM3`
    pub com_port: String,
    /// Serial baud rate
    pub baud_rate: i32,
}

impl BridgeConfig {
    /// Create a bridge configuration.
    pub fn new(module_path: impl Into<PathBuf>, com_port: impl Into<String>, baud_rate: i32) -> Self {
        Self {
            module_path: module_path.into(),
            com_port: com_port.into(),
            baud_rate,
        }
    }
}

/// Vendor entry points.
///
/// `disconnect` is optional; older modules close the port in `destroy`.
#[derive(Debug, Clone, Copy)]
pub struct VendorFnTable {
    /// Create a reader
    pub create: CreateFn,
    /// Open the serial port
    pub initialize: InitializeFn,
    /// Register the sample callback
    pub register_callback: RegisterCallbackFn,
    /// Close the serial port
    pub disconnect: Option<ReleaseFn>,
    /// Free the reader
    pub destroy: ReleaseFn,
}

/// Resolved entry points plus the module that keeps them valid.
pub struct VendorApi {
    fns: VendorFnTable,
    _library: Option<Arc<Library>>,
}

impl fmt::Debug for VendorApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorApi")
            .field("fns", &self.fns)
            .field("dynamic", &self._library.is_some())
            .finish()
    }
}

impl VendorApi {
    /// Load the vendor module and resolve its entry points.
    ///
    /// # Errors
    ///
    /// [`HardwareError::ModuleNotFound`] if neither `module_path` nor
    /// [`DEFAULT_MODULE_NAME`] loads, [`HardwareError::SymbolMissing`] if
    /// create, initialize, register-callback or destroy is absent. The module is unloaded on error.
    pub fn load(module_path: &Path) -> Result<Self, HardwareError> {
        let library = Arc::new(open_library(module_path)?);

        // SAFETY: the signatures match the vendor header; the pointers stay
        // valid while `library` is held, which `VendorApi` guarantees.
        let fns = unsafe {
            VendorFnTable {
                create: required(&library, SYM_CREATE)?,
                initialize: required(&library, SYM_INITIALIZE)?,
                register_callback: required(&library, SYM_REGISTER)?,
                destroy: required(&library, SYM_DESTROY)?,
                disconnect: optional(&library, SYM_DISCONNECT),
            }
        };

        Ok(Self {
            fns,
            _library: Some(library),
        })
    }

    /// Use entry points that are already linked into the process.
    ///
    /// # Safety
    ///
    /// Every function in `fns` must follow the vendor contract: `create`
    /// returns null or a reader accepted by the others, and the registered
    /// callback may be invoked from any thread until `disconnect`/`destroy`
    /// return.
    pub unsafe fn from_table(fns: VendorFnTable) -> Self {
        Self {
            fns,
            _library: None,
        }
    }

    /// The resolved entry points.
    pub fn fns(&self) -> &VendorFnTable {
        &self.fns
    }
}

fn open_library(module_path: &Path) -> Result<Library, HardwareError> {
    // SAFETY: loading runs the module's initializers; the vendor module is
    // trusted to the same degree as any DLL the host loads.
    match unsafe { Library::new(module_path) } {
        Ok(library) => return Ok(library),
        Err(err) => tracing::warn!(
            path = %module_path.display(),
            error = %err,
            "Vendor module not loadable, trying search path"
        ),
    }

    // SAFETY: as above.
    unsafe { Library::new(DEFAULT_MODULE_NAME) }.map_err(|err| {
        tracing::error!(
            path = DEFAULT_MODULE_NAME,
            error = %err,
            "Vendor module not found"
        );
        HardwareError::ModuleNotFound {
            path: module_path.display().to_string(),
        }
    })
}

/// # Safety
///
/// `T` must be the exact function pointer type of the exported symbol.
unsafe fn required<T: Copy>(library: &Library, name: &[u8]) -> Result<T, HardwareError> {
    // SAFETY: forwarded to the caller.
    match unsafe { library.get::<T>(name) } {
        Ok(symbol) => Ok(*symbol),
        Err(_) => Err(HardwareError::SymbolMissing {
            symbol: symbol_name(name),
        }),
    }
}

/// # Safety
///
/// As for [`required`].
unsafe fn optional<T: Copy>(library: &Library, name: &[u8]) -> Option<T> {
    // SAFETY: forwarded to the caller.
    unsafe { library.get::<T>(name) }.ok().map(|symbol| *symbol)
}

fn symbol_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name)).into_owned()
}

/// Sink the trampoline forwards to. The vendor callback has no context
/// argument, so there is one per process.
static ACTIVE_SINK: RwLock<Option<Arc<dyn SampleSink>>> = parking_lot::const_rwlock(None);

extern "C" fn on_vendor_sample(ring_angle: f32, gamepad_x: c_int, gamepad_y: c_int) {
    let sample = RawSample::new(ring_angle, gamepad_x, gamepad_y);
    let result = catch_unwind(AssertUnwindSafe(|| {
        if let Some(sink) = ACTIVE_SINK.read().as_ref() {
            sink.on_sample(sample);
        }
    }));
    if result.is_err() {
        tracing::error!("Sample sink panicked; sample dropped");
    }
}

struct ReaderHandle(*mut c_void);

// SAFETY: the vendor reader is a heap object with no thread affinity; it is
// only touched through the owning `DynamicBridge`.
unsafe impl Send for ReaderHandle {}

struct Session {
    api: VendorApi,
    reader: ReaderHandle,
}

impl Session {
    fn release(self) {
        let Session { api, reader } = self;
        if let Some(disconnect) = api.fns.disconnect {
            // SAFETY: `reader` came from this api's `create` and has not been destroyed.
            unsafe { disconnect(reader.0) };
        }
        // SAFETY: as above; this is the last use of `reader`.
        unsafe { (api.fns.destroy)(reader.0) };
        drop(api);
    }
}

enum ApiSource {
    Load,
    Linked(VendorFnTable),
}

/// [`NativeBridge`] over the vendor module.
pub struct DynamicBridge {
    config: BridgeConfig,
    source: ApiSource,
    session: Option<Session>,
}

impl fmt::Debug for DynamicBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicBridge")
            .field("config", &self.config)
            .field("connected", &self.session.is_some())
            .finish()
    }
}

impl DynamicBridge {
    /// Bridge that loads the vendor module on connect.
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            source: ApiSource::Load,
            session: None,
        }
    }

    /// Bridge over entry points already linked into the process.
    ///
    /// # Safety
    ///
    /// See [`VendorApi::from_table`].
    pub unsafe fn with_fns(config: BridgeConfig, fns: VendorFnTable) -> Self {
        Self {
            config,
            source: ApiSource::Linked(fns),
            session: None,
        }
    }

    /// Connection settings.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn open_session(&self) -> Result<Session, HardwareError> {
        let api = match self.source {
            ApiSource::Load => VendorApi::load(&self.config.module_path)?,
            // SAFETY: the caller of `with_fns` upheld the table contract.
            ApiSource::Linked(fns) => unsafe { VendorApi::from_table(fns) },
        };

        let port = CString::new(self.config.com_port.as_str())
            .map_err(|_| HardwareError::InvalidPort(self.config.com_port.clone()))?;

        // SAFETY: `create` takes no arguments.
        let reader = unsafe { (api.fns.create)() };
        if reader.is_null() {
            return Err(HardwareError::InstanceCreationFailed);
        }
        let session = Session {
            api,
            reader: ReaderHandle(reader),
        };

        // SAFETY: `reader` is live and `port` outlives the call.
        let opened = unsafe {
            (session.api.fns.initialize)(
                session.reader.0,
                port.as_ptr(),
                0,
                self.config.baud_rate,
            )
        };
        if !opened {
            // SAFETY: `reader` is live and never used again.
            unsafe { (session.api.fns.destroy)(session.reader.0) };
            return Err(HardwareError::ConnectFailed {
                port: self.config.com_port.clone(),
                baud_rate: self.config.baud_rate,
            });
        }

        Ok(session)
    }
}

impl NativeBridge for DynamicBridge {
    fn connect(&mut self, sink: Arc<dyn SampleSink>) -> Result<(), HardwareError> {
        if self.session.is_some() {
            return Ok(());
        }

        {
            let mut active = ACTIVE_SINK.write();
            if active.is_some() {
                return Err(HardwareError::AlreadyConnected);
            }
            *active = Some(sink);
        }

        let session = match self.open_session() {
            Ok(session) => session,
            Err(err) => {
                *ACTIVE_SINK.write() = None;
                return Err(err);
            }
        };

        // SAFETY: `reader` is live and `on_vendor_sample` has the declared ABI.
        unsafe { (session.api.fns.register_callback)(session.reader.0, on_vendor_sample) };

        tracing::info!(
            port = %self.config.com_port,
            baud_rate = self.config.baud_rate,
            "Treadmill connected"
        );
        self.session = Some(session);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.release();
            *ACTIVE_SINK.write() = None;
            tracing::info!("Treadmill disconnected");
        }
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

impl Drop for DynamicBridge {
    fn drop(&mut self) {
        self.disconnect();
    }
}
