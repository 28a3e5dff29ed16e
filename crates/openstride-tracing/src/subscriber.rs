//! Global subscriber installation.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Registry, fmt, reload};

use crate::TracingError;
use crate::level::{LogLevel, level_for};
use crate::platform::DebugOutput;

static INSTALLED: OnceLock<LogHandle> = OnceLock::new();
static INSTALL_LOCK: Mutex<()> = Mutex::new(());

/// Where and how a component logs.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Tag used on debug-output lines.
    pub component: String,
    /// Append-only log file, if any.
    pub file: Option<PathBuf>,
    /// Start with trace logging enabled.
    pub debug: bool,
    /// Mirror events to the OS debug-output stream.
    pub debug_output: bool,
}

impl LogConfig {
    /// Debug output on, no file, debug flag off.
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            file: None,
            debug: false,
            debug_output: true,
        }
    }

    /// Also append to `path`.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Set the initial debug flag.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Do not mirror to the debug-output stream.
    pub fn without_debug_output(mut self) -> Self {
        self.debug_output = false;
        self
    }
}

/// Handle to the installed subscriber's level filter.
#[derive(Debug, Clone)]
pub struct LogHandle {
    reload: reload::Handle<LevelFilter, Registry>,
    debug: Arc<AtomicBool>,
}

impl LogHandle {
    /// Switch trace logging on or off.
    ///
    /// # Errors
    ///
    /// Returns [`TracingError::ReloadFailed`] if the subscriber is gone.
    pub fn set_debug(&self, debug: bool) -> Result<(), TracingError> {
        let filter = level_for(debug).filter();
        self.reload
            .modify(|current| *current = filter)
            .map_err(TracingError::reload_failed)?;
        self.debug.store(debug, Ordering::Relaxed);
        let level = level_for(debug);
        let enabled = debug;
        tracing::info!(debug = enabled, level = %level, "Log level changed");
        Ok(())
    }

    /// Current debug flag.
    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Current lowest logged level.
    pub fn level(&self) -> LogLevel {
        level_for(self.is_debug())
    }
}

fn open_append(path: &Path) -> Result<File, TracingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| TracingError::FileOpen {
            path: path.display().to_string(),
            reason: err.to_string(),
        })
}

/// Install the process-wide subscriber.
///
/// The first call installs; later calls return the same handle and apply
/// their debug flag, so several shims in one process share one sink. A log
/// file that cannot be opened is reported through the installed subscriber
/// and skipped.
///
/// # Errors
///
/// Returns [`TracingError::AlreadyInitialized`] if a foreign subscriber owns
/// the global default.
pub fn init_logging(config: LogConfig) -> Result<LogHandle, TracingError> {
    let _guard = INSTALL_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(handle) = INSTALLED.get() {
        if handle.is_debug() != config.debug {
            handle.set_debug(config.debug)?;
        }
        return Ok(handle.clone());
    }

    let (filter, reload) = reload::Layer::new(level_for(config.debug).filter());

    let (file, file_error) = match config.file.as_deref().map(open_append) {
        Some(Ok(file)) => (Some(file), None),
        Some(Err(err)) => (None, Some(err)),
        None => (None, None),
    };

    let file_layer = file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(Mutex::new(file))
    });
    let debug_layer = config.debug_output.then(|| {
        fmt::layer()
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .with_writer(DebugOutput::new(&config.component))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(debug_layer)
        .try_init()
        .map_err(|_| TracingError::AlreadyInitialized)?;

    let handle = LogHandle {
        reload,
        debug: Arc::new(AtomicBool::new(config.debug)),
    };
    let handle = INSTALLED.get_or_init(|| handle).clone();

    tracing::info!(
        component = %config.component,
        level = %handle.level(),
        file = ?config.file,
        "Logging initialized"
    );
    if let Some(err) = file_error {
        tracing::warn!(error = %err, "Log file unavailable, continuing without it");
    }

    Ok(handle)
}
