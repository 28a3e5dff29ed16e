//! The motion runtime: config, logging, state and transport in one handle.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use openstride_bridge::{BridgeConfig, DEFAULT_MODULE_NAME, DynamicBridge, NativeBridge, SampleProcessor};
use openstride_config::Config;
use openstride_injection::{ActionRegistry, ControllerFilter, Injector, MotionLink};
use openstride_shm::{
    BridgeFactory, MotionTransport, ProcessProbe, SystemProcessProbe, TransportOptions, TransportRole,
};
use openstride_state::{CounterSnapshot, MonotonicClock, MotionCounters, TreadmillState};
use openstride_tracing::{LogConfig, LogHandle, init_logging};

/// Where the runtime takes its configuration from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Parse a config file; missing means defaults
    File(PathBuf),
    /// Use an already built config (the SteamVR driver's settings)
    Value(Config),
}

/// Everything needed to start a [`MotionRuntime`].
#[derive(Clone)]
pub struct RuntimeOptions {
    /// Component tag for log lines
    pub component: String,
    /// Config origin
    pub config: ConfigSource,
    /// Append-only log file
    pub log_file: Option<PathBuf>,
    /// Install the global subscriber
    pub logging: bool,
    /// Vendor module tried before the OS search path
    pub module_path: PathBuf,
    /// Shared-memory transport tuning
    pub transport: TransportOptions,
    /// Process liveness source; the OS process table by default
    pub probe: Option<Arc<dyn ProcessProbe>>,
    /// Hardware factory; the vendor module by default
    pub bridge_factory: Option<BridgeFactory>,
}

impl fmt::Debug for RuntimeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeOptions")
            .field("component", &self.component)
            .field("config", &self.config)
            .field("log_file", &self.log_file)
            .field("logging", &self.logging)
            .field("module_path", &self.module_path)
            .field("transport", &self.transport)
            .field("custom_probe", &self.probe.is_some())
            .field("custom_bridge", &self.bridge_factory.is_some())
            .finish()
    }
}

impl RuntimeOptions {
    /// Defaults for `component`: default config, no log file, vendor module
    /// looked up by name.
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            config: ConfigSource::Value(Config::default()),
            log_file: None,
            logging: true,
            module_path: PathBuf::from(DEFAULT_MODULE_NAME),
            transport: TransportOptions::default(),
            probe: None,
            bridge_factory: None,
        }
    }

    /// Read the config from `path`.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = ConfigSource::File(path.into());
        self
    }

    /// Use `config` as is.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = ConfigSource::Value(config);
        self
    }

    /// Append log lines to `path`.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Leave the global subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.logging = false;
        self
    }

    /// Vendor module location.
    pub fn with_module_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.module_path = path.into();
        self
    }

    /// Transport tuning.
    pub fn with_transport(mut self, transport: TransportOptions) -> Self {
        self.transport = transport;
        self
    }

    /// Process liveness source.
    pub fn with_probe(mut self, probe: Arc<dyn ProcessProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Hardware factory.
    pub fn with_bridge_factory(mut self, factory: BridgeFactory) -> Self {
        self.bridge_factory = Some(factory);
        self
    }
}

struct TransportLink(Arc<MotionTransport>);

impl MotionLink for TransportLink {
    fn is_connected(&self) -> bool {
        self.0.is_connected()
    }
}

/// One process's treadmill motion source.
///
/// Shims read [`MotionRuntime::injector`] on the host thread; the bridge
/// callback or the consumer poller writes the state behind it.
pub struct MotionRuntime {
    config: Config,
    state: Arc<TreadmillState>,
    counters: Arc<MotionCounters>,
    clock: MonotonicClock,
    transport: Option<Arc<MotionTransport>>,
    injector: Injector,
    controller_filter: ControllerFilter,
    log: Option<LogHandle>,
    stopped: AtomicBool,
}

impl fmt::Debug for MotionRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotionRuntime")
            .field("enabled", &self.config.enabled)
            .field("role", &self.role())
            .field("connected", &self.is_connected())
            .field("stopped", &self.stopped.load(Ordering::Acquire))
            .finish()
    }
}

impl MotionRuntime {
    /// Load config, install logging, build the state and elect a transport
    /// role.
    ///
    /// Never fails: every problem is logged and leaves the runtime in
    /// pass-through.
    pub fn start(options: RuntimeOptions) -> Self {
        let config = match &options.config {
            ConfigSource::File(path) => Config::load(path),
            ConfigSource::Value(config) => config.clone(),
        };

        let log = options.logging.then(|| install_logging(&options, &config)).flatten();

        let state = Arc::new(TreadmillState::new());
        let counters = Arc::new(MotionCounters::new());
        let clock = MonotonicClock::new();
        let controller_filter = ControllerFilter::new(config.controller_target());

        let (transport, link): (_, Arc<dyn MotionLink>) = if config.enabled {
            let processor = Arc::new(SampleProcessor::with_clock(
                config.conditioner(),
                Arc::clone(&state),
                Arc::clone(&counters),
                clock,
            ));
            let probe = options
                .probe
                .clone()
                .unwrap_or_else(|| Arc::new(SystemProcessProbe::new()));
            let factory = options
                .bridge_factory
                .clone()
                .unwrap_or_else(|| vendor_bridge_factory(&options, &config));

            let transport = Arc::new(MotionTransport::new(
                options.transport.clone(),
                processor,
                Arc::clone(&counters),
                probe,
                factory,
            ));
            let role = transport.start();
            tracing::info!(
                component = %options.component,
                ?role,
                mode = %config.input_mode,
                "Motion runtime started"
            );
            let link = Arc::new(TransportLink(Arc::clone(&transport)));
            (Some(transport), link)
        } else {
            tracing::info!(component = %options.component, "Treadmill disabled by config; passing input through");
            (None, Arc::new(AtomicBool::new(false)))
        };

        let injector = Injector::new(config.input_mode, Arc::clone(&state), Arc::clone(&counters), link);

        Self {
            config,
            state,
            counters,
            clock,
            transport,
            injector,
            controller_filter,
            log,
            stopped: AtomicBool::new(false),
        }
    }

    /// Effective configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Latest conditioned motion.
    pub fn state(&self) -> &Arc<TreadmillState> {
        &self.state
    }

    /// Diagnostic counters.
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Milliseconds since the runtime started.
    pub fn uptime_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Blend entry points for the shims.
    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    /// Slot filter for controller-state interception.
    pub fn controller_filter(&self) -> &ControllerFilter {
        &self.controller_filter
    }

    /// Fresh action registry using the configured movement patterns.
    pub fn new_action_registry<H>(&self) -> ActionRegistry<H>
    where
        H: Copy + Eq + std::hash::Hash,
    {
        ActionRegistry::new(self.config.action_patterns.clone())
    }

    /// Log level control, if this runtime installed logging.
    pub fn log_handle(&self) -> Option<&LogHandle> {
        self.log.as_ref()
    }

    /// Elected transport role; `Disposed` when disabled or shut down.
    pub fn role(&self) -> TransportRole {
        match &self.transport {
            Some(transport) => transport.role(),
            None => TransportRole::Disposed,
        }
    }

    /// Whether live treadmill data is flowing into the state.
    pub fn is_connected(&self) -> bool {
        self.injector.is_connected()
    }

    /// Stop the transport and release hardware and shared memory. Idempotent.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(transport) = &self.transport {
            transport.dispose();
        }
        let counters = self.counters.snapshot();
        tracing::info!(
            samples = counters.samples_received,
            injections = counters.injections,
            passthroughs = counters.passthroughs,
            failovers = counters.failovers,
            "Motion runtime stopped"
        );
    }
}

impl Drop for MotionRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn install_logging(options: &RuntimeOptions, config: &Config) -> Option<LogHandle> {
    let mut log_config = LogConfig::new(options.component.as_str()).with_debug(config.debug_log);
    if let Some(file) = &options.log_file {
        log_config = log_config.with_file(file);
    }
    match init_logging(log_config) {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::warn!(error = %err, "Logging unavailable");
            None
        }
    }
}

fn vendor_bridge_factory(options: &RuntimeOptions, config: &Config) -> BridgeFactory {
    let bridge = BridgeConfig::new(options.module_path.clone(), config.com_port.clone(), config.baud_rate);
    Arc::new(move || Box::new(DynamicBridge::new(bridge.clone())) as Box<dyn NativeBridge>)
}
