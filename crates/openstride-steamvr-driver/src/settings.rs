//! The `driver_treadmill` section of the SteamVR settings.

use std::path::PathBuf;

use openstride_config::Config;
use openstride_errors::ConfigError;

/// Settings section the driver reads.
pub const SETTINGS_SECTION: &str = "driver_treadmill";

/// Keys in [`SETTINGS_SECTION`].
#[allow(missing_docs)]
pub mod keys {
    pub const COM_PORT: &str = "com_port";
    pub const OMNIBRIDGE_DLL_PATH: &str = "omnibridge_dll_path";
    pub const DEBUG: &str = "debug";
    pub const SPEED_FACTOR: &str = "speed_factor";
    pub const SMOOTHING_FACTOR: &str = "smoothing_factor";
    pub const MODEL_NUMBER: &str = "mytracker_model_number";
}

/// Model number reported when the settings do not name one.
pub const DEFAULT_MODEL_NUMBER: &str = "treadmill_controller";

/// Typed reads from a settings store. `None` means the key is absent or
/// the host reported an error.
pub trait SettingsSource {
    /// Boolean value of `key` in `section`.
    fn get_bool(&self, section: &str, key: &str) -> Option<bool>;
    /// Float value of `key` in `section`.
    fn get_float(&self, section: &str, key: &str) -> Option<f32>;
    /// String value of `key` in `section`.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}

/// Effective driver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSettings {
    /// Serial port of the treadmill.
    pub com_port: String,
    /// Vendor module; next to the driver unless configured.
    pub omnibridge_dll_path: Option<PathBuf>,
    /// Trace logging.
    pub debug: bool,
    /// Joystick scale, `> 0`.
    pub speed_factor: f32,
    /// EMA coefficient in `[0, 1]`.
    pub smoothing_factor: f32,
    /// Model number of the controller device.
    pub model_number: String,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            com_port: "COM3".to_string(),
            omnibridge_dll_path: None,
            debug: true,
            speed_factor: 1.0,
            smoothing_factor: 0.3,
            model_number: DEFAULT_MODEL_NUMBER.to_string(),
        }
    }
}

/// Whether `value` is usable as a speed factor.
pub fn valid_speed_factor(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// Whether `value` is usable as a smoothing factor.
pub fn valid_smoothing_factor(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

impl DriverSettings {
    /// Read every key, keeping the default for absent or rejected values.
    pub fn load(source: &dyn SettingsSource) -> Self {
        let (settings, warnings) = Self::load_with_warnings(source);
        for warning in &warnings {
            tracing::warn!(error = %warning, "Ignoring driver setting");
        }
        settings
    }

    /// Like [`DriverSettings::load`] but returns the rejected values.
    pub fn load_with_warnings(source: &dyn SettingsSource) -> (Self, Vec<ConfigError>) {
        let mut settings = Self::default();
        let mut warnings = Vec::new();

        if let Some(debug) = source.get_bool(SETTINGS_SECTION, keys::DEBUG) {
            settings.debug = debug;
        }
        match source.get_string(SETTINGS_SECTION, keys::COM_PORT) {
            Some(port) if !port.trim().is_empty() => settings.com_port = port.trim().to_string(),
            _ => tracing::info!(default = %settings.com_port, "com_port not set, using default"),
        }
        match source.get_string(SETTINGS_SECTION, keys::OMNIBRIDGE_DLL_PATH) {
            Some(path) if !path.trim().is_empty() => settings.omnibridge_dll_path = Some(PathBuf::from(path.trim())),
            _ => tracing::info!("omnibridge_dll_path not set, looking next to the driver"),
        }
        if let Some(model) = source.get_string(SETTINGS_SECTION, keys::MODEL_NUMBER)
            && !model.is_empty()
        {
            settings.model_number = model;
        }
        if let Some(speed) = source.get_float(SETTINGS_SECTION, keys::SPEED_FACTOR) {
            if valid_speed_factor(speed) {
                settings.speed_factor = speed;
            } else {
                warnings.push(ConfigError::out_of_range(
                    keys::SPEED_FACTOR,
                    f64::from(speed),
                    0.0,
                    f64::from(f32::MAX),
                ));
            }
        }
        if let Some(smoothing) = source.get_float(SETTINGS_SECTION, keys::SMOOTHING_FACTOR) {
            if valid_smoothing_factor(smoothing) {
                settings.smoothing_factor = smoothing;
            } else {
                warnings.push(ConfigError::out_of_range(keys::SMOOTHING_FACTOR, f64::from(smoothing), 0.0, 1.0));
            }
        }

        tracing::debug!(?settings, "Driver settings loaded");
        (settings, warnings)
    }

    /// Runtime config for the shared motion runtime.
    ///
    /// The runtime applies the deadzone; speed and smoothing are left to the
    /// driver, so the runtime's own stages are neutral.
    pub fn runtime_config(&self) -> Config {
        Config {
            com_port: self.com_port.clone(),
            speed_multiplier: 1.0,
            smoothing: 1.0,
            debug_log: self.debug,
            ..Config::default()
        }
    }
}
