use std::fmt;
use std::path::Path;

use openstride_filters::ConditionerState;
use serde::Serialize;

use crate::parse::parse_config;
use crate::ConfigError;

/// How treadmill motion combines with the game's own input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Treadmill replaces native input unconditionally.
    Override,
    /// Treadmill is added to native input and clamped.
    Additive,
    /// Treadmill replaces native input only while it is moving.
    #[default]
    Smart,
}

impl InputMode {
    /// Parse a config value; anything unrecognised is `Smart`.
    pub fn from_config_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "override" => InputMode::Override,
            "additive" => InputMode::Additive,
            _ => InputMode::Smart,
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputMode::Override => write!(f, "override"),
            InputMode::Additive => write!(f, "additive"),
            InputMode::Smart => write!(f, "smart"),
        }
    }
}

/// Which controller slots receive injection on the legacy controller-state path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ControllerTarget {
    /// Every slot is injected. Kept for compatibility: when both hands poll
    /// controller state the motion is applied twice.
    AllControllers,
    /// Only this slot is injected.
    Only(u32),
}

impl ControllerTarget {
    /// Map `targetControllerIndex`; any negative value selects all controllers.
    pub fn from_index(index: i32) -> Self {
        u32::try_from(index).map_or(ControllerTarget::AllControllers, ControllerTarget::Only)
    }

    /// Whether `slot` receives injection.
    pub fn accepts(&self, slot: u32) -> bool {
        match self {
            ControllerTarget::AllControllers => true,
            ControllerTarget::Only(target) => *target == slot,
        }
    }
}

/// Patterns used when the file does not list any.
pub fn default_action_patterns() -> Vec<String> {
    ["*move*", "*locomotion*", "*walk*", "*thumbstick*"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Immutable runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Master switch; `false` makes every shim a pure pass-through.
    pub enabled: bool,
    /// Serial port of the treadmill.
    pub com_port: String,
    /// Serial baud rate.
    pub baud_rate: i32,
    /// Displacement scale, `>= 0`.
    pub speed_multiplier: f32,
    /// Deadzone in `[0, 1)`.
    pub deadzone: f32,
    /// EMA coefficient in `(0, 1]`.
    pub smoothing: f32,
    /// Blend policy.
    pub input_mode: InputMode,
    /// Ordered glob patterns that mark an action as movement.
    pub action_patterns: Vec<String>,
    /// `-1` injects every controller slot, otherwise only this one.
    pub target_controller_index: i32,
    /// Enables trace and debug logging.
    pub debug_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            com_port: "COM3".to_string(),
            baud_rate: 115_200,
            speed_multiplier: 1.5,
            deadzone: 0.1,
            smoothing: 0.3,
            input_mode: InputMode::Smart,
            action_patterns: default_action_patterns(),
            target_controller_index: -1,
            debug_log: true,
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults.
    ///
    /// Never fails: a missing file is logged at info, an unreadable file and
    /// every rejected value are logged at warn.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let (config, warnings) = Self::load_with_warnings(path.as_ref());
        for warning in &warnings {
            tracing::warn!(error = %warning, "Ignoring config value");
        }
        if let Ok(effective) = serde_json::to_string(&config) {
            tracing::debug!(config = %effective, "Effective configuration");
        }
        config
    }

    /// Load from `path` and return the rejected values instead of logging them.
    pub fn load_with_warnings(path: &Path) -> (Self, Vec<ConfigError>) {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                tracing::info!(path = %path.display(), "Loaded config file");
                parse_config(&text)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Config file not found, using defaults");
                (Self::default(), Vec::new())
            }
            Err(err) => (
                Self::default(),
                vec![ConfigError::Read {
                    path: path.display().to_string(),
                    reason: err.to_string(),
                }],
            ),
        }
    }

    /// Conditioner parameters derived from this config.
    pub fn conditioner(&self) -> ConditionerState {
        ConditionerState::new(self.deadzone, self.speed_multiplier, self.smoothing)
    }

    /// Controller filter for the legacy controller-state path.
    pub fn controller_target(&self) -> ControllerTarget {
        ControllerTarget::from_index(self.target_controller_index)
    }
}


#[cfg(test)]
mod logging_tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_missing_file_is_logged() {
        let config = Config::load("definitely/not/here/treadmill_config.json");
        assert_eq!(config, Config::default());
        assert!(logs_contain("Config file not found"));
    }

    #[traced_test]
    #[test]
    fn test_rejected_values_are_logged() -> Result<(), Box<dyn std::error::Error>> {
        let dir = std::env::temp_dir().join(format!("openstride-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("bad.json");
        std::fs::write(&path, "\"smoothing\": 4.0\n")?;

        let config = Config::load(&path);
        assert!((config.smoothing - 0.3).abs() < f32::EPSILON);
        assert!(logs_contain("Ignoring config value"));

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
