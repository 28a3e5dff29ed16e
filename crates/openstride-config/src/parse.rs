//! Line scanner for the config file.

use crate::model::{Config, InputMode};
use crate::ConfigError;

const TRIM: &[char] = &[' ', '\t', '\r', '\n', '"'];
const TRIM_TAIL: &[char] = &[' ', '\t', '\r', '\n', '"', ','];

/// Split one line into `(key, value)`.
///
/// Everything after `//` is dropped, the line is split at its first `:`,
/// quotes and whitespace are trimmed from both parts and a trailing comma is
/// removed from the value. Lines without a key return `None`.
///
/// ```
/// use openstride_config::split_key_value;
///
/// assert_eq!(
///     split_key_value(r#"  "comPort": "COM4",   // left USB port"#),
///     Some(("comPort", "COM4"))
/// );
/// assert_eq!(split_key_value("{"), None);
/// ```
pub fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let line = line.split_once("//").map_or(line, |(before, _)| before);
    let (key, value) = line.split_once(':')?;
    let key = key.trim_start_matches(TRIM).trim_end_matches(TRIM_TAIL);
    let value = value.trim_start_matches(TRIM).trim_end_matches(TRIM_TAIL);
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Parse config text, returning the config and every rejected value.
///
/// Unknown keys are ignored. A rejected value leaves the default in place,
/// except booleans, which are `true` only for the literal `true`.
pub fn parse_config(text: &str) -> (Config, Vec<ConfigError>) {
    let mut config = Config::default();
    let mut warnings = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let Some((key, value)) = split_key_value(line) else {
            continue;
        };

        match key {
            "enabled" => config.enabled = parse_bool(key, value, &mut warnings),
            "debugLog" => config.debug_log = parse_bool(key, value, &mut warnings),
            "comPort" => {
                if value.is_empty() {
                    warnings.push(ConfigError::invalid(key, value));
                } else {
                    config.com_port = value.to_string();
                }
            }
            "baudRate" => match value.parse::<i32>() {
                Ok(baud) if baud > 0 => config.baud_rate = baud,
                Ok(baud) => warnings.push(ConfigError::out_of_range(
                    key,
                    f64::from(baud),
                    1.0,
                    f64::from(i32::MAX),
                )),
                Err(_) => warnings.push(ConfigError::invalid(key, value)),
            },
            "speedMultiplier" => {
                if let Some(speed) = parse_ranged(key, value, 0.0, f32::MAX, true, &mut warnings) {
                    config.speed_multiplier = speed;
                }
            }
            "deadzone" => {
                if let Some(deadzone) = parse_ranged(key, value, 0.0, 1.0, false, &mut warnings) {
                    config.deadzone = deadzone;
                }
            }
            "smoothing" => match parse_f32(key, value, &mut warnings) {
                Some(smoothing) if smoothing > 0.0 && smoothing <= 1.0 => {
                    config.smoothing = smoothing;
                }
                Some(smoothing) => warnings.push(ConfigError::out_of_range(
                    key,
                    f64::from(smoothing),
                    0.0,
                    1.0,
                )),
                None => {}
            },
            "inputMode" => {
                let mode = InputMode::from_config_value(value);
                if mode == InputMode::Smart && !value.eq_ignore_ascii_case("smart") {
                    warnings.push(ConfigError::invalid(key, value));
                }
                config.input_mode = mode;
            }
            "targetControllerIndex" => match value.parse::<i32>() {
                Ok(index) => config.target_controller_index = index,
                Err(_) => warnings.push(ConfigError::invalid(key, value)),
            },
            "actionPatterns" => {
                let mut list = value.to_string();
                if list.starts_with('[') && !list.contains(']') {
                    for continuation in lines.by_ref() {
                        let continuation = continuation
                            .split_once("//")
                            .map_or(continuation, |(before, _)| before);
                        list.push(',');
                        list.push_str(continuation);
                        if continuation.contains(']') {
                            break;
                        }
                    }
                }
                config.action_patterns = parse_pattern_list(&list);
            }
            _ => tracing::trace!(key, "Ignoring unknown config key"),
        }
    }

    (config, warnings)
}

fn parse_bool(key: &str, value: &str, warnings: &mut Vec<ConfigError>) -> bool {
    if value != "true" && value != "false" {
        warnings.push(ConfigError::invalid(key, value));
    }
    value == "true"
}

fn parse_f32(key: &str, value: &str, warnings: &mut Vec<ConfigError>) -> Option<f32> {
    match value.parse::<f32>() {
        Ok(parsed) if parsed.is_finite() => Some(parsed),
        _ => {
            warnings.push(ConfigError::invalid(key, value));
            None
        }
    }
}

/// `[min, max]` when `max_inclusive`, otherwise `[min, max)`.
fn parse_ranged(
    key: &str,
    value: &str,
    min: f32,
    max: f32,
    max_inclusive: bool,
    warnings: &mut Vec<ConfigError>,
) -> Option<f32> {
    let parsed = parse_f32(key, value, warnings)?;
    let below_max = if max_inclusive {
        parsed <= max
    } else {
        parsed < max
    };
    if parsed >= min && below_max {
        Some(parsed)
    } else {
        warnings.push(ConfigError::out_of_range(
            key,
            f64::from(parsed),
            f64::from(min),
            f64::from(max),
        ));
        None
    }
}

fn parse_pattern_list(value: &str) -> Vec<String> {
    value
        .trim_matches(TRIM)
        .trim_start_matches('[')
        .split(|c| c == ',' || c == ']')
        .map(|item| item.trim_matches(TRIM))
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
