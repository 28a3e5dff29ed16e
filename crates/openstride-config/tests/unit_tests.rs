//! File-level tests for configuration loading.

use std::io::Write;

use openstride_config::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const FULL_FILE: &str = r#"{
    // OpenStride treadmill settings
    "enabled": true,
    "comPort": "COM7",
    "baudRate": 115200,
    "speedMultiplier": 2.0,
    "deadzone": 0.15,       // a little more noise on this unit
    "smoothing": 0.5,
    "inputMode": "additive",
    "debugLog": false,
    "targetControllerIndex": 1,
    "somethingElse": 42
}
"#;

#[test]
fn test_missing_file_gives_defaults() -> TestResult {
    let dir = tempfile::tempdir()?;
    let config = Config::load(dir.path().join("absent.json"));
    assert_eq!(config, Config::default());
    Ok(())
}

#[test]
fn test_full_file() -> TestResult {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(FULL_FILE.as_bytes())?;

    let (config, warnings) = Config::load_with_warnings(file.path());
    assert!(warnings.is_empty(), "{warnings:?}");
    assert_eq!(config.com_port, "COM7");
    assert!((config.speed_multiplier - 2.0).abs() < f32::EPSILON);
    assert!((config.deadzone - 0.15).abs() < f32::EPSILON);
    assert!((config.smoothing - 0.5).abs() < f32::EPSILON);
    assert_eq!(config.input_mode, InputMode::Additive);
    assert!(!config.debug_log);
    assert_eq!(config.controller_target(), ControllerTarget::Only(1));
    assert_eq!(config.action_patterns, Config::default().action_patterns);
    Ok(())
}

#[test]
fn test_bad_values_keep_defaults() -> TestResult {
    let text = r#"
        "deadzone": 1.0
        "smoothing": 0
        "speedMultiplier": -1
        "baudRate": fast
        "targetControllerIndex": left
    "#;
    let (config, warnings) = parse_config(text);
    let defaults = Config::default();

    assert_eq!(warnings.len(), 5, "{warnings:?}");
    assert!((config.deadzone - defaults.deadzone).abs() < f32::EPSILON);
    assert!((config.smoothing - defaults.smoothing).abs() < f32::EPSILON);
    assert!((config.speed_multiplier - defaults.speed_multiplier).abs() < f32::EPSILON);
    assert_eq!(config.baud_rate, defaults.baud_rate);
    assert_eq!(config.target_controller_index, -1);
    Ok(())
}

#[test]
fn test_booleans_are_literal_true_only() -> TestResult {
    let (config, warnings) = parse_config("enabled: yes\ndebugLog: true");
    assert!(!config.enabled);
    assert!(config.debug_log);
    assert_eq!(warnings.len(), 1);
    Ok(())
}

#[test]
fn test_unknown_mode_is_smart() -> TestResult {
    let (config, warnings) = parse_config("inputMode: \"sideways\"");
    assert_eq!(config.input_mode, InputMode::Smart);
    assert_eq!(warnings.len(), 1);
    Ok(())
}

#[test]
fn test_effective_config_snapshot() -> TestResult {
    let json = serde_json::to_string_pretty(&Config::default())?;
    insta::assert_snapshot!(json, @r#"
    {
      "enabled": true,
      "comPort": "COM3",
      "baudRate": 115200,
      "speedMultiplier": 1.5,
      "deadzone": 0.1,
      "smoothing": 0.3,
      "inputMode": "smart",
      "actionPatterns": [
        "*move*",
        "*locomotion*",
        "*walk*",
        "*thumbstick*"
      ],
      "targetControllerIndex": -1,
      "debugLog": true
    }
    "#);
    Ok(())
}
