//! Text commands sent through `DebugRequest`.
//!
//! ```text
//! debug <true|1|on|...>   -> DEBUG=true|false
//! speed <factor>          -> SPEED=<factor>      | Invalid SPEED
//! smoothing <factor>      -> SMOOTHING=<factor>  | Invalid SMOOTHING (0.0-1.0)
//! (empty)                 -> No request
//! anything else           -> Unknown command
//! ```

use std::ffi::c_char;

use crate::motion::Tunables;

/// Answer to an empty request.
pub const NO_REQUEST: &str = "No request";
/// Answer to an unrecognised command.
pub const UNKNOWN_COMMAND: &str = "Unknown command";
/// Answer to a rejected speed.
pub const INVALID_SPEED: &str = "Invalid SPEED";
/// Answer to a rejected smoothing factor.
pub const INVALID_SMOOTHING: &str = "Invalid SMOOTHING (0.0-1.0)";
/// What the visual tracker answers to every request.
pub const VISUAL_TRACKER_RESPONSE: &str = "VisualTracker";

/// A parsed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugCommand<'a> {
    /// Blank request
    Empty,
    /// `debug <flag>`
    Debug(&'a str),
    /// `speed <value>`
    Speed(&'a str),
    /// `smoothing <value>`
    Smoothing(&'a str),
    /// Anything else
    Unknown(&'a str),
}

impl<'a> DebugCommand<'a> {
    /// Split `request` into a case-insensitive command and its first argument.
    pub fn parse(request: &'a str) -> Self {
        let mut words = request.split_whitespace();
        let Some(command) = words.next() else {
            return DebugCommand::Empty;
        };
        let argument = words.next().unwrap_or("");
        match command.to_ascii_lowercase().as_str() {
            "debug" => DebugCommand::Debug(argument),
            "speed" => DebugCommand::Speed(argument),
            "smoothing" => DebugCommand::Smoothing(argument),
            _ => DebugCommand::Unknown(command),
        }
    }
}

/// `true`, `1` and `on` in any case switch debug on; everything else off.
pub fn parse_debug_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on")
}

/// Run `request` against `tunables` and build the answer.
///
/// `on_debug` is told about every debug change so the log level can follow.
pub fn handle_request(request: &str, tunables: &Tunables, on_debug: impl FnOnce(bool)) -> String {
    let command = DebugCommand::parse(request);
    tracing::debug!(request = %request.trim(), ?command, "DebugRequest");
    match command {
        DebugCommand::Empty => NO_REQUEST.to_string(),
        DebugCommand::Debug(flag) => {
            let debug = parse_debug_flag(flag);
            tunables.set_debug(debug);
            on_debug(debug);
            let enabled = debug;
            tracing::info!(debug = enabled, source = %flag, "Debug flag changed");
            format!("DEBUG={debug}")
        }
        DebugCommand::Speed(value) => match value.parse::<f32>() {
            Ok(speed) if tunables.set_speed_factor(speed) => {
                tracing::info!(speed_factor = speed, "Speed factor changed");
                format!("SPEED={speed}")
            }
            _ => INVALID_SPEED.to_string(),
        },
        DebugCommand::Smoothing(value) => match value.parse::<f32>() {
            Ok(smoothing) if tunables.set_smoothing_factor(smoothing) => {
                tracing::info!(smoothing_factor = smoothing, "Smoothing factor changed");
                format!("SMOOTHING={smoothing}")
            }
            _ => INVALID_SMOOTHING.to_string(),
        },
        DebugCommand::Unknown(_) => UNKNOWN_COMMAND.to_string(),
    }
}

/// Copy `text` into a host buffer of `size` bytes, truncating and always
/// terminating it. A null or empty buffer is left alone.
///
/// # Safety
///
/// `buffer` must be null or valid for `size` bytes of writes.
pub unsafe fn write_response(buffer: *mut c_char, size: u32, text: &str) {
    let Ok(size) = usize::try_from(size) else {
        return;
    };
    if buffer.is_null() || size == 0 {
        return;
    }
    let bytes = text.as_bytes();
    let len = bytes.len().min(size - 1);
    // SAFETY: `len < size` bytes fit the buffer, the source is a live slice
    // and host memory never overlaps it.
    unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), buffer, len) };
    // SAFETY: `len <= size - 1`.
    unsafe { buffer.add(len).write(0) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    fn run(request: &str) -> (String, Option<bool>) {
        let tunables = Tunables::new();
        let mut seen = None;
        let answer = handle_request(request, &tunables, |debug| seen = Some(debug));
        (answer, seen)
    }

    #[test]
    fn test_parse() {
        assert_eq!(DebugCommand::parse("  \t\r\n"), DebugCommand::Empty);
        assert_eq!(DebugCommand::parse("SPEED 1.5 extra"), DebugCommand::Speed("1.5"));
        assert_eq!(DebugCommand::parse("debug"), DebugCommand::Debug(""));
        assert_eq!(DebugCommand::parse("reset now"), DebugCommand::Unknown("reset"));
    }

    #[test]
    fn test_debug_flag() {
        for on in ["true", "1", "ON", " True "] {
            assert!(parse_debug_flag(on), "{on}");
        }
        for off in ["false", "0", "yes", ""] {
            assert!(!parse_debug_flag(off), "{off}");
        }
        assert_eq!(run("debug on"), ("DEBUG=true".to_string(), Some(true)));
        assert_eq!(run("Debug nope"), ("DEBUG=false".to_string(), Some(false)));
    }

    #[test]
    fn test_speed() {
        let tunables = Tunables::new();
        assert_eq!(handle_request("speed 2", &tunables, |_| {}), "SPEED=2");
        assert_eq!(handle_request("speed 1.25", &tunables, |_| {}), "SPEED=1.25");
        assert!((tunables.speed_factor() - 1.25).abs() < f32::EPSILON);

        for bad in ["speed 0", "speed -1", "speed fast", "speed", "speed inf"] {
            assert_eq!(handle_request(bad, &tunables, |_| {}), INVALID_SPEED, "{bad}");
        }
        assert!((tunables.speed_factor() - 1.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_smoothing() {
        let tunables = Tunables::new();
        assert_eq!(handle_request("smoothing 0", &tunables, |_| {}), "SMOOTHING=0");
        assert_eq!(handle_request("smoothing 0.5", &tunables, |_| {}), "SMOOTHING=0.5");
        for bad in ["smoothing 1.5", "smoothing -0.1", "smoothing x"] {
            assert_eq!(handle_request(bad, &tunables, |_| {}), INVALID_SMOOTHING, "{bad}");
        }
        assert!((tunables.smoothing_factor() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_and_unknown() {
        assert_eq!(run("").0, NO_REQUEST);
        assert_eq!(run("calibrate").0, UNKNOWN_COMMAND);
        assert_eq!(run("calibrate").1, None);
    }

    #[test]
    fn test_response_is_truncated_and_terminated() {
        let mut buffer = [0x7f as c_char; 6];
        // SAFETY: the buffer holds 6 bytes.
        unsafe { write_response(buffer.as_mut_ptr(), 6, "Unknown command") };
        // SAFETY: write_response terminated it.
        let text = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        assert_eq!(text.to_bytes(), b"Unkno");

        // SAFETY: null is tolerated.
        unsafe { write_response(std::ptr::null_mut(), 16, "ignored") };
        // SAFETY: a zero size writes nothing.
        unsafe { write_response(buffer.as_mut_ptr(), 0, "ignored") };
        assert_eq!(buffer[0], b'U' as c_char);
    }
}
