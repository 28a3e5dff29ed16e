//! Severity shared by every error family.

use core::fmt;

/// How loudly a failure should be reported.
///
/// Nothing here is fatal to the host; `Critical` marks a broken host
/// contract, the rest degrade to pass-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Expected during normal operation
    Info = 0,
    /// Degraded, worth a log line
    Warning = 1,
    /// Operation failed
    Error = 2,
    /// A host contract could not be honoured
    Critical = 3,
}

impl ErrorSeverity {
    /// Whether the pipeline keeps running in pass-through after this.
    pub fn is_recoverable(self) -> bool {
        self < ErrorSeverity::Critical
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARN",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        };
        f.write_str(text)
    }
}
