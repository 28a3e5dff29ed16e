//! Level policy.
//!
//! Release builds log info and above, debug builds add debug. The runtime
//! debug flag opens everything up to trace.

use core::fmt;

use tracing_subscriber::filter::LevelFilter;

/// The four levels the log sink distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Per-sample and per-call detail
    Trace,
    /// Diagnostics useful while tuning
    Debug,
    /// Lifecycle events
    Info,
    /// Failures
    Error,
}

impl LogLevel {
    /// The matching `tracing` filter.
    pub fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Lowest level logged when the debug flag is off.
pub fn base_level() -> LogLevel {
    if cfg!(debug_assertions) {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}

/// Lowest level logged for the given debug flag.
pub fn level_for(debug: bool) -> LogLevel {
    if debug { LogLevel::Trace } else { base_level() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_flag_opens_trace() {
        assert_eq!(level_for(true), LogLevel::Trace);
        assert_eq!(level_for(true).filter(), LevelFilter::TRACE);
    }

    #[test]
    fn test_base_level_depends_on_build() {
        let expected = if cfg!(debug_assertions) {
            LogLevel::Debug
        } else {
            LogLevel::Info
        };
        assert_eq!(level_for(false), expected);
        assert!(level_for(false) > LogLevel::Trace);
    }
}
