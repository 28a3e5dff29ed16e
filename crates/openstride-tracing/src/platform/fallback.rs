//! Standard-error sink for platforms without a debugger stream

use std::io::Write;

/// Write one line to standard error, ignoring failures.
pub(super) fn emit(line: &[u8]) {
    std::io::stderr().lock().write_all(line).unwrap_or_default();
}
