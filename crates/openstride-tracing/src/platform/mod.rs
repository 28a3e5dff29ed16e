//! OS debug-output stream.
//!
//! Each formatted event is buffered and handed to the platform sink as one
//! line when the writer is flushed or dropped.

use std::io::{self, Write};
use std::sync::Arc;

use tracing_subscriber::fmt::MakeWriter;

#[cfg(not(target_os = "windows"))]
mod fallback;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(not(target_os = "windows"))]
use fallback::emit;

#[cfg(target_os = "windows")]
use windows::emit;

/// `MakeWriter` for the debug-output stream; every line carries the component tag.
#[derive(Debug, Clone)]
pub struct DebugOutput {
    prefix: Arc<str>,
}

impl DebugOutput {
    /// Tag lines with `[OpenStride:<component>]`.
    pub fn new(component: &str) -> Self {
        Self {
            prefix: Arc::from(format!("[OpenStride:{component}] ")),
        }
    }
}

/// One buffered debug-output line.
#[derive(Debug)]
pub struct DebugLine {
    prefix: Arc<str>,
    buf: Vec<u8>,
}

impl DebugLine {
    fn emit_buffered(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let mut line = Vec::with_capacity(self.prefix.len() + self.buf.len());
        line.extend_from_slice(self.prefix.as_bytes());
        line.append(&mut self.buf);
        emit(&line);
    }
}

impl Write for DebugLine {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit_buffered();
        Ok(())
    }
}

impl Drop for DebugLine {
    fn drop(&mut self) {
        self.emit_buffered();
    }
}

impl<'a> MakeWriter<'a> for DebugOutput {
    type Writer = DebugLine;

    fn make_writer(&'a self) -> Self::Writer {
        DebugLine {
            prefix: Arc::clone(&self.prefix),
            buf: Vec::new(),
        }
    }
}
