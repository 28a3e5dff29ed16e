//! Windows debug-output sink

use windows::Win32::System::Diagnostics::Debug::OutputDebugStringA;
use windows::core::PCSTR;

/// Send one line to `OutputDebugStringA`; interior NULs are dropped.
#[expect(unsafe_code, reason = "OutputDebugStringA is a raw Win32 call")]
pub(super) fn emit(line: &[u8]) {
    let mut text: Vec<u8> = line.iter().copied().filter(|b| *b != 0).collect();
    text.push(0);
    // SAFETY: `text` is NUL-terminated and outlives the call.
    unsafe { OutputDebugStringA(PCSTR(text.as_ptr())) };
}
