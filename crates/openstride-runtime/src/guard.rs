//! Panic containment for functions the host calls.

use std::panic::{AssertUnwindSafe, catch_unwind};

/// Run `body`, returning `fallback` if it panics.
///
/// Every `extern` entry point of a shim goes through this so no unwind ever
/// reaches host code. The panic is logged with the entry point's name.
pub fn ffi_guard<R>(entry: &'static str, fallback: R, body: impl FnOnce() -> R) -> R {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic".to_string());
            tracing::error!(entry, panic = %message, "Panic contained at host boundary");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_passes_value_through() {
        assert_eq!(ffi_guard("ok", -1, || 7), 7);
    }

    #[test]
    #[traced_test]
    #[expect(clippy::panic, reason = "exercises the guard")]
    fn test_panic_returns_fallback() {
        let code = ffi_guard("xrSyncActions", -2, || -> i32 { panic!("host struct was garbage") });
        assert_eq!(code, -2);
        assert!(logs_contain("host struct was garbage"));
        assert!(logs_contain("xrSyncActions"));
    }
}
