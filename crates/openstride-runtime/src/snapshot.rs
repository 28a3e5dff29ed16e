//! Lock-free published values for the host-thread path.
//!
//! Writers replace the whole value; readers borrow whichever value was
//! current when they pinned the epoch. A replaced value is freed once no
//! reader can still see it.

use std::fmt;
use std::sync::atomic::Ordering;

use crossbeam::epoch::{self, Atomic, Owned, Shared};

/// An `Option<T>` that readers load without locking.
///
/// Replacements are atomic but not serialized: callers doing
/// read-modify-write hold their own lock around it.
pub struct SnapshotCell<T> {
    current: Atomic<T>,
}

impl<T: Send + Sync> SnapshotCell<T> {
    /// Empty cell.
    pub const fn new() -> Self {
        Self { current: Atomic::null() }
    }

    /// Run `read` on the current value.
    pub fn load<R>(&self, read: impl FnOnce(Option<&T>) -> R) -> R {
        let guard = epoch::pin();
        let current = self.current.load(Ordering::Acquire, &guard);
        // SAFETY: every non-null pointer stored here came from `Owned` and is
        // only freed through `defer_destroy` after being swapped out, which
        // waits for this guard.
        read(unsafe { current.as_ref() })
    }

    /// Whether a value is published.
    pub fn is_set(&self) -> bool {
        let guard = epoch::pin();
        !self.current.load(Ordering::Acquire, &guard).is_null()
    }

    /// Publish `value`, or clear the cell with `None`.
    pub fn store(&self, value: Option<T>) {
        let guard = epoch::pin();
        let previous = match value {
            Some(value) => self.current.swap(Owned::new(value), Ordering::AcqRel, &guard),
            None => self.current.swap(Shared::null(), Ordering::AcqRel, &guard),
        };
        retire(previous, &guard);
    }

    /// Clear the cell and return a copy of what it held.
    pub fn take(&self) -> Option<T>
    where
        T: Clone,
    {
        let guard = epoch::pin();
        let previous = self.current.swap(Shared::null(), Ordering::AcqRel, &guard);
        // SAFETY: as in `load`; the pointer is not freed before `retire`.
        let value = unsafe { previous.as_ref() }.cloned();
        retire(previous, &guard);
        value
    }
}

fn retire<T>(previous: Shared<'_, T>, guard: &epoch::Guard) {
    if !previous.is_null() {
        // SAFETY: `previous` was just unlinked by a swap, so no new reader
        // can reach it; current readers are covered by the deferral.
        unsafe { guard.defer_destroy(previous) };
    }
}

impl<T: Send + Sync> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SnapshotCell<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` rules out readers; the pointer came from `Owned`.
        unsafe {
            let guard = epoch::unprotected();
            let current = self.current.swap(Shared::null(), Ordering::Relaxed, guard);
            if !current.is_null() {
                drop(current.into_owned());
            }
        }
    }
}

impl<T: Send + Sync> fmt::Debug for SnapshotCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotCell").field("set", &self.is_set()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    #[test]
    fn test_store_load_take() {
        let cell = SnapshotCell::new();
        assert!(!cell.is_set());
        assert_eq!(cell.load(|v: Option<&u32>| v.copied()), None);

        cell.store(Some(7));
        assert_eq!(cell.load(|v| v.copied()), Some(7));

        assert_eq!(cell.take(), Some(7));
        assert!(!cell.is_set());

        cell.store(Some(9));
        cell.store(None);
        assert_eq!(cell.take(), None);
    }

    #[test]
    fn test_drop_frees_current_value() {
        let value = Arc::new(());
        let cell = SnapshotCell::new();
        cell.store(Some(Arc::clone(&value)));
        drop(cell);
        assert_eq!(Arc::strong_count(&value), 1);
    }

    #[test]
    fn test_readers_always_see_a_whole_value() {
        let cell = Arc::new(SnapshotCell::new());
        cell.store(Some([0u64; 8]));
        let stop = Arc::new(AtomicBool::new(false));

        let reader = {
            let cell = Arc::clone(&cell);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut reads = 0u64;
                loop {
                    let uniform = cell.load(|v| v.is_some_and(|words| words.iter().all(|w| *w == words[0])));
                    assert!(uniform, "reader saw a mixed value");
                    reads += 1;
                    if stop.load(Ordering::Relaxed) {
                        return reads;
                    }
                }
            })
        };

        for i in 1..2_000u64 {
            cell.store(Some([i; 8]));
        }
        stop.store(true, Ordering::Relaxed);
        let reads = reader.join().unwrap_or_default();
        assert!(reads > 0);
    }
}
