//! Allocation tracking for hot-path tests.
//!
//! Install [`TrackingAllocator`] as the global allocator of a test binary,
//! then wrap the code under test in [`track`]:
//!
//! ```rust,ignore
//! #[global_allocator]
//! static GLOBAL: TrackingAllocator = TrackingAllocator;
//!
//! let guard = track();
//! injector.inject_vector(prior, Vec2::ZERO);
//! assert_eq!(guard.allocations(), 0);
//! ```

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

thread_local! {
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
    static ENABLED: Cell<bool> = const { Cell::new(false) };
}

/// Global allocator that counts allocations on threads with an active guard.
#[derive(Debug)]
pub struct TrackingAllocator;

// SAFETY: delegates to `System`; the counters are thread-local cells and
// never allocate.
unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded caller contract.
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() && ENABLED.with(Cell::get) {
            ALLOCATIONS.with(|count| count.set(count.get().saturating_add(1)));
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: forwarded caller contract.
        unsafe { System.dealloc(ptr, layout) };
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: forwarded caller contract.
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() && ENABLED.with(Cell::get) && new_size > layout.size() {
            ALLOCATIONS.with(|count| count.set(count.get().saturating_add(1)));
        }
        new_ptr
    }
}

/// Counts allocations on the current thread while alive.
#[derive(Debug)]
pub struct AllocationGuard {
    start: usize,
}

impl AllocationGuard {
    /// Start counting.
    pub fn new() -> Self {
        ENABLED.with(|enabled| enabled.set(true));
        Self {
            start: ALLOCATIONS.with(Cell::get),
        }
    }

    /// Allocations since the guard was created.
    pub fn allocations(&self) -> usize {
        ALLOCATIONS.with(Cell::get).saturating_sub(self.start)
    }
}

impl Default for AllocationGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AllocationGuard {
    fn drop(&mut self) {
        ENABLED.with(|enabled| enabled.set(false));
    }
}

/// Start an [`AllocationGuard`].
pub fn track() -> AllocationGuard {
    AllocationGuard::new()
}
