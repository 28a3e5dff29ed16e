//! Concurrency tests for openstride-state.
//!
//! One writer, many readers: readers must only ever see values the writer
//! actually published.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use openstride_state::prelude::*;

#[test]
fn test_readers_only_observe_published_values() {
    let state = Arc::new(TreadmillState::new());
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let state = Arc::clone(&state);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut last_count = 0;
                while !done.load(Ordering::Relaxed) {
                    let snapshot = state.snapshot();
                    // the writer only ever publishes x == y == k / 1000
                    assert!((0.0..=1.0).contains(&snapshot.x));
                    assert!((0.0..=1.0).contains(&snapshot.y));
                    assert!(snapshot.update_count >= last_count);
                    last_count = snapshot.update_count;
                }
            })
        })
        .collect();

    let writer = {
        let state = Arc::clone(&state);
        thread::spawn(move || {
            for k in 0..=1000u16 {
                let v = f32::from(k) / 1000.0;
                state.publish(MotionSample::new(v, v, 0.0), u64::from(k));
            }
        })
    };

    assert!(writer.join().is_ok(), "writer panicked unexpectedly");
    done.store(true, Ordering::Relaxed);
    for handle in readers {
        assert!(handle.join().is_ok(), "reader panicked unexpectedly");
    }

    let snapshot = state.snapshot();
    assert_eq!(snapshot.update_count, 1001);
    assert!((snapshot.x - 1.0).abs() < f32::EPSILON);
}

#[test]
fn test_concurrent_counters() {
    let counters = Arc::new(MotionCounters::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let counters = Arc::clone(&counters);
            thread::spawn(move || {
                for _ in 0..5_000 {
                    counters.inc_injection();
                    counters.inc_passthrough();
                }
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().is_ok(), "thread panicked unexpectedly");
    }

    let snapshot = counters.snapshot();
    assert_eq!(snapshot.injections, 40_000);
    assert_eq!(snapshot.passthroughs, 40_000);
}
