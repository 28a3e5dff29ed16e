//! Seqlock behaviour under a concurrent writer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use openstride_filters::MotionSample;
use openstride_shm::{DEFAULT_READ_ATTEMPTS, MotionUpdate, SharedMotionRecord};

#[test]
fn test_reader_never_sees_mixed_samples() {
    let record = Arc::new(SharedMotionRecord::new());
    record.initialize(1);
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let record = Arc::clone(&record);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for step in 0..50_000u32 {
                let v = (step % 1000) as f32;
                let update = MotionUpdate {
                    sample: MotionSample::new(v, v, v),
                    raw_x: step as i32,
                    raw_y: step as i32,
                };
                record.write_sample(&update, i64::from(step) + 1);
            }
            done.store(true, Ordering::Release);
        })
    };

    let reader = {
        let record = Arc::clone(&record);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut mixed = 0usize;
            let mut reads = 0usize;
            while !done.load(Ordering::Acquire) {
                if let Ok(s) = record.read_stable(DEFAULT_READ_ATTEMPTS) {
                    reads += 1;
                    if s.x != s.y || s.y != s.yaw || s.raw_x != s.raw_y {
                        mixed += 1;
                    }
                }
            }
            (mixed, reads)
        })
    };

    assert!(writer.join().is_ok(), "writer thread panicked");
    let result = reader.join();
    assert!(matches!(result, Ok((0, _))), "reader saw mixed samples: {result:?}");
}

#[test]
fn test_update_count_is_monotonic_for_readers() {
    let record = Arc::new(SharedMotionRecord::new());
    record.initialize(1);

    let writer = {
        let record = Arc::clone(&record);
        thread::spawn(move || {
            for step in 0..20_000i64 {
                let update = MotionUpdate {
                    sample: MotionSample::new(0.0, 0.0, 0.0),
                    raw_x: 127,
                    raw_y: 127,
                };
                record.write_sample(&update, step + 1);
            }
        })
    };

    let mut last = 0u64;
    let mut regressions = 0usize;
    for _ in 0..20_000 {
        if let Ok(s) = record.read_stable(DEFAULT_READ_ATTEMPTS) {
            if s.update_count < last {
                regressions += 1;
            }
            last = s.update_count;
        }
    }

    assert!(writer.join().is_ok(), "writer thread panicked");
    assert_eq!(regressions, 0);
}
