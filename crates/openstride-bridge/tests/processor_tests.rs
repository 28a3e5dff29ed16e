//! Sample processing through the sink interface

use std::sync::Arc;
use std::thread;

use openstride_bridge::prelude::*;
use openstride_filters::ConditionerState;
use openstride_state::{MotionCounters, TreadmillState};

fn processor(params: ConditionerState) -> (Arc<SampleProcessor>, Arc<MotionCounters>) {
    let counters = Arc::new(MotionCounters::new());
    let processor = Arc::new(SampleProcessor::new(
        params,
        Arc::new(TreadmillState::new()),
        Arc::clone(&counters),
    ));
    (processor, counters)
}

#[test]
fn test_sink_counts_every_sample() {
    let (processor, counters) = processor(ConditionerState::default());
    let sink: Arc<dyn SampleSink> = processor.clone();

    for angle in 0..250 {
        sink.on_sample(RawSample::new(angle as f32, 127, 127));
    }

    assert_eq!(counters.snapshot().samples_received, 250);
    assert_eq!(processor.state().update_count(), 250);
}

#[test]
fn test_walking_forward_converges() {
    let (processor, _) = processor(ConditionerState::new(0.1, 1.5, 0.3));

    let mut last = 0.0;
    for _ in 0..40 {
        last = processor.process(RawSample::new(0.0, 127, 0)).y;
    }

    assert!((last - 1.0).abs() < 1e-3, "y = {last}");
}

#[test]
fn test_heading_crosses_north_the_short_way() {
    let (processor, _) = processor(ConditionerState::new(0.0, 1.0, 0.5));

    processor.process(RawSample::new(350.0, 127, 127));
    let sample = processor.process(RawSample::new(10.0, 127, 127));

    assert!(sample.yaw.abs() < 1e-4 || (sample.yaw - 360.0).abs() < 1e-4, "yaw = {}", sample.yaw);
}

#[test]
fn test_readers_never_see_out_of_range_values() {
    let (processor, _) = processor(ConditionerState::new(0.0, 4.0, 0.8));
    let state = Arc::clone(processor.state());

    let writer = {
        let processor = Arc::clone(&processor);
        thread::spawn(move || {
            for step in 0..5_000u32 {
                let byte = (step % 256) as i32;
                processor.process(RawSample::new((step % 720) as f32, byte, 255 - byte));
            }
        })
    };

    let reader = thread::spawn(move || {
        let mut bad = 0usize;
        for _ in 0..5_000 {
            let s = state.snapshot();
            if !(-1.0..=1.0).contains(&s.x) || !(-1.0..=1.0).contains(&s.y) || !(0.0..360.0).contains(&s.yaw) {
                bad += 1;
            }
        }
        bad
    });

    assert!(writer.join().is_ok(), "writer thread panicked");
    let bad = reader.join();
    assert!(matches!(bad, Ok(0)), "reader saw out-of-range values: {bad:?}");
}

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn outputs_stay_in_range(
            samples in proptest::collection::vec((-1000.0f32..1000.0, 0i32..=255, 0i32..=255), 1..64),
            deadzone in 0.0f32..0.95,
            speed in 0.0f32..5.0,
            smoothing in 0.01f32..=1.0,
        ) {
            let (processor, _) = processor(ConditionerState::new(deadzone, speed, smoothing));
            for (angle, gx, gy) in samples {
                let out = processor.process(RawSample::new(angle, gx, gy));
                prop_assert!((-1.0..=1.0).contains(&out.x));
                prop_assert!((-1.0..=1.0).contains(&out.y));
                prop_assert!((0.0..360.0).contains(&out.yaw));
            }
        }

        #[test]
        fn remote_samples_trust_heading(gx in 0i32..=255, gy in 0i32..=255, yaw in 0.0f32..360.0) {
            let (processor, _) = processor(ConditionerState::default());
            let out = processor.ingest_remote(gx, gy, yaw);
            prop_assert_eq!(out.yaw, yaw);
        }
    }
}
