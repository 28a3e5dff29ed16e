//! Per-packet cost of the vendor callback path.

use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use openstride_bridge::prelude::*;
use openstride_filters::ConditionerState;
use openstride_state::{MotionCounters, TreadmillState};

fn bench_process(c: &mut Criterion) {
    let processor = SampleProcessor::new(
        ConditionerState::default(),
        Arc::new(TreadmillState::new()),
        Arc::new(MotionCounters::new()),
    );
    let mut angle = 0.0f32;

    c.bench_function("sample_processor_process", |b| {
        b.iter(|| {
            angle = (angle + 0.7) % 360.0;
            processor.process(std::hint::black_box(RawSample::new(angle, 180, 60)))
        })
    });
}

fn bench_ingest_remote(c: &mut Criterion) {
    let processor = SampleProcessor::new(
        ConditionerState::default(),
        Arc::new(TreadmillState::new()),
        Arc::new(MotionCounters::new()),
    );

    c.bench_function("sample_processor_ingest_remote", |b| {
        b.iter(|| processor.ingest_remote(std::hint::black_box(200), std::hint::black_box(10), 90.0))
    });
}

criterion_group!(benches, bench_process, bench_ingest_remote);
criterion_main!(benches);
