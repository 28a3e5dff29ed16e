//! Injection Benchmarks
//!
//! Host threads call these once per intercepted read, usually at frame rate.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use criterion::{Criterion, criterion_group, criterion_main};
use openstride_config::InputMode;
use openstride_filters::MotionSample;
use openstride_injection::prelude::*;
use openstride_state::{MotionCounters, TreadmillState};

fn injector(mode: InputMode) -> Injector {
    let state = Arc::new(TreadmillState::new());
    state.publish(MotionSample::new(0.3, 0.7, 90.0), 1);
    Injector::new(
        mode,
        state,
        Arc::new(MotionCounters::new()),
        Arc::new(AtomicBool::new(true)),
    )
}

fn bench_blend(c: &mut Criterion) {
    c.bench_function("blend_vec2_smart", |b| {
        b.iter(|| {
            blend(
                std::hint::black_box(Sample::new(Vec2::new(0.1, 0.2), true)),
                std::hint::black_box(Vec2::new(0.3, 0.7)),
                InputMode::Smart,
                ACTIVE_THRESHOLD,
            )
        })
    });
}

fn bench_inject(c: &mut Criterion) {
    let smart = injector(InputMode::Smart);
    let additive = injector(InputMode::Additive);

    c.bench_function("inject_vector_smart", |b| {
        b.iter(|| smart.inject_vector(std::hint::black_box(Sample::new(Vec2::ZERO, false))))
    });
    c.bench_function("inject_float_additive", |b| {
        b.iter(|| {
            additive.inject_float(std::hint::black_box(Sample::new(0.2, true)), FloatAxis::Y)
        })
    });
}

fn bench_classify(c: &mut Criterion) {
    let mut registry = ActionRegistry::new(vec![
        "*move*".to_string(),
        "*locomotion*".to_string(),
        "*walk*".to_string(),
        "*thumbstick*".to_string(),
    ]);
    for handle in 0..64u64 {
        registry.register(handle, &format!("/actions/main/in/action_{handle}"));
    }

    c.bench_function("movement_axis_lookup", |b| {
        b.iter(|| registry.movement_axis(std::hint::black_box(42u64)))
    });
}

criterion_group!(benches, bench_blend, bench_inject, bench_classify);
criterion_main!(benches);
