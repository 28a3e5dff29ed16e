//! Injection hot path: shared state in, blended values out, no allocation.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use openstride_config::{Config, InputMode};
use openstride_filters::MotionSample;
use openstride_injection::prelude::*;
use openstride_state::{MotionCounters, TreadmillState};
use openstride_test_helpers::prelude::*;

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

fn live_injector(mode: InputMode, sample: MotionSample) -> Injector {
    let state = Arc::new(TreadmillState::new());
    state.publish(sample, 1);
    Injector::new(
        mode,
        state,
        Arc::new(MotionCounters::new()),
        Arc::new(AtomicBool::new(true)),
    )
}

#[test]
fn test_inject_paths_do_not_allocate() {
    let injector = live_injector(InputMode::Additive, MotionSample::new(0.2, 0.6, 0.0));
    let filter = ControllerFilter::from_index(0);

    let guard = track();
    let a = injector.inject_vector(Sample::new(Vec2::new(0.1, 0.1), true));
    let b = injector.inject_float(Sample::new(0.1, false), FloatAxis::Y);
    let c = injector.inject_joystick(0, Sample::new(Vec2::ZERO, false), &filter);
    let allocations = guard.allocations();
    drop(guard);

    assert_eq!(allocations, 0);
    assert!(a.is_some() && b.is_some() && c.is_some());
}

#[test]
fn test_registry_from_config_patterns() {
    let config = Config::default();
    let mut registry = ActionRegistry::new(config.action_patterns.clone());

    assert!(registry.register(10u64, "/actions/default/in/Locomotion"));
    assert!(registry.register(11u64, "/actions/default/in/thumbstick_y"));
    assert!(!registry.register(12u64, "/actions/default/in/Trigger"));

    assert_eq!(registry.movement_axis(11), Some(FloatAxis::Y));
    assert_eq!(registry.movement_axis(12), None);
}

#[test]
fn test_action_read_end_to_end() {
    let injector = live_injector(InputMode::Smart, MotionSample::new(0.0, 0.8, 0.0));
    let mut registry = ActionRegistry::new(vec!["*move*".to_string()]);
    registry.register(1u64, "move_forward");
    registry.register(2u64, "jump");

    let prior = Sample::new(0.0, false);
    let moved = registry
        .movement_axis(1)
        .and_then(|axis| injector.inject_float(prior, axis));
    let jumped = registry
        .movement_axis(2)
        .and_then(|axis| injector.inject_float(prior, axis));

    assert_eq!(moved, Some(Sample::new(0.8, true)));
    assert_eq!(jumped, None);
}
