//! Property tests for openstride-state.

use openstride_state::prelude::*;
use quickcheck_macros::quickcheck;

#[quickcheck]
fn publish_stores_exact_bits(x: f32, y: f32, yaw: f32, now: u64) -> bool {
    let state = TreadmillState::new();
    state.publish(MotionSample::new(x, y, yaw), now);
    let snapshot = state.snapshot();
    snapshot.x.to_bits() == x.to_bits()
        && snapshot.y.to_bits() == y.to_bits()
        && snapshot.yaw.to_bits() == yaw.to_bits()
        && snapshot.last_update_ms == now
        && snapshot.active
}

#[quickcheck]
fn update_count_matches_publishes(publishes: u8) -> bool {
    let state = TreadmillState::new();
    for i in 0..publishes {
        state.publish(MotionSample::default(), u64::from(i));
    }
    state.update_count() == u64::from(publishes) && state.is_active() == (publishes > 0)
}

#[quickcheck]
fn freshness_respects_threshold(last: u32, elapsed: u32, threshold: u16) -> bool {
    let state = TreadmillState::new();
    state.publish(MotionSample::default(), u64::from(last));
    let now = u64::from(last) + u64::from(elapsed);
    state.snapshot().is_fresh(now, u64::from(threshold)) == (elapsed < u32::from(threshold))
}
