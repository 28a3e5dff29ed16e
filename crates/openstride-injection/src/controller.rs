//! Slot filter for controller-state polling, where actions have no names.

use openstride_config::ControllerTarget;

/// Decides which controller slots receive injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerFilter {
    target: ControllerTarget,
}

impl ControllerFilter {
    /// Build the filter, warning once if every slot is targeted.
    pub fn new(target: ControllerTarget) -> Self {
        if target == ControllerTarget::AllControllers {
            tracing::warn!(
                "targetControllerIndex is -1: every controller slot is injected, \
                 so motion is applied twice when both hands are polled"
            );
        }
        Self { target }
    }

    /// Build from the raw config index.
    pub fn from_index(index: i32) -> Self {
        Self::new(ControllerTarget::from_index(index))
    }

    /// Whether `slot` receives injection.
    #[inline]
    pub fn accepts(&self, slot: u32) -> bool {
        self.target.accepts(slot)
    }

    /// Configured target.
    pub fn target(&self) -> ControllerTarget {
        self.target
    }
}
