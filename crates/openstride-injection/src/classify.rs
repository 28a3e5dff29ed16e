//! Movement classification of named input actions.

use std::collections::HashMap;
use std::hash::Hash;

use openstride_filters::any_pattern_matches;

/// Which treadmill axis feeds a single-axis action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatAxis {
    /// Strafe
    X,
    /// Forward
    Y,
}

impl FloatAxis {
    /// Pick the axis from the action name: names containing `forward`,
    /// `vertical` or `y` read Y, all others X. Matching is case-sensitive.
    pub fn for_action_name(name: &str) -> Self {
        if name.contains("forward") || name.contains("vertical") || name.contains('y') {
            FloatAxis::Y
        } else {
            FloatAxis::X
        }
    }
}

/// What the registry remembers about one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionInfo {
    /// Name the host created the action with
    pub name: String,
    /// Whether a movement pattern matched
    pub is_movement: bool,
    /// Axis for single-axis reads
    pub axis: FloatAxis,
}

/// Classification cache keyed by the host's native action handle.
///
/// Owned by one shim and used from the host's calling thread.
#[derive(Debug, Clone)]
pub struct ActionRegistry<H> {
    patterns: Vec<String>,
    actions: HashMap<H, ActionInfo>,
}

impl<H: Copy + Eq + Hash> ActionRegistry<H> {
    /// Empty registry classifying with `patterns`.
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns,
            actions: HashMap::new(),
        }
    }

    /// Classify `name` and remember the result under `handle`.
    ///
    /// Re-registering a handle replaces the old entry. Returns whether the
    /// action is movement.
    pub fn register(&mut self, handle: H, name: &str) -> bool {
        let is_movement = any_pattern_matches(name, &self.patterns);
        if is_movement {
            tracing::info!(action = name, "Movement action registered");
        } else {
            tracing::trace!(action = name, "Action is not movement");
        }
        self.actions.insert(
            handle,
            ActionInfo {
                name: name.to_string(),
                is_movement,
                axis: FloatAxis::for_action_name(name),
            },
        );
        is_movement
    }

    /// Everything known about `handle`.
    pub fn classify(&self, handle: H) -> Option<&ActionInfo> {
        self.actions.get(&handle)
    }

    /// Whether `handle` was registered as movement. Unknown handles are not.
    pub fn is_movement(&self, handle: H) -> bool {
        self.classify(handle).is_some_and(|info| info.is_movement)
    }

    /// Axis for a movement action, `None` for anything else.
    pub fn movement_axis(&self, handle: H) -> Option<FloatAxis> {
        self.classify(handle)
            .filter(|info| info.is_movement)
            .map(|info| info.axis)
    }

    /// Drop every entry, e.g. when the host instance is destroyed.
    pub fn forget_all(&mut self) {
        let forgotten = self.actions.len();
        self.actions.clear();
        tracing::debug!(forgotten, "Action classifications cleared");
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Patterns in use.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
