//! Capability traits shared by every registrable component.
//!
//! A component always has a name and an [`Index`] slot ([`Indexable`]).  The
//! three-phase lifecycle ([`GenericComponent`]) is optional: a component opts
//! in by returning `Some` from [`Component::as_lifecycle_mut`].  The
//! [`Robot`][crate::robot::Robot] resolves that capability once at
//! registration.

use armature_types::{Index, LifecycleState};
use tracing::warn;

/// Holds a registry position assigned exactly once.
pub trait Indexable {
    /// The assigned position, or `None` before registration.
    fn index(&self) -> Option<Index>;

    /// Record the registry position.
    ///
    /// # Panics
    ///
    /// Panics when an index has already been assigned.
    fn assign_index(&mut self, index: Index);

    fn is_registered(&self) -> bool {
        self.index().is_some()
    }
}

/// The Initialize / SetUp / Terminate lifecycle.
///
/// Call order is a caller contract; implementations are free to log
/// out-of-order calls but must not panic on them.
pub trait GenericComponent {
    fn initialize(&mut self);
    fn set_up(&mut self);
    fn terminate(&mut self);
    fn lifecycle_state(&self) -> LifecycleState;
}

/// A named, indexable part of a robot.
pub trait Component: Indexable + Send {
    /// Identifier used for name lookups, e.g. `"wrist_ft"`.
    fn name(&self) -> &str;

    /// Read-only view of the lifecycle, used for state queries.  Must return
    /// `Some` exactly when [`Component::as_lifecycle_mut`] does.
    fn as_lifecycle(&self) -> Option<&dyn GenericComponent> {
        None
    }

    /// The lifecycle capability.  Lifecycle sweeps reach a component only
    /// through this accessor.
    fn as_lifecycle_mut(&mut self) -> Option<&mut dyn GenericComponent> {
        None
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LifecycleTracker
// ────────────────────────────────────────────────────────────────────────────

/// Forward-only lifecycle bookkeeping.
///
/// Out-of-order transitions are logged and, when they would move backwards or
/// leave [`LifecycleState::Terminated`], ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleTracker {
    state: LifecycleState,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Move to `next`.  Returns `true` when the transition was applied.
    pub fn advance(&mut self, component: &str, next: LifecycleState) -> bool {
        if next <= self.state {
            warn!(
                component,
                from = ?self.state,
                to = ?next,
                "ignoring backward lifecycle transition"
            );
            return false;
        }
        if predecessor(next) != Some(self.state) {
            warn!(
                component,
                from = ?self.state,
                to = ?next,
                "lifecycle transition skips a phase"
            );
        }
        self.state = next;
        true
    }
}

fn predecessor(state: LifecycleState) -> Option<LifecycleState> {
    match state {
        LifecycleState::Constructed => None,
        LifecycleState::Registered => Some(LifecycleState::Constructed),
        LifecycleState::Initialized => Some(LifecycleState::Registered),
        LifecycleState::Active => Some(LifecycleState::Initialized),
        LifecycleState::Terminated => Some(LifecycleState::Active),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ComponentCore
// ────────────────────────────────────────────────────────────────────────────

/// Name, index slot and lifecycle tracker bundled for embedding in concrete
/// components.
#[derive(Debug, Clone)]
pub struct ComponentCore {
    name: String,
    index: Option<Index>,
    lifecycle: LifecycleTracker,
}

impl ComponentCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
            lifecycle: LifecycleTracker::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> Option<Index> {
        self.index
    }

    /// # Panics
    ///
    /// Panics when an index has already been assigned.
    pub fn assign_index(&mut self, index: Index) {
        assert!(
            self.index.is_none(),
            "component '{}' already holds index {:?}",
            self.name,
            self.index
        );
        self.index = Some(index);
        self.lifecycle.advance(&self.name, LifecycleState::Registered);
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn advance(&mut self, next: LifecycleState) -> bool {
        self.lifecycle.advance(&self.name, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_lifecycle_moves_forward() {
        let mut core = ComponentCore::new("motor_1");
        assert_eq!(core.lifecycle_state(), LifecycleState::Constructed);

        core.assign_index(Index(0));
        assert_eq!(core.lifecycle_state(), LifecycleState::Registered);
        assert!(core.advance(LifecycleState::Initialized));
        assert!(core.advance(LifecycleState::Active));
        assert!(core.advance(LifecycleState::Terminated));
        assert_eq!(core.lifecycle_state(), LifecycleState::Terminated);
    }

    #[test]
    fn terminated_is_final() {
        let mut tracker = LifecycleTracker::new();
        assert!(tracker.advance("x", LifecycleState::Terminated));
        assert!(!tracker.advance("x", LifecycleState::Initialized));
        assert!(!tracker.advance("x", LifecycleState::Terminated));
        assert_eq!(tracker.state(), LifecycleState::Terminated);
    }

    #[test]
    fn skipped_phase_is_still_applied() {
        let mut tracker = LifecycleTracker::new();
        assert!(tracker.advance("x", LifecycleState::Active));
        assert_eq!(tracker.state(), LifecycleState::Active);
    }

    #[test]
    #[should_panic(expected = "already holds index")]
    fn second_index_assignment_panics() {
        let mut core = ComponentCore::new("wrist_ft");
        core.assign_index(Index(0));
        core.assign_index(Index(1));
    }
}
