//! Moving (actuated) components and the ordered group that holds them.
//!
//! Motor drivers implement [`MovingComponent`] and are registered with
//! [`Robot::register_moving_component`][crate::robot::Robot::register_moving_component].
//! The robot keeps their registry indices in a [`MovingGroup`] so lifecycle
//! sweeps visit motors first and in insertion order.

use armature_types::{ArmatureError, Index};

use crate::component::Component;

/// A position-controlled actuator (motor, servo, joint drive, …).
pub trait MovingComponent: Component {
    /// Command the actuator towards `target` (radians or metres from its zero
    /// position, depending on the joint type).
    ///
    /// # Errors
    ///
    /// Returns [`ArmatureError::HardwareFault`] if the command cannot be
    /// applied.
    fn command_position(&mut self, target: f64) -> Result<(), ArmatureError>;

    /// The most recently known position.
    fn position(&self) -> f64;
}

/// Registry indices of moving components, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MovingGroup {
    members: Vec<Index>,
}

impl MovingGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, index: Index) {
        self.members.push(index);
    }

    pub fn indices(&self) -> &[Index] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, index: Index) -> bool {
        self.members.contains(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentCore, Indexable};

    /// Minimal in-process motor used only for tests.
    struct MockMotor {
        core: ComponentCore,
        position: f64,
    }

    impl Indexable for MockMotor {
        fn index(&self) -> Option<Index> {
            self.core.index()
        }
        fn assign_index(&mut self, index: Index) {
            self.core.assign_index(index);
        }
    }

    impl Component for MockMotor {
        fn name(&self) -> &str {
            self.core.name()
        }
    }

    impl MovingComponent for MockMotor {
        fn command_position(&mut self, target: f64) -> Result<(), ArmatureError> {
            self.position = target;
            Ok(())
        }
        fn position(&self) -> f64 {
            self.position
        }
    }

    #[test]
    fn mock_motor_set_and_get_position() {
        let mut motor = MockMotor {
            core: ComponentCore::new("shoulder"),
            position: 0.0,
        };
        assert_eq!(motor.name(), "shoulder");
        motor
            .command_position(std::f64::consts::FRAC_PI_2)
            .unwrap();
        assert!((motor.position() - std::f64::consts::FRAC_PI_2).abs() < f64::EPSILON);
    }

    #[test]
    fn group_preserves_insertion_order() {
        let mut group = MovingGroup::new();
        assert!(group.is_empty());
        group.push(Index(4));
        group.push(Index(1));
        group.push(Index(7));
        assert_eq!(group.indices(), &[Index(4), Index(1), Index(7)]);
        assert_eq!(group.len(), 3);
        assert!(group.contains(Index(1)));
        assert!(!group.contains(Index(2)));
    }
}
