//! The state-provider capability.
//!
//! Non-joint providers cache one sample per [`StateProvider::request_state_update`]
//! call and serve reads from that cache until the next update.  Joint
//! providers keep no cache: their data lives in the shared
//! [`Model`][crate::model::Model] and is read through the robot.

use armature_types::ArmatureError;
use nalgebra::DVector;

use crate::component::Component;

/// A component that produces a state vector on demand.
pub trait StateProvider: Component {
    /// Shape of the state as `(rows, cols)`; the flattened length is
    /// `rows * cols`.  Joint providers report `(0, 0)`.
    fn dimension(&self) -> (usize, usize);

    /// Name of the model frame this provider's data is expressed in.
    fn frame(&self) -> Option<&str> {
        None
    }

    /// Degree of freedom in the model that backs a joint provider.
    fn joint_dof(&self) -> Option<usize> {
        None
    }

    /// Pull exactly one fresh sample into internal storage.
    fn request_state_update(&mut self);

    /// The currently cached state.
    fn value(&self) -> DVector<f64>;

    /// Write the cached state into `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`ArmatureError::DimensionMismatch`] when `dest` does not have
    /// the length of the cached state; `dest` is left untouched.
    fn new_state(&self, dest: &mut DVector<f64>) -> Result<(), ArmatureError> {
        let value = self.value();
        if dest.len() != value.len() {
            return Err(ArmatureError::DimensionMismatch {
                component: self.name().to_string(),
                expected: value.len(),
                actual: dest.len(),
            });
        }
        dest.copy_from(&value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_types::Index;

    use crate::component::{ComponentCore, Indexable};

    struct MockThermometer {
        core: ComponentCore,
        reading: f64,
        cached: f64,
    }

    impl Indexable for MockThermometer {
        fn index(&self) -> Option<Index> {
            self.core.index()
        }
        fn assign_index(&mut self, index: Index) {
            self.core.assign_index(index);
        }
    }

    impl Component for MockThermometer {
        fn name(&self) -> &str {
            self.core.name()
        }
    }

    impl StateProvider for MockThermometer {
        fn dimension(&self) -> (usize, usize) {
            (1, 1)
        }
        fn request_state_update(&mut self) {
            self.cached = self.reading;
        }
        fn value(&self) -> DVector<f64> {
            DVector::from_element(1, self.cached)
        }
    }

    #[test]
    fn cached_value_is_stable_until_next_update() {
        let mut t = MockThermometer {
            core: ComponentCore::new("thermo"),
            reading: 21.5,
            cached: 0.0,
        };
        t.request_state_update();
        t.reading = 30.0;
        assert_eq!(t.value()[0], 21.5);

        t.request_state_update();
        assert_eq!(t.value()[0], 30.0);
    }

    #[test]
    fn new_state_rejects_wrong_length() {
        let t = MockThermometer {
            core: ComponentCore::new("thermo"),
            reading: 1.0,
            cached: 4.0,
        };
        let mut dest = DVector::from_element(3, 9.0);
        let err = t.new_state(&mut dest).unwrap_err();
        assert_eq!(
            err,
            ArmatureError::DimensionMismatch {
                component: "thermo".to_string(),
                expected: 1,
                actual: 3,
            }
        );
        assert!(dest.iter().all(|&v| v == 9.0));

        let mut dest = DVector::zeros(1);
        t.new_state(&mut dest).unwrap();
        assert_eq!(dest[0], 4.0);
    }

    /// Declares a larger shape than the state it actually caches.
    struct OversizedDeclaration {
        core: ComponentCore,
    }

    impl Indexable for OversizedDeclaration {
        fn index(&self) -> Option<Index> {
            self.core.index()
        }
        fn assign_index(&mut self, index: Index) {
            self.core.assign_index(index);
        }
    }

    impl Component for OversizedDeclaration {
        fn name(&self) -> &str {
            self.core.name()
        }
    }

    impl StateProvider for OversizedDeclaration {
        fn dimension(&self) -> (usize, usize) {
            (2, 1)
        }
        fn request_state_update(&mut self) {}
        fn value(&self) -> DVector<f64> {
            DVector::from_element(1, 7.0)
        }
    }

    #[test]
    fn new_state_checks_against_the_cached_length() {
        let p = OversizedDeclaration {
            core: ComponentCore::new("odd"),
        };
        let mut dest = DVector::zeros(2);
        assert_eq!(
            p.new_state(&mut dest).unwrap_err(),
            ArmatureError::DimensionMismatch {
                component: "odd".to_string(),
                expected: 1,
                actual: 2,
            }
        );

        let mut dest = DVector::zeros(1);
        p.new_state(&mut dest).unwrap();
        assert_eq!(dest[0], 7.0);
    }
}
