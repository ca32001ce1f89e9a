//! The kinematic/dynamic model collaborator.
//!
//! The robot owns exactly one [`Model`].  Generalized positions and
//! velocities live in model-owned storage and are only ever read through
//! borrowed views, so every read reflects the most recent
//! [`Model::update_joint_states`] call.

use nalgebra::{DVector, Isometry3};

/// A named reference frame attached to the mechanism.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub name: String,
    /// Pose of the frame relative to the model's root.
    pub pose: Isometry3<f64>,
}

impl Frame {
    pub fn new(name: impl Into<String>, pose: Isometry3<f64>) -> Self {
        Self {
            name: name.into(),
            pose,
        }
    }
}

/// Storage and refresh of generalized joint state.
pub trait Model {
    /// Degree-of-freedom count; the length of [`positions`][Self::positions]
    /// and [`velocities`][Self::velocities].
    fn num_dofs(&self) -> usize;

    /// Refresh joint positions and velocities from the underlying source.
    fn update_joint_states(&mut self);

    fn positions(&self) -> &DVector<f64>;

    fn velocities(&self) -> &DVector<f64>;

    /// Look up a frame by name.
    fn frame(&self, name: &str) -> Option<&Frame>;
}
