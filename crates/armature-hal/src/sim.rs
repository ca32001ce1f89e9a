//! In-process simulated collaborators for headless runs and tests.
//!
//! [`SimModel`] stands in for the dynamics model, [`SimWrenchSource`] for a
//! force/torque driver, [`SimMotor`] for a motor, and [`SimJointEncoder`] for
//! a joint state provider.  [`SimRobot`] assembles them into a [`Robot`].
//!
//! # Example
//!
//! ```rust
//! use armature_hal::sim::SimRobot;
//!
//! let mut robot = SimRobot::builder("arm", 2)
//!     .with_frame("wrist_link", [0.0, 0.0, 0.4])
//!     .with_motor("shoulder")
//!     .with_force_torque_sensor("wrist_ft", "wrist_link", false, [0.0; 6])
//!     .with_joint_encoder("shoulder_encoder", 0)
//!     .build()
//!     .expect("sim robot must build");
//!
//! robot.initialize();
//! robot.set_up();
//! robot.update_all_states();
//! assert_eq!(robot.joint_positions().len(), 2);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use armature_types::{ArmatureError, Index, LifecycleState, StateCategory};
use nalgebra::{DVector, Isometry3, Vector6};
use tracing::warn;

use crate::component::{Component, ComponentCore, GenericComponent, Indexable};
use crate::config::RobotDescription;
use crate::model::{Frame, Model};
use crate::moving::MovingComponent;
use crate::robot::Robot;
use crate::sensor::{ForceTorqueSensor, WrenchSource};
use crate::state_provider::StateProvider;

// ────────────────────────────────────────────────────────────────────────────
// SimModel
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FeedState {
    pending: VecDeque<(DVector<f64>, DVector<f64>)>,
    refreshes: usize,
}

/// Handle for pushing joint samples into a [`SimModel`] after the model has
/// been handed to a robot.
#[derive(Clone, Default)]
pub struct JointFeed {
    inner: Arc<Mutex<FeedState>>,
}

impl JointFeed {
    /// Queue a sample; the next refresh consumes it.
    pub fn push(&self, positions: DVector<f64>, velocities: DVector<f64>) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .push_back((positions, velocities));
    }

    /// Number of refreshes the model has performed.
    pub fn refreshes(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .refreshes
    }
}

/// Simulated model.  Each refresh consumes the next queued sample from its
/// [`JointFeed`]; with nothing queued it integrates positions forward by
/// `velocities * time_step`.
pub struct SimModel {
    positions: DVector<f64>,
    velocities: DVector<f64>,
    frames: Vec<Frame>,
    time_step: f64,
    feed: JointFeed,
}

impl SimModel {
    pub const DEFAULT_TIME_STEP: f64 = 0.01;

    pub fn new(dofs: usize) -> Self {
        Self {
            positions: DVector::zeros(dofs),
            velocities: DVector::zeros(dofs),
            frames: Vec::new(),
            time_step: Self::DEFAULT_TIME_STEP,
            feed: JointFeed::default(),
        }
    }

    pub fn with_frame(mut self, name: impl Into<String>, pose: Isometry3<f64>) -> Self {
        self.frames.push(Frame::new(name, pose));
        self
    }

    /// Set constant joint velocities used when no sample is queued.
    ///
    /// # Errors
    ///
    /// Returns [`ArmatureError::DimensionMismatch`] when `velocities` does not
    /// have one entry per degree of freedom.
    pub fn with_velocities(mut self, velocities: DVector<f64>) -> Result<Self, ArmatureError> {
        if velocities.len() != self.positions.len() {
            return Err(ArmatureError::DimensionMismatch {
                component: "sim_model".to_string(),
                expected: self.positions.len(),
                actual: velocities.len(),
            });
        }
        self.velocities = velocities;
        Ok(self)
    }

    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn feed(&self) -> JointFeed {
        self.feed.clone()
    }
}

impl Model for SimModel {
    fn num_dofs(&self) -> usize {
        self.positions.len()
    }

    fn update_joint_states(&mut self) {
        let mut feed = self.feed.inner.lock().unwrap_or_else(PoisonError::into_inner);
        feed.refreshes += 1;
        match feed.pending.pop_front() {
            Some((p, v)) if p.len() == self.positions.len() && v.len() == self.velocities.len() => {
                self.positions = p;
                self.velocities = v;
            }
            Some((p, v)) => {
                warn!(
                    expected = self.positions.len(),
                    positions = p.len(),
                    velocities = v.len(),
                    "dropping joint sample with wrong dimension"
                );
            }
            None => {
                self.positions += &self.velocities * self.time_step;
            }
        }
    }

    fn positions(&self) -> &DVector<f64> {
        &self.positions
    }

    fn velocities(&self) -> &DVector<f64> {
        &self.velocities
    }

    fn frame(&self, name: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.name == name)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimWrenchSource
// ────────────────────────────────────────────────────────────────────────────

/// Shared control over a [`SimWrenchSource`].
#[derive(Clone)]
pub struct SimWrenchHandle {
    current: Arc<Mutex<Vector6<f64>>>,
    reads: Arc<AtomicUsize>,
}

impl SimWrenchHandle {
    /// Change the wrench returned by subsequent reads.
    pub fn set(&self, wrench: Vector6<f64>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = wrench;
    }

    /// Number of raw samples taken so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

/// A simulated force/torque driver returning a settable wrench.
pub struct SimWrenchSource {
    handle: SimWrenchHandle,
}

impl SimWrenchSource {
    pub fn constant(wrench: Vector6<f64>) -> Self {
        Self {
            handle: SimWrenchHandle {
                current: Arc::new(Mutex::new(wrench)),
                reads: Arc::new(AtomicUsize::new(0)),
            },
        }
    }

    pub fn handle(&self) -> SimWrenchHandle {
        self.handle.clone()
    }
}

impl WrenchSource for SimWrenchSource {
    fn read_wrench(&mut self) -> Vector6<f64> {
        self.handle.reads.fetch_add(1, Ordering::SeqCst);
        *self
            .handle
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimMotor
// ────────────────────────────────────────────────────────────────────────────

/// A simulated motor that records the most recent commanded position.
/// Commands are refused once the motor has terminated.
pub struct SimMotor {
    core: ComponentCore,
    position: f64,
}

impl SimMotor {
    pub fn new(name: impl Into<String>) -> Box<Self> {
        Box::new(Self {
            core: ComponentCore::new(name),
            position: 0.0,
        })
    }
}

impl Indexable for SimMotor {
    fn index(&self) -> Option<Index> {
        self.core.index()
    }

    fn assign_index(&mut self, index: Index) {
        self.core.assign_index(index);
    }
}

impl Component for SimMotor {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn as_lifecycle(&self) -> Option<&dyn GenericComponent> {
        Some(self)
    }

    fn as_lifecycle_mut(&mut self) -> Option<&mut dyn GenericComponent> {
        Some(self)
    }
}

impl GenericComponent for SimMotor {
    fn initialize(&mut self) {
        self.core.advance(LifecycleState::Initialized);
    }

    fn set_up(&mut self) {
        self.core.advance(LifecycleState::Active);
    }

    fn terminate(&mut self) {
        self.core.advance(LifecycleState::Terminated);
    }

    fn lifecycle_state(&self) -> LifecycleState {
        self.core.lifecycle_state()
    }
}

impl MovingComponent for SimMotor {
    fn command_position(&mut self, target: f64) -> Result<(), ArmatureError> {
        if self.core.lifecycle_state() == LifecycleState::Terminated {
            return Err(ArmatureError::HardwareFault {
                component: self.core.name().to_string(),
                details: "motor is terminated".to_string(),
            });
        }
        self.position = target;
        Ok(())
    }

    fn position(&self) -> f64 {
        self.position
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimJointEncoder
// ────────────────────────────────────────────────────────────────────────────

/// Joint state provider for one degree of freedom.  Holds no cache and no
/// lifecycle; its data is read from the model through the robot.
pub struct SimJointEncoder {
    core: ComponentCore,
    dof: usize,
}

impl SimJointEncoder {
    pub fn new(name: impl Into<String>, dof: usize) -> Box<Self> {
        Box::new(Self {
            core: ComponentCore::new(name),
            dof,
        })
    }
}

impl Indexable for SimJointEncoder {
    fn index(&self) -> Option<Index> {
        self.core.index()
    }

    fn assign_index(&mut self, index: Index) {
        self.core.assign_index(index);
    }
}

impl Component for SimJointEncoder {
    fn name(&self) -> &str {
        self.core.name()
    }
}

impl StateProvider for SimJointEncoder {
    fn dimension(&self) -> (usize, usize) {
        (0, 0)
    }

    fn joint_dof(&self) -> Option<usize> {
        Some(self.dof)
    }

    fn request_state_update(&mut self) {}

    fn value(&self) -> DVector<f64> {
        DVector::zeros(0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRobot builder
// ────────────────────────────────────────────────────────────────────────────

struct ForceTorqueEntry {
    name: String,
    frame: String,
    reverse: bool,
    wrench: [f64; 6],
}

/// Builder that assembles a [`Robot`] from simulated collaborators.
///
/// Components are registered motors first, then force/torque sensors, then
/// joint encoders, each in the order they were added.
pub struct SimRobot {
    name: String,
    dofs: usize,
    frames: Vec<(String, [f64; 3])>,
    velocities: Option<Vec<f64>>,
    motors: Vec<String>,
    force_torque: Vec<ForceTorqueEntry>,
    encoders: Vec<(String, usize)>,
}

impl SimRobot {
    pub fn builder(name: impl Into<String>, dofs: usize) -> Self {
        Self {
            name: name.into(),
            dofs,
            frames: Vec::new(),
            velocities: None,
            motors: Vec::new(),
            force_torque: Vec::new(),
            encoders: Vec::new(),
        }
    }

    /// Assemble a robot from a loaded description.
    ///
    /// # Errors
    ///
    /// See [`build`][Self::build].
    pub fn from_description(description: &RobotDescription) -> Result<Robot, ArmatureError> {
        let mut builder = Self::builder(description.name.clone(), description.dofs);
        for frame in &description.frames {
            builder = builder.with_frame(frame.name.clone(), frame.translation);
        }
        if !description.initial_velocities.is_empty() {
            builder = builder.with_initial_velocities(description.initial_velocities.clone());
        }
        for motor in &description.motors {
            builder = builder.with_motor(motor.name.clone());
        }
        for ft in &description.force_torque_sensors {
            builder = builder.with_force_torque_sensor(
                ft.name.clone(),
                ft.frame.clone(),
                ft.reverse_wrench_direction,
                ft.wrench,
            );
        }
        for encoder in &description.joint_encoders {
            builder = builder.with_joint_encoder(encoder.name.clone(), encoder.dof);
        }
        builder.build()
    }

    pub fn with_frame(mut self, name: impl Into<String>, translation: [f64; 3]) -> Self {
        self.frames.push((name.into(), translation));
        self
    }

    pub fn with_initial_velocities(mut self, velocities: Vec<f64>) -> Self {
        self.velocities = Some(velocities);
        self
    }

    pub fn with_motor(mut self, name: impl Into<String>) -> Self {
        self.motors.push(name.into());
        self
    }

    pub fn with_force_torque_sensor(
        mut self,
        name: impl Into<String>,
        frame: impl Into<String>,
        reverse_wrench_direction: bool,
        wrench: [f64; 6],
    ) -> Self {
        self.force_torque.push(ForceTorqueEntry {
            name: name.into(),
            frame: frame.into(),
            reverse: reverse_wrench_direction,
            wrench,
        });
        self
    }

    pub fn with_joint_encoder(mut self, name: impl Into<String>, dof: usize) -> Self {
        self.encoders.push((name.into(), dof));
        self
    }

    /// Build the robot and register every component.
    ///
    /// # Errors
    ///
    /// Propagates registration errors (duplicate names, unknown frames,
    /// encoders outside the model) and velocity dimension mismatches.
    pub fn build(self) -> Result<Robot, ArmatureError> {
        let mut model = SimModel::new(self.dofs);
        for (name, [x, y, z]) in self.frames {
            model = model.with_frame(name, Isometry3::translation(x, y, z));
        }
        if let Some(velocities) = self.velocities {
            model = model.with_velocities(DVector::from_vec(velocities))?;
        }

        let mut robot = Robot::new(self.name, Box::new(model));
        for name in self.motors {
            robot.register_moving_component(SimMotor::new(name))?;
        }
        for ft in self.force_torque {
            let source = SimWrenchSource::constant(Vector6::from_row_slice(&ft.wrench));
            let sensor = ForceTorqueSensor::new(ft.name, ft.frame, ft.reverse, Box::new(source));
            robot.register_state_provider(Box::new(sensor), StateCategory::NonJoint)?;
        }
        for (name, dof) in self.encoders {
            robot.register_state_provider(SimJointEncoder::new(name, dof), StateCategory::Joint)?;
        }
        Ok(robot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_model_consumes_queued_samples_in_order() {
        let mut model = SimModel::new(2);
        let feed = model.feed();
        feed.push(DVector::from_vec(vec![1.0, 2.0]), DVector::from_vec(vec![0.1, 0.2]));
        feed.push(DVector::from_vec(vec![3.0, 4.0]), DVector::from_vec(vec![0.3, 0.4]));

        model.update_joint_states();
        assert_eq!(model.positions().as_slice(), &[1.0, 2.0]);
        model.update_joint_states();
        assert_eq!(model.positions().as_slice(), &[3.0, 4.0]);
        assert_eq!(model.velocities().as_slice(), &[0.3, 0.4]);
        assert_eq!(feed.refreshes(), 2);
    }

    #[test]
    fn sim_model_integrates_without_samples() {
        let mut model = SimModel::new(2)
            .with_velocities(DVector::from_vec(vec![1.0, -2.0]))
            .unwrap()
            .with_time_step(0.5);
        model.update_joint_states();
        model.update_joint_states();
        assert_eq!(model.positions().as_slice(), &[1.0, -2.0]);
    }

    #[test]
    fn sim_model_drops_wrong_sized_sample() {
        let mut model = SimModel::new(2);
        model
            .feed()
            .push(DVector::from_vec(vec![1.0]), DVector::from_vec(vec![1.0]));
        model.update_joint_states();
        assert_eq!(model.positions().as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn sim_model_rejects_wrong_velocity_length() {
        assert!(matches!(
            SimModel::new(3).with_velocities(DVector::zeros(2)),
            Err(ArmatureError::DimensionMismatch { expected: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn wrench_handle_controls_samples() {
        let mut source = SimWrenchSource::constant(Vector6::zeros());
        let handle = source.handle();
        handle.set(Vector6::repeat(2.0));
        assert_eq!(source.read_wrench(), Vector6::repeat(2.0));
        assert_eq!(handle.reads(), 1);
    }

    #[test]
    fn terminated_motor_refuses_commands() {
        let mut motor = SimMotor::new("elbow");
        motor.assign_index(Index(0));
        motor.initialize();
        motor.set_up();
        motor.command_position(1.0).unwrap();
        motor.terminate();
        assert!(matches!(
            motor.command_position(2.0),
            Err(ArmatureError::HardwareFault { .. })
        ));
        assert!((motor.position() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn builder_registers_motors_then_sensors_then_encoders() {
        let robot = SimRobot::builder("arm", 2)
            .with_frame("wrist_link", [0.0, 0.0, 0.4])
            .with_joint_encoder("enc_0", 0)
            .with_force_torque_sensor("wrist_ft", "wrist_link", true, [1.0; 6])
            .with_motor("shoulder")
            .build()
            .unwrap();
        assert_eq!(robot.names(), vec!["shoulder", "wrist_ft", "enc_0"]);
        assert_eq!(
            robot.capabilities(Index(2)).state,
            Some(StateCategory::Joint)
        );
        assert!(!robot.capabilities(Index(2)).lifecycle);
    }

    #[test]
    fn builder_rejects_sensor_on_unknown_frame() {
        let result = SimRobot::builder("arm", 1)
            .with_force_torque_sensor("wrist_ft", "missing_link", false, [0.0; 6])
            .build();
        assert!(matches!(result, Err(ArmatureError::UnknownFrame { .. })));
    }

    #[test]
    fn builder_rejects_encoder_outside_model() {
        let result = SimRobot::builder("arm", 1)
            .with_joint_encoder("enc_5", 5)
            .build();
        assert!(matches!(result, Err(ArmatureError::DimensionMismatch { .. })));
    }

    #[test]
    fn joint_encoder_reads_through_model() {
        let mut robot = SimRobot::builder("arm", 2)
            .with_initial_velocities(vec![0.0, 1.0])
            .with_joint_encoder("enc_1", 1)
            .build()
            .unwrap();
        robot.update_joint_states();
        let (position, velocity) = robot.joint_state("enc_1").unwrap();
        assert!((position - SimModel::DEFAULT_TIME_STEP).abs() < 1e-12);
        assert!((velocity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn force_torque_reads_follow_update_all_states() {
        let mut robot = SimRobot::builder("arm", 1)
            .with_frame("tool", [0.0; 3])
            .with_force_torque_sensor("tool_ft", "tool", true, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .build()
            .unwrap();
        assert_eq!(robot.non_joint_state("tool_ft").unwrap(), DVector::<f64>::zeros(6));
        robot.update_all_states();
        assert_eq!(
            robot.non_joint_state("tool_ft").unwrap().as_slice(),
            &[-1.0, -2.0, -3.0, -4.0, -5.0, -6.0]
        );
        assert_eq!(robot.frame_of("tool_ft").unwrap().name, "tool");
    }
}
