//! Sensors whose measurements are expressed in a named model frame.
//!
//! [`SensorWithFrame`] is the shared building block: a component core, a
//! fixed state shape, the cached sample, and the name of the frame the sample
//! is expressed in.  The frame itself stays owned by the
//! [`Model`]; the sensor resolves it on demand.
//!
//! [`ForceTorqueSensor`] is the concrete 6-axis wrench sensor.  Raw samples
//! are stored unmodified; the sign convention is applied at read time.
//!
//! # Example
//!
//! ```rust
//! use armature_hal::sensor::ForceTorqueSensor;
//! use armature_hal::sim::SimWrenchSource;
//! use armature_hal::state_provider::StateProvider;
//! use nalgebra::Vector6;
//!
//! let source = SimWrenchSource::constant(Vector6::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
//! let mut ft = ForceTorqueSensor::new("wrist_ft", "wrist_link", true, Box::new(source));
//! ft.request_state_update();
//! assert_eq!(ft.value()[0], -1.0);
//! ```

use armature_types::{ArmatureError, Index, LifecycleState};
use nalgebra::{DVector, Isometry3, Vector3, Vector6};
use tracing::trace;

use crate::component::{Component, ComponentCore, GenericComponent, Indexable};
use crate::model::Model;
use crate::state_provider::StateProvider;

// ────────────────────────────────────────────────────────────────────────────
// SensorWithFrame
// ────────────────────────────────────────────────────────────────────────────

/// Cached, fixed-shape sensor state bound to a model frame.
#[derive(Debug, Clone)]
pub struct SensorWithFrame {
    core: ComponentCore,
    rows: usize,
    cols: usize,
    frame: String,
    state: DVector<f64>,
}

impl SensorWithFrame {
    /// Create a sensor with a zeroed `rows × cols` state.
    pub fn new(name: impl Into<String>, rows: usize, cols: usize, frame: impl Into<String>) -> Self {
        Self {
            core: ComponentCore::new(name),
            rows,
            cols,
            frame: frame.into(),
            state: DVector::zeros(rows * cols),
        }
    }

    pub fn core(&self) -> &ComponentCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    pub fn frame_name(&self) -> &str {
        &self.frame
    }

    pub fn dimension(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// The raw cached sample.
    pub fn cached(&self) -> &DVector<f64> {
        &self.state
    }

    /// Replace the cached sample.
    ///
    /// # Errors
    ///
    /// Returns [`ArmatureError::DimensionMismatch`] when `sample` does not
    /// have `rows * cols` elements.
    pub fn store(&mut self, sample: &[f64]) -> Result<(), ArmatureError> {
        if sample.len() != self.state.len() {
            return Err(ArmatureError::DimensionMismatch {
                component: self.core.name().to_string(),
                expected: self.state.len(),
                actual: sample.len(),
            });
        }
        self.state.copy_from_slice(sample);
        Ok(())
    }

    pub(crate) fn store_wrench(&mut self, wrench: &Vector6<f64>) {
        self.state = DVector::from_column_slice(wrench.as_slice());
    }

    /// Resolve the bound frame's pose through `model`.
    ///
    /// # Errors
    ///
    /// Returns [`ArmatureError::UnknownFrame`] when the model has no frame
    /// with this sensor's frame name.
    pub fn frame_pose(&self, model: &dyn Model) -> Result<Isometry3<f64>, ArmatureError> {
        model
            .frame(&self.frame)
            .map(|f| f.pose)
            .ok_or_else(|| ArmatureError::UnknownFrame {
                component: self.core.name().to_string(),
                frame: self.frame.clone(),
            })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ForceTorqueSensor
// ────────────────────────────────────────────────────────────────────────────

/// Driver side of a force/torque sensor: produces raw wrenches
/// `[Fx, Fy, Fz, Tx, Ty, Tz]`.
pub trait WrenchSource: Send {
    fn read_wrench(&mut self) -> Vector6<f64>;

    /// Called when the owning sensor becomes active.
    fn start(&mut self) {}

    /// Called when the owning sensor terminates.
    fn stop(&mut self) {}
}

/// 6-axis force/torque sensor expressed in one named frame.
pub struct ForceTorqueSensor {
    base: SensorWithFrame,
    reverse_wrench_direction: bool,
    source: Box<dyn WrenchSource>,
}

impl ForceTorqueSensor {
    pub const WRENCH_DIM: usize = 6;

    pub fn new(
        name: impl Into<String>,
        frame: impl Into<String>,
        reverse_wrench_direction: bool,
        source: Box<dyn WrenchSource>,
    ) -> Self {
        Self {
            base: SensorWithFrame::new(name, Self::WRENCH_DIM, 1, frame),
            reverse_wrench_direction,
            source,
        }
    }

    pub fn reverse_wrench_direction(&self) -> bool {
        self.reverse_wrench_direction
    }

    /// Change the sign convention.  Applies to every subsequent read,
    /// including reads of the sample already cached.
    pub fn set_reverse_wrench_direction(&mut self, reverse: bool) {
        self.reverse_wrench_direction = reverse;
    }

    /// The stored sample before the sign convention is applied.
    pub fn raw_wrench(&self) -> &DVector<f64> {
        self.base.cached()
    }

    pub fn force(&self) -> Vector3<f64> {
        self.value().fixed_rows::<3>(0).into_owned()
    }

    pub fn torque(&self) -> Vector3<f64> {
        self.value().fixed_rows::<3>(3).into_owned()
    }

    pub fn sensor(&self) -> &SensorWithFrame {
        &self.base
    }
}

impl Indexable for ForceTorqueSensor {
    fn index(&self) -> Option<Index> {
        self.base.core().index()
    }

    fn assign_index(&mut self, index: Index) {
        self.base.core_mut().assign_index(index);
    }
}

impl Component for ForceTorqueSensor {
    fn name(&self) -> &str {
        self.base.core().name()
    }

    fn as_lifecycle(&self) -> Option<&dyn GenericComponent> {
        Some(self)
    }

    fn as_lifecycle_mut(&mut self) -> Option<&mut dyn GenericComponent> {
        Some(self)
    }
}

impl GenericComponent for ForceTorqueSensor {
    fn initialize(&mut self) {
        self.base.core_mut().advance(LifecycleState::Initialized);
    }

    fn set_up(&mut self) {
        if self.base.core_mut().advance(LifecycleState::Active) {
            self.source.start();
        }
    }

    fn terminate(&mut self) {
        if self.base.core_mut().advance(LifecycleState::Terminated) {
            self.source.stop();
        }
    }

    fn lifecycle_state(&self) -> LifecycleState {
        self.base.core().lifecycle_state()
    }
}

impl StateProvider for ForceTorqueSensor {
    fn dimension(&self) -> (usize, usize) {
        self.base.dimension()
    }

    fn frame(&self) -> Option<&str> {
        Some(self.base.frame_name())
    }

    fn request_state_update(&mut self) {
        let wrench = self.source.read_wrench();
        trace!(sensor = self.name(), ?wrench, "captured raw wrench");
        self.base.store_wrench(&wrench);
    }

    fn value(&self) -> DVector<f64> {
        let wrench = self.base.cached().clone();
        if self.reverse_wrench_direction {
            -wrench
        } else {
            wrench
        }
    }
}
