//! [`Robot`] – component registry, lifecycle controller and state-update
//! protocol.
//!
//! The robot exclusively owns one [`Model`] and every registered component.
//! Components live in a single master registry addressed by dense
//! [`Index`] values; three category lists (moving, non-joint providers,
//! joint providers) hold indices into it, each in registration order.
//!
//! # Sweep order
//!
//! [`Robot::initialize`], [`Robot::set_up`] and [`Robot::terminate`] visit
//! moving components first, then non-joint providers, then joint providers.
//! Only components whose lifecycle capability was resolved at registration
//! are visited; everything else is skipped silently.
//!
//! # Update protocol
//!
//! [`Robot::update_all_states`] samples every non-joint provider in
//! registration order and then refreshes the model exactly once.  Joint
//! state is never cached by providers: [`Robot::joint_positions`] and
//! [`Robot::joint_velocities`] borrow the model's storage directly.

use std::collections::HashMap;

use armature_types::{ArmatureError, Capabilities, Index, LifecycleState, StateCategory};
use nalgebra::DVector;
use tracing::{debug, info, trace, warn};

use crate::component::GenericComponent;
use crate::model::{Frame, Model};
use crate::moving::{MovingComponent, MovingGroup};
use crate::state_provider::StateProvider;

// ────────────────────────────────────────────────────────────────────────────
// Registry entries
// ────────────────────────────────────────────────────────────────────────────

enum Slot {
    Moving(Box<dyn MovingComponent>),
    Provider(Box<dyn StateProvider>),
}

impl Slot {
    fn lifecycle_mut(&mut self) -> Option<&mut dyn GenericComponent> {
        match self {
            Slot::Moving(c) => c.as_lifecycle_mut(),
            Slot::Provider(p) => p.as_lifecycle_mut(),
        }
    }
}

struct Entry {
    slot: Slot,
    capabilities: Capabilities,
}

/// Borrowed view of a registered component.
///
/// Valid for as long as the robot is borrowed; it cannot outlive the
/// registry.
#[derive(Clone, Copy)]
pub enum ComponentRef<'a> {
    Moving(&'a dyn MovingComponent),
    StateProvider(&'a dyn StateProvider),
}

impl<'a> ComponentRef<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            ComponentRef::Moving(c) => c.name(),
            ComponentRef::StateProvider(p) => p.name(),
        }
    }

    pub fn index(&self) -> Option<Index> {
        match *self {
            ComponentRef::Moving(c) => c.index(),
            ComponentRef::StateProvider(p) => p.index(),
        }
    }

    /// Lifecycle state, or `None` for components without the lifecycle
    /// capability.
    pub fn lifecycle_state(&self) -> Option<LifecycleState> {
        let lifecycle = match *self {
            ComponentRef::Moving(c) => c.as_lifecycle(),
            ComponentRef::StateProvider(p) => p.as_lifecycle(),
        };
        lifecycle.map(|l| l.lifecycle_state())
    }

    pub fn as_moving(&self) -> Option<&'a dyn MovingComponent> {
        match *self {
            ComponentRef::Moving(c) => Some(c),
            ComponentRef::StateProvider(_) => None,
        }
    }

    pub fn as_state_provider(&self) -> Option<&'a dyn StateProvider> {
        match *self {
            ComponentRef::Moving(_) => None,
            ComponentRef::StateProvider(p) => Some(p),
        }
    }
}

/// Sweeps reach components through `as_lifecycle_mut`, so that accessor
/// decides the capability.
fn lifecycle_capability(name: &str, read_only: bool, mutable: bool) -> bool {
    if read_only != mutable {
        warn!(
            component = name,
            read_only,
            mutable,
            "lifecycle accessors disagree; sweeps follow as_lifecycle_mut"
        );
    }
    mutable
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Initialize,
    SetUp,
    Terminate,
}

impl Phase {
    fn apply(self, component: &mut dyn GenericComponent) {
        match self {
            Phase::Initialize => component.initialize(),
            Phase::SetUp => component.set_up(),
            Phase::Terminate => component.terminate(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Robot
// ────────────────────────────────────────────────────────────────────────────

/// Composition root: one model plus a registry of motors and sensors.
///
/// # Example
///
/// ```rust
/// use armature_hal::robot::Robot;
/// use armature_hal::sensor::ForceTorqueSensor;
/// use armature_hal::sim::{SimModel, SimWrenchSource};
/// use armature_types::{Index, StateCategory};
/// use nalgebra::{Isometry3, Vector6};
///
/// let model = SimModel::new(2).with_frame("wrist_link", Isometry3::identity());
/// let mut robot = Robot::new("arm", Box::new(model));
///
/// let ft = ForceTorqueSensor::new(
///     "wrist_ft",
///     "wrist_link",
///     false,
///     Box::new(SimWrenchSource::constant(Vector6::repeat(1.0))),
/// );
/// let index = robot
///     .register_state_provider(Box::new(ft), StateCategory::NonJoint)
///     .unwrap();
/// assert_eq!(index, Index(0));
///
/// robot.initialize();
/// robot.set_up();
/// robot.update_all_states();
/// assert_eq!(robot.non_joint_state("wrist_ft").unwrap()[0], 1.0);
/// robot.terminate();
/// ```
pub struct Robot {
    name: String,
    model: Box<dyn Model>,
    registry: Vec<Entry>,
    name_to_index: HashMap<String, Index>,
    moving: MovingGroup,
    non_joint: Vec<Index>,
    joint: Vec<Index>,
}

impl Robot {
    /// Create an empty robot that takes exclusive ownership of `model`.
    pub fn new(name: impl Into<String>, model: Box<dyn Model>) -> Self {
        Self {
            name: name.into(),
            model,
            registry: Vec::new(),
            name_to_index: HashMap::new(),
            moving: MovingGroup::new(),
            non_joint: Vec::new(),
            joint: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    // ── Registration ────────────────────────────────────────────────────────

    /// Register a state provider in the given category and return its index.
    ///
    /// # Panics
    ///
    /// Panics when `provider` already carries an index (it was registered
    /// before).
    ///
    /// # Errors
    ///
    /// - [`ArmatureError::DuplicateName`] when a component with the same name
    ///   is already registered.
    /// - [`ArmatureError::UnknownFrame`] when the provider is bound to a frame
    ///   the model does not have.
    /// - [`ArmatureError::DimensionMismatch`] when a joint provider points at
    ///   a degree of freedom outside the model.
    ///
    /// A rejected provider is dropped without receiving an index.
    pub fn register_state_provider(
        &mut self,
        mut provider: Box<dyn StateProvider>,
        category: StateCategory,
    ) -> Result<Index, ArmatureError> {
        assert!(
            !provider.is_registered(),
            "state provider '{}' is already registered at {:?}",
            provider.name(),
            provider.index()
        );
        self.check_name(provider.name())?;
        if let Some(frame) = provider.frame()
            && self.model.frame(frame).is_none()
        {
            return Err(ArmatureError::UnknownFrame {
                component: provider.name().to_string(),
                frame: frame.to_string(),
            });
        }
        if let Some(dof) = provider.joint_dof()
            && dof >= self.model.num_dofs()
        {
            return Err(ArmatureError::DimensionMismatch {
                component: provider.name().to_string(),
                expected: self.model.num_dofs(),
                actual: dof + 1,
            });
        }

        let mutable = provider.as_lifecycle_mut().is_some();
        let capabilities = Capabilities {
            lifecycle: lifecycle_capability(provider.name(), provider.as_lifecycle().is_some(), mutable),
            state: Some(category),
        };
        let index = self.next_index();
        provider.assign_index(index);
        match category {
            StateCategory::Joint => self.joint.push(index),
            StateCategory::NonJoint => self.non_joint.push(index),
        }
        debug!(
            robot = %self.name,
            name = provider.name(),
            %index,
            %category,
            lifecycle = capabilities.lifecycle,
            "registered state provider"
        );
        self.insert(provider.name().to_string(), index, Slot::Provider(provider), capabilities);
        Ok(index)
    }

    /// Append a motor to the moving group and return its index.
    ///
    /// # Panics
    ///
    /// Panics when `component` already carries an index.
    ///
    /// # Errors
    ///
    /// Returns [`ArmatureError::DuplicateName`] when a component with the same
    /// name is already registered.
    pub fn register_moving_component(
        &mut self,
        mut component: Box<dyn MovingComponent>,
    ) -> Result<Index, ArmatureError> {
        assert!(
            !component.is_registered(),
            "moving component '{}' is already registered at {:?}",
            component.name(),
            component.index()
        );
        self.check_name(component.name())?;

        let mutable = component.as_lifecycle_mut().is_some();
        let capabilities = Capabilities {
            lifecycle: lifecycle_capability(component.name(), component.as_lifecycle().is_some(), mutable),
            state: None,
        };
        let index = self.next_index();
        component.assign_index(index);
        self.moving.push(index);
        debug!(
            robot = %self.name,
            name = component.name(),
            %index,
            lifecycle = capabilities.lifecycle,
            "registered moving component"
        );
        self.insert(component.name().to_string(), index, Slot::Moving(component), capabilities);
        Ok(index)
    }

    fn check_name(&self, name: &str) -> Result<(), ArmatureError> {
        match self.name_to_index.get(name) {
            Some(&existing) => Err(ArmatureError::DuplicateName {
                name: name.to_string(),
                existing,
            }),
            None => Ok(()),
        }
    }

    fn next_index(&self) -> Index {
        Index(self.registry.len())
    }

    fn insert(&mut self, name: String, index: Index, slot: Slot, capabilities: Capabilities) {
        self.registry.push(Entry { slot, capabilities });
        self.name_to_index.insert(name, index);
    }

    // ── Lifecycle sweeps ────────────────────────────────────────────────────

    pub fn initialize(&mut self) {
        self.sweep(Phase::Initialize);
    }

    pub fn set_up(&mut self) {
        self.sweep(Phase::SetUp);
    }

    pub fn terminate(&mut self) {
        self.sweep(Phase::Terminate);
    }

    fn sweep(&mut self, phase: Phase) {
        let order = self
            .moving
            .indices()
            .iter()
            .chain(&self.non_joint)
            .chain(&self.joint);
        let mut visited = 0usize;
        for &index in order {
            let entry = &mut self.registry[index.get()];
            if !entry.capabilities.lifecycle {
                continue;
            }
            if let Some(component) = entry.slot.lifecycle_mut() {
                phase.apply(component);
                visited += 1;
            }
        }
        info!(robot = %self.name, ?phase, visited, "lifecycle sweep complete");
    }

    // ── State updates ───────────────────────────────────────────────────────

    /// Sample every non-joint provider in registration order, then refresh
    /// joint state from the model once.
    pub fn update_all_states(&mut self) {
        for &index in &self.non_joint {
            if let Slot::Provider(provider) = &mut self.registry[index.get()].slot {
                trace!(name = provider.name(), %index, "requesting state update");
                provider.request_state_update();
            }
        }
        self.model.update_joint_states();
    }

    /// Refresh joint state from the model without touching sensors.
    pub fn update_joint_states(&mut self) {
        self.model.update_joint_states();
    }

    pub fn joint_positions(&self) -> &DVector<f64> {
        self.model.positions()
    }

    pub fn joint_velocities(&self) -> &DVector<f64> {
        self.model.velocities()
    }

    // ── Lookup ──────────────────────────────────────────────────────────────

    /// Look up a component by name.
    ///
    /// # Errors
    ///
    /// Returns [`ArmatureError::UnknownComponent`] when no component has that
    /// name.
    pub fn component(&self, name: &str) -> Result<ComponentRef<'_>, ArmatureError> {
        self.name_to_index
            .get(name)
            .map(|&index| self.component_at(index))
            .ok_or_else(|| ArmatureError::UnknownComponent(name.to_string()))
    }

    /// Look up a component by index.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of range.
    pub fn component_at(&self, index: Index) -> ComponentRef<'_> {
        match &self.registry[index.get()].slot {
            Slot::Moving(c) => ComponentRef::Moving(&**c),
            Slot::Provider(p) => ComponentRef::StateProvider(&**p),
        }
    }

    /// Mutable access to a motor by name.
    ///
    /// # Errors
    ///
    /// Returns [`ArmatureError::UnknownComponent`] when no moving component
    /// has that name.
    pub fn moving_component_mut(
        &mut self,
        name: &str,
    ) -> Result<&mut dyn MovingComponent, ArmatureError> {
        let index = self
            .name_to_index
            .get(name)
            .copied()
            .ok_or_else(|| ArmatureError::UnknownComponent(name.to_string()))?;
        match &mut self.registry[index.get()].slot {
            Slot::Moving(c) => Ok(&mut **c),
            Slot::Provider(_) => Err(ArmatureError::UnknownComponent(name.to_string())),
        }
    }

    /// The capabilities resolved when `index` was registered.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of range.
    pub fn capabilities(&self, index: Index) -> Capabilities {
        self.registry[index.get()].capabilities
    }

    /// The cached value of a non-joint provider.
    ///
    /// # Errors
    ///
    /// Returns [`ArmatureError::UnknownComponent`] when `name` is not a
    /// registered non-joint provider.
    pub fn non_joint_state(&self, name: &str) -> Result<DVector<f64>, ArmatureError> {
        let index = self
            .name_to_index
            .get(name)
            .copied()
            .filter(|index| self.non_joint.contains(index))
            .ok_or_else(|| ArmatureError::UnknownComponent(name.to_string()))?;
        match &self.registry[index.get()].slot {
            Slot::Provider(p) => Ok(p.value()),
            Slot::Moving(_) => Err(ArmatureError::UnknownComponent(name.to_string())),
        }
    }

    /// Position and velocity of the degree of freedom behind a joint provider,
    /// read from the model.
    ///
    /// # Errors
    ///
    /// Returns [`ArmatureError::UnknownComponent`] when `name` is not a
    /// registered joint provider.
    pub fn joint_state(&self, name: &str) -> Result<(f64, f64), ArmatureError> {
        let index = self
            .name_to_index
            .get(name)
            .copied()
            .filter(|index| self.joint.contains(index))
            .ok_or_else(|| ArmatureError::UnknownComponent(name.to_string()))?;
        let dof = self
            .component_at(index)
            .as_state_provider()
            .and_then(|p| p.joint_dof())
            .ok_or_else(|| ArmatureError::UnknownComponent(name.to_string()))?;
        Ok((self.model.positions()[dof], self.model.velocities()[dof]))
    }

    /// The model frame a provider is bound to.
    ///
    /// # Errors
    ///
    /// - [`ArmatureError::UnknownComponent`] when `name` is not registered or
    ///   has no frame.
    /// - [`ArmatureError::UnknownFrame`] when the model no longer knows the
    ///   frame.
    pub fn frame_of(&self, name: &str) -> Result<&Frame, ArmatureError> {
        let frame = self
            .component(name)?
            .as_state_provider()
            .and_then(|p| p.frame())
            .ok_or_else(|| ArmatureError::UnknownComponent(name.to_string()))?;
        self.model
            .frame(frame)
            .ok_or_else(|| ArmatureError::UnknownFrame {
                component: name.to_string(),
                frame: frame.to_string(),
            })
    }

    /// Providers of one category, in registration order.
    pub fn state_providers(
        &self,
        category: StateCategory,
    ) -> impl Iterator<Item = &dyn StateProvider> + '_ {
        let list = match category {
            StateCategory::Joint => &self.joint,
            StateCategory::NonJoint => &self.non_joint,
        };
        list.iter().filter_map(move |&index| match &self.registry[index.get()].slot {
            Slot::Provider(p) => Some(&**p),
            Slot::Moving(_) => None,
        })
    }

    /// Moving components, in registration order.
    pub fn moving_components(&self) -> impl Iterator<Item = &dyn MovingComponent> + '_ {
        self.moving
            .indices()
            .iter()
            .filter_map(move |&index| match &self.registry[index.get()].slot {
                Slot::Moving(c) => Some(&**c),
                Slot::Provider(_) => None,
            })
    }

    /// Component names in index order.
    pub fn names(&self) -> Vec<&str> {
        (0..self.registry.len())
            .map(|i| self.component_at(Index(i)).name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
