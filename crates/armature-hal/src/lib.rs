//! `armature-hal` – component registry and lifecycle/state-update protocol.
//!
//! Composes a robot out of named motors and sensors bound to one shared
//! kinematic model.  This layer performs no physics and no I/O; it only
//! orders, identifies, and delegates.
//!
//! # Modules
//!
//! - [`component`] – [`Indexable`][component::Indexable],
//!   [`Component`][component::Component] and the optional
//!   [`GenericComponent`][component::GenericComponent] lifecycle.
//! - [`state_provider`] – [`StateProvider`][state_provider::StateProvider]:
//!   components that refresh and report a state vector.
//! - [`moving`] – [`MovingComponent`][moving::MovingComponent] motors and the
//!   ordered [`MovingGroup`][moving::MovingGroup].
//! - [`sensor`] – [`SensorWithFrame`][sensor::SensorWithFrame] and the 6-axis
//!   [`ForceTorqueSensor`][sensor::ForceTorqueSensor].
//! - [`model`] – the [`Model`][model::Model] collaborator and its
//!   [`Frame`][model::Frame]s.
//! - [`robot`] – [`Robot`][robot::Robot]: registry, lifecycle sweeps, and
//!   state updates.
//! - [`config`] – TOML [`RobotDescription`][config::RobotDescription].
//! - [`sim`] – simulated collaborators and the
//!   [`SimRobot`][sim::SimRobot] builder.

pub mod component;
pub mod config;
pub mod model;
pub mod moving;
pub mod robot;
pub mod sensor;
pub mod sim;
pub mod state_provider;

pub use component::{Component, ComponentCore, GenericComponent, Indexable, LifecycleTracker};
pub use model::{Frame, Model};
pub use moving::{MovingComponent, MovingGroup};
pub use robot::{ComponentRef, Robot};
pub use sensor::{ForceTorqueSensor, SensorWithFrame, WrenchSource};
pub use state_provider::StateProvider;
