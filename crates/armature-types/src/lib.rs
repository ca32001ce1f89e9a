use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dense position of a component inside a robot's registry.
///
/// Assigned exactly once at registration, starting at 0 and increasing by one
/// for every registered component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index(pub usize);

impl Index {
    pub fn get(self) -> usize {
        self.0
    }
}

impl From<usize> for Index {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a state provider's data lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateCategory {
    /// Data is delegated entirely to the shared model (joint encoders).
    Joint,
    /// Data is sampled from an external sensor and cached locally.
    NonJoint,
}

impl fmt::Display for StateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateCategory::Joint => write!(f, "joint"),
            StateCategory::NonJoint => write!(f, "non_joint"),
        }
    }
}

/// Per-component lifecycle.  Transitions only move forward;
/// [`LifecycleState::Terminated`] is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Constructed,
    Registered,
    Initialized,
    Active,
    Terminated,
}

/// Capabilities resolved once when a component enters the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// Exposes the Initialize / SetUp / Terminate lifecycle.
    pub lifecycle: bool,
    /// Produces a state vector; `None` for moving components.
    pub state: Option<StateCategory>,
}

/// Global error type for registry lookups, configuration, and driver faults.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArmatureError {
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("Duplicate component name '{name}' (already registered at {existing})")]
    DuplicateName { name: String, existing: Index },

    #[error("Component {component} references unknown frame '{frame}'")]
    UnknownFrame { component: String, frame: String },

    #[error("Dimension mismatch on {component}: expected {expected}, got {actual}")]
    DimensionMismatch {
        component: String,
        expected: usize,
        actual: usize,
    },

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Configuration Error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_serializes_as_plain_integer() {
        let json = serde_json::to_string(&Index(3)).unwrap();
        assert_eq!(json, "3");
        let back: Index = serde_json::from_str("7").unwrap();
        assert_eq!(back, Index(7));
        assert_eq!(back.to_string(), "#7");
    }

    #[test]
    fn state_category_uses_snake_case() {
        let json = serde_json::to_string(&StateCategory::NonJoint).unwrap();
        assert_eq!(json, "\"non_joint\"");
        assert_eq!(StateCategory::Joint.to_string(), "joint");
    }

    #[test]
    fn lifecycle_states_are_ordered_forward() {
        assert!(LifecycleState::Constructed < LifecycleState::Registered);
        assert!(LifecycleState::Registered < LifecycleState::Initialized);
        assert!(LifecycleState::Initialized < LifecycleState::Active);
        assert!(LifecycleState::Active < LifecycleState::Terminated);
        assert_eq!(LifecycleState::default(), LifecycleState::Constructed);
    }

    #[test]
    fn armature_error_display() {
        let err = ArmatureError::DuplicateName {
            name: "wrist_ft".to_string(),
            existing: Index(2),
        };
        let msg = err.to_string();
        assert!(msg.contains("wrist_ft"));
        assert!(msg.contains("#2"));

        let err = ArmatureError::DimensionMismatch {
            component: "wrist_ft".to_string(),
            expected: 6,
            actual: 3,
        };
        assert!(err.to_string().contains("expected 6, got 3"));
    }
}
