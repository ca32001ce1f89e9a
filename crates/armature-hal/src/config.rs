//! Robot description – reads a TOML file describing the mechanism and its
//! components.
//!
//! ```toml
//! name = "arm"
//! dofs = 2
//! initial_velocities = [0.0, 0.5]
//!
//! [[frames]]
//! name = "wrist_link"
//! translation = [0.0, 0.0, 0.4]
//!
//! [[motors]]
//! name = "shoulder"
//!
//! [[force_torque_sensors]]
//! name = "wrist_ft"
//! frame = "wrist_link"
//! reverse_wrench_direction = true
//!
//! [[joint_encoders]]
//! name = "shoulder_encoder"
//! dof = 0
//! ```

use std::fs;
use std::path::Path;

use armature_types::ArmatureError;
use serde::{Deserialize, Serialize};

/// A named frame and its translation from the model root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDescription {
    pub name: String,
    #[serde(default)]
    pub translation: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorDescription {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceTorqueDescription {
    pub name: String,
    pub frame: String,
    #[serde(default)]
    pub reverse_wrench_direction: bool,
    /// Constant raw wrench produced by the simulated driver.
    #[serde(default)]
    pub wrench: [f64; 6],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointEncoderDescription {
    pub name: String,
    pub dof: usize,
}

/// Full description of a robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotDescription {
    #[serde(default = "default_name")]
    pub name: String,

    /// Degree-of-freedom count of the model.
    #[serde(default)]
    pub dofs: usize,

    /// Constant joint velocities for the simulated model; empty means at rest.
    #[serde(default)]
    pub initial_velocities: Vec<f64>,

    #[serde(default)]
    pub frames: Vec<FrameDescription>,

    #[serde(default)]
    pub motors: Vec<MotorDescription>,

    #[serde(default)]
    pub force_torque_sensors: Vec<ForceTorqueDescription>,

    #[serde(default)]
    pub joint_encoders: Vec<JointEncoderDescription>,
}

fn default_name() -> String {
    "armature".to_string()
}

impl Default for RobotDescription {
    fn default() -> Self {
        Self {
            name: default_name(),
            dofs: 0,
            initial_velocities: Vec::new(),
            frames: Vec::new(),
            motors: Vec::new(),
            force_torque_sensors: Vec::new(),
            joint_encoders: Vec::new(),
        }
    }
}

/// Parse a description from TOML text.
///
/// # Errors
///
/// Returns [`ArmatureError::Config`] when the text is not a valid
/// description.
pub fn parse(raw: &str) -> Result<RobotDescription, ArmatureError> {
    toml::from_str(raw).map_err(|e| ArmatureError::Config(format!("Failed to parse robot description: {e}")))
}

/// Load a description from `path` and apply `ARMATURE_*` overrides.
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns [`ArmatureError::Config`] when the file cannot be read or parsed.
pub fn load_from(path: &Path) -> Result<Option<RobotDescription>, ArmatureError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        ArmatureError::Config(format!("Failed to read robot description at {}: {e}", path.display()))
    })?;
    let mut description = parse(&raw)?;
    apply_env_overrides(&mut description);
    Ok(Some(description))
}

/// Apply `ARMATURE_*` environment variable overrides.
///
/// | Variable | Field |
/// |---|---|
/// | `ARMATURE_ROBOT_NAME` | `name` |
/// | `ARMATURE_DOFS` | `dofs` |
pub fn apply_env_overrides(description: &mut RobotDescription) {
    apply_overrides_from(description, |key| std::env::var(key).ok());
}

/// Extracted for testability without mutating environment variables.
pub(crate) fn apply_overrides_from(
    description: &mut RobotDescription,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("ARMATURE_ROBOT_NAME") {
        description.name = v;
    }
    if let Some(v) = lookup("ARMATURE_DOFS")
        && let Ok(dofs) = v.parse::<usize>()
    {
        description.dofs = dofs;
    }
}
