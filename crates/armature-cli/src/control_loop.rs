//! Fixed-rate control loop driving a [`Robot`] through its full lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use armature_hal::Robot;
use armature_types::StateCategory;
use tracing::info;

/// Observable state after one `update_all_states` call.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub joint_positions: Vec<f64>,
    pub joint_velocities: Vec<f64>,
    /// Non-joint provider values, in registration order.
    pub sensors: Vec<(String, Vec<f64>)>,
}

/// Refresh every state and capture a report.
pub fn run_cycle(robot: &mut Robot, cycle: u64) -> CycleReport {
    robot.update_all_states();
    CycleReport {
        cycle,
        joint_positions: robot.joint_positions().iter().copied().collect(),
        joint_velocities: robot.joint_velocities().iter().copied().collect(),
        sensors: robot
            .state_providers(StateCategory::NonJoint)
            .map(|p| (p.name().to_string(), p.value().iter().copied().collect()))
            .collect(),
    }
}

/// Initialize and set up `robot`, run up to `cycles` update cycles (until
/// `shutdown` is raised when `cycles` is `None`), then terminate.
///
/// Termination runs even when the loop is cut short.  Returns the number of
/// completed cycles.
pub fn run(
    robot: &mut Robot,
    cycles: Option<u64>,
    period: Duration,
    shutdown: &AtomicBool,
    mut on_report: impl FnMut(&CycleReport),
) -> u64 {
    robot.initialize();
    robot.set_up();

    let mut completed = 0u64;
    while cycles.is_none_or(|limit| completed < limit) && !shutdown.load(Ordering::SeqCst) {
        let report = run_cycle(robot, completed);
        on_report(&report);
        completed += 1;
        if !period.is_zero() {
            thread::sleep(period);
        }
    }

    robot.terminate();
    info!(robot = robot.name(), completed, "control loop finished");
    completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_hal::sim::SimRobot;
    use armature_types::LifecycleState;

    fn arm() -> Robot {
        SimRobot::builder("arm", 2)
            .with_frame("wrist_link", [0.0, 0.0, 0.4])
            .with_initial_velocities(vec![1.0, 0.0])
            .with_motor("shoulder")
            .with_force_torque_sensor("wrist_ft", "wrist_link", true, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .with_joint_encoder("shoulder_encoder", 0)
            .build()
            .unwrap()
    }

    #[test]
    fn bounded_run_reports_every_cycle_and_terminates() {
        let mut robot = arm();
        let shutdown = AtomicBool::new(false);
        let mut reports = Vec::new();
        let completed = run(&mut robot, Some(3), Duration::ZERO, &shutdown, |r| {
            reports.push(r.clone())
        });

        assert_eq!(completed, 3);
        assert_eq!(reports.len(), 3);
        assert!(reports[2].joint_positions[0] > reports[0].joint_positions[0]);
        assert_eq!(
            reports[0].sensors,
            vec![(
                "wrist_ft".to_string(),
                vec![-1.0, -2.0, -3.0, -4.0, -5.0, -6.0]
            )]
        );
        assert_eq!(
            robot.component("shoulder").unwrap().lifecycle_state(),
            Some(LifecycleState::Terminated)
        );
    }

    #[test]
    fn raised_shutdown_skips_cycles_but_still_terminates() {
        let mut robot = arm();
        let shutdown = AtomicBool::new(true);
        let completed = run(&mut robot, None, Duration::ZERO, &shutdown, |_| {});
        assert_eq!(completed, 0);
        assert_eq!(
            robot.component("wrist_ft").unwrap().lifecycle_state(),
            Some(LifecycleState::Terminated)
        );
    }
}
