//! `armature-cli` – runs a simulated robot from a TOML description.
//!
//! 1. Loads the robot description (`--config`, default `robot.toml`); falls
//!    back to a built-in demo arm when the file is absent.
//! 2. Builds a simulated robot and sweeps Initialize / SetUp.
//! 3. Runs the update loop, printing joint state and every sensor value.
//! 4. Intercepts **Ctrl-C** to end the loop; Terminate always runs.

mod control_loop;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use armature_hal::config::{
    self, ForceTorqueDescription, FrameDescription, JointEncoderDescription, MotorDescription,
    RobotDescription,
};
use armature_hal::sim::SimRobot;
use armature_types::ArmatureError;
use clap::Parser;
use colored::Colorize;
use tracing::{error, warn};

use crate::control_loop::CycleReport;

#[derive(Parser, Debug)]
#[command(name = "armature")]
#[command(about = "Drive a simulated robot through its lifecycle and update loop", long_about = None)]
struct Args {
    /// Path to the robot description (TOML)
    #[arg(short, long, default_value = "robot.toml")]
    config: PathBuf,

    /// Number of update cycles to run; runs until Ctrl-C when omitted
    #[arg(short = 'n', long)]
    cycles: Option<u64>,

    /// Delay between update cycles in milliseconds
    #[arg(short, long, default_value_t = 100)]
    period_ms: u64,
}

fn main() -> ExitCode {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the filter (default "info"); ARMATURE_LOG_FORMAT=json
    // switches to newline-delimited JSON.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("ARMATURE_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "armature failed");
            println!("{}: {}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), ArmatureError> {
    let description = match config::load_from(&args.config)? {
        Some(d) => {
            println!("  Robot description loaded from {}", args.config.display().to_string().bold());
            d
        }
        None => {
            println!(
                "  {} not found; using the built-in demo arm.",
                args.config.display().to_string().bold()
            );
            let mut d = demo_description();
            config::apply_env_overrides(&mut d);
            d
        }
    };

    let mut robot = SimRobot::from_description(&description)?;
    println!(
        "  {} {} ({} component(s), {} dof)\n",
        "Robot".bold(),
        robot.name().cyan(),
        robot.len(),
        robot.model().num_dofs()
    );

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – terminating components …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the loop can only end after --cycles");
    }

    let completed = control_loop::run(
        &mut robot,
        args.cycles,
        Duration::from_millis(args.period_ms),
        &shutdown,
        print_report,
    );

    println!("\n  {} {} cycle(s) completed.", "✓".green().bold(), completed);
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!(
        "  [{:>5}] q = {}  dq = {}",
        report.cycle,
        format_vector(&report.joint_positions).bold(),
        format_vector(&report.joint_velocities).dimmed()
    );
    for (name, value) in &report.sensors {
        println!("          {:<16} {}", name.cyan(), format_vector(value));
    }
}

fn format_vector(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:+.3}")).collect();
    format!("[{}]", parts.join(", "))
}

fn demo_description() -> RobotDescription {
    RobotDescription {
        name: "demo_arm".to_string(),
        dofs: 2,
        initial_velocities: vec![0.2, -0.1],
        frames: vec![FrameDescription {
            name: "wrist_link".to_string(),
            translation: [0.0, 0.0, 0.45],
        }],
        motors: vec![
            MotorDescription {
                name: "shoulder".to_string(),
            },
            MotorDescription {
                name: "elbow".to_string(),
            },
        ],
        force_torque_sensors: vec![ForceTorqueDescription {
            name: "wrist_ft".to_string(),
            frame: "wrist_link".to_string(),
            reverse_wrench_direction: true,
            wrench: [0.0, 0.0, 9.81, 0.0, 0.0, 0.0],
        }],
        joint_encoders: vec![
            JointEncoderDescription {
                name: "shoulder_encoder".to_string(),
                dof: 0,
            },
            JointEncoderDescription {
                name: "elbow_encoder".to_string(),
                dof: 1,
            },
        ],
    }
}
