//! `trajex-cli` – Trajectory Execution Command Line Interface
//!
//! Runs a goal file against the simulated arm and reports how it ended.
//!
//! 1. Loads `~/.trajex/config.toml` (defaults when absent) plus `TRAJEX_*`
//!    overrides, and builds the frame graph from its static transforms.
//! 2. `trajex run <goal.json>` executes a pose goal (`--joint` for a pose +
//!    finger goal), printing one line of feedback per tick.
//! 3. Intercepts **Ctrl-C** to fire the process shutdown token; the running
//!    goal is preempted at its next tick and the arm restarted.
//! 4. `trajex schema` prints the goal file JSON schema; `trajex init` writes a
//!    default config.

mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use trajex_hal::{SharedArm, SimArm};
use trajex_runtime::{GoalHandle, TrajectoryExecutor, init_tracing};
use trajex_types::{
    CartesianWaypoint, ExecutionOutcome, Feedback, Goal, GoalResult, JointTrajectoryPoint,
    TrajError, TrajectoryPoint,
};

#[derive(Parser)]
#[command(name = "trajex")]
#[command(about = "Execute Cartesian arm trajectories and report their outcome")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a goal file against the simulated arm
    Run {
        /// Path to the goal JSON file
        goal: PathBuf,
        /// Treat the goal as pose + finger waypoints
        #[arg(long)]
        joint: bool,
    },
    /// Print the JSON schema of a goal file
    Schema {
        /// Schema for pose + finger goals
        #[arg(long)]
        joint: bool,
    },
    /// Write a default config to ~/.trajex/config.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Schema { joint } => print_schema(joint),
        Commands::Init { force } => init_config(force),
        Commands::Run { goal, joint } => {
            // ── Structured logging ────────────────────────────────────────
            // RUST_LOG filters, TRAJEX_LOG_FORMAT=json switches to JSON lines,
            // OTEL_EXPORTER_OTLP_ENDPOINT enables span export.
            let guard = init_tracing("trajex");
            if guard.is_exporting() {
                info!("exporting spans to the OTLP collector");
            }
            match run(&goal, joint) {
                Ok(result) => report(&result),
                Err(e) => {
                    eprintln!("{}: {e}", "error".red().bold());
                    ExitCode::FAILURE
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// run
// ─────────────────────────────────────────────────────────────────────────────

fn run(goal_path: &Path, joint: bool) -> Result<GoalResult, TrajError> {
    let cfg = config::load()?;
    let exec_cfg = cfg.executor_config()?;
    let tf = Arc::new(cfg.frame_graph());

    // ── Shutdown token ────────────────────────────────────────────────────
    let shutdown = CancellationToken::new();
    let on_ctrlc = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", "⚠  Ctrl-C received – preempting the running goal …".yellow().bold());
        on_ctrlc.cancel();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; Ctrl-C will not preempt the goal");
    }

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| TrajError::Config(format!("failed to start tokio runtime: {e}")))?;

    info!(
        goal = %goal_path.display(),
        joint,
        poll_interval_ms = exec_cfg.poll_interval.as_millis() as u64,
        base_frame = %exec_cfg.base_frame,
        "running goal against simulated arm"
    );

    let arm = if joint { SimArm::with_hand() } else { SimArm::new() };
    let arm = SharedArm::new(Arc::new(arm));

    runtime.block_on(async {
        if joint {
            let goal: Goal<JointTrajectoryPoint> = read_goal(goal_path).await?;
            let exec = TrajectoryExecutor::new(arm, tf, exec_cfg, shutdown);
            Ok(execute_with_feedback(&exec, &goal, cfg.feedback_log.as_deref()).await)
        } else {
            let goal: Goal<CartesianWaypoint> = read_goal(goal_path).await?;
            let exec = TrajectoryExecutor::new(arm, tf, exec_cfg, shutdown);
            Ok::<_, TrajError>(execute_with_feedback(&exec, &goal, cfg.feedback_log.as_deref()).await)
        }
    })
}

async fn read_goal<T: DeserializeOwned>(path: &Path) -> Result<T, TrajError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TrajError::Config(format!("failed to read goal {}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| TrajError::Config(format!("failed to parse goal {}: {e}", path.display())))
}

async fn execute_with_feedback<P: TrajectoryPoint>(
    exec: &TrajectoryExecutor<P>,
    goal: &Goal<P>,
    feedback_log: Option<&Path>,
) -> GoalResult {
    println!(
        "  Goal {} – {} waypoint(s)",
        goal.id.to_string().bold(),
        goal.len()
    );

    let (handle, feedback) = GoalHandle::new();
    let printer = tokio::spawn(print_feedback(feedback, feedback_log.map(Path::to_path_buf)));

    let result = exec.execute(goal, &handle).await;

    // Dropping the last sender ends the printer once it has drained.
    drop(handle);
    if let Err(e) = printer.await {
        warn!(error = %e, "feedback printer task failed");
    }
    result
}

async fn print_feedback(mut rx: UnboundedReceiver<Feedback>, log_path: Option<PathBuf>) {
    let mut log = match log_path {
        Some(path) => match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
        {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open feedback log");
                None
            }
        },
        None => None,
    };

    while let Some(fb) = rx.recv().await {
        let p = &fb.pose.pose.position;
        println!(
            "  {} tick {:>4}  x={:+.3} y={:+.3} z={:+.3}  [{}]",
            "·".dimmed(),
            fb.tick,
            p.x,
            p.y,
            p.z,
            fb.pose.frame_id.dimmed()
        );
        if let Some(file) = log.as_mut() {
            match serde_json::to_string(&fb) {
                Ok(mut line) => {
                    line.push('\n');
                    if let Err(e) = file.write_all(line.as_bytes()).await {
                        warn!(error = %e, "feedback log write failed; disabling log");
                        log = None;
                    }
                }
                Err(e) => warn!(error = %e, "feedback not serialisable"),
            }
        }
    }

    if let Some(mut file) = log {
        let _ = file.flush().await;
    }
}

fn report(result: &GoalResult) -> ExitCode {
    let outcome = result.outcome.to_string();
    let (label, code) = match result.outcome {
        ExecutionOutcome::Succeeded => (outcome.green().bold(), ExitCode::SUCCESS),
        ExecutionOutcome::Preempted => (outcome.yellow().bold(), ExitCode::from(130)),
        ExecutionOutcome::Aborted => (outcome.red().bold(), ExitCode::FAILURE),
    };

    println!();
    println!(
        "  {label} after {} tick(s), {} waypoint(s) dispatched",
        result.ticks, result.dispatched
    );
    match &result.pose {
        Some(pose) => {
            let p = &pose.pose.position;
            println!(
                "  Final pose: x={:+.3} y={:+.3} z={:+.3} [{}]",
                p.x, p.y, p.z, pose.frame_id
            );
        }
        None => println!("  Final pose: {}", "unavailable".dimmed()),
    }
    if let Some(reason) = &result.reason {
        println!("  Reason: {reason}");
    }
    code
}

// ─────────────────────────────────────────────────────────────────────────────
// schema / init
// ─────────────────────────────────────────────────────────────────────────────

fn print_schema(joint: bool) -> ExitCode {
    let schema = if joint {
        schemars::schema_for!(Goal<JointTrajectoryPoint>)
    } else {
        schemars::schema_for!(Goal<CartesianWaypoint>)
    };
    match serde_json::to_string_pretty(&schema) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn init_config(force: bool) -> ExitCode {
    let path = config::config_path();
    if path.exists() && !force {
        println!(
            "  Config already exists at {} (use {} to overwrite)",
            path.display().to_string().bold(),
            "--force".bold()
        );
        return ExitCode::SUCCESS;
    }
    match config::save(&config::Config::default()) {
        Ok(path) => {
            println!(
                "  {} Config saved to {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {e}", "Error saving config".red());
            ExitCode::FAILURE
        }
    }
}
