//! `pickplace-cli` – runs the pick-and-place controller on the simulated cell.
//!
//! 1. Installs tracing (see [`pickplace_runtime::telemetry`]).
//! 2. Loads `pickplace.toml` (or defaults) and applies `PICKPLACE_*`
//!    overrides; an optional first argument overrides the arm velocity.
//! 3. Builds the rig and the fallen-object detector from the simulated
//!    device registry.
//! 4. Runs the control loop until the tick limit or Ctrl-C, then prints the
//!    run summary as JSON.
//!
//! `pickplace --init-config` writes the default configuration and exits.

mod config;
mod scenario;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use pickplace_perception::FallenObjectDetector;
use pickplace_runtime::{ArmRig, ControlLoop, CycleController, FixedRateTicks, RigSetup};

use crate::scenario::SimConveyor;

fn main() {
    let _guard = pickplace_runtime::init_tracing("pickplace");

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("--init-config") {
        write_default_config();
        return;
    }

    print_banner();

    let mut cfg = load_config();
    match (args.first(), config::parse_velocity(args.first().map(String::as_str))) {
        (_, Some(v)) => cfg.velocity = v,
        (Some(raw), None) => {
            warn!(arg = %raw, velocity = cfg.velocity, "velocity argument is not a number; using configured velocity");
        }
        (None, None) => {}
    }
    println!(
        "  Robot {}  velocity {}  tick {} ms",
        cfg.robot_name.bold(),
        cfg.velocity,
        cfg.tick_period_ms
    );

    // ── Shutdown flag ─────────────────────────────────────────────────────
    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping after this tick …".yellow().bold());
        stop_handler.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the run ends only at the tick limit");
    }

    // ── Devices ───────────────────────────────────────────────────────────
    let (mut registry, world) = scenario::build_cell(&cfg.scenario);
    let rig = ArmRig::from_registry(
        &mut registry,
        RigSetup {
            arm_velocity: cfg.velocity,
            gripper_open: cfg.cycle.gripper_min_position,
            period_ms: cfg.tick_period_ms,
        },
    );
    let detector = FallenObjectDetector::from_registry(
        &cfg.robot_name,
        &mut registry,
        cfg.detector.clone(),
        cfg.tick_period_ms,
    );
    let unused = registry.unclaimed();
    if !unused.is_empty() {
        info!(devices = ?unused, "devices not used by this robot");
    }

    // ── Run ───────────────────────────────────────────────────────────────
    let mut ticks = FixedRateTicks::from_millis(cfg.tick_period_ms).with_stop_flag(stop);
    if cfg.max_ticks > 0 {
        ticks = ticks.with_limit(cfg.max_ticks);
    }
    let mut conveyor = SimConveyor::new(ticks, world, cfg.scenario.clone());
    let mut control = ControlLoop::new(rig, CycleController::new(cfg.cycle.clone()), detector);
    let summary = control.run(&mut conveyor);

    println!();
    println!("{}", "  Run summary".bold().cyan());
    match serde_json::to_string_pretty(summary) {
        Ok(json) => println!("{json}"),
        Err(e) => println!("{}: {}", "Could not serialise summary".red(), e),
    }
}

fn load_config() -> config::Config {
    let path = config::config_path();
    match config::load_from(&path) {
        Ok(Some(cfg)) => {
            println!("  Config loaded from {}", path.display().to_string().bold());
            cfg
        }
        Ok(None) => {
            println!("  No config at {}; using defaults.", path.display().to_string().dimmed());
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

fn write_default_config() {
    let path = config::config_path();
    match config::save_to(&config::Config::default(), &path) {
        Ok(()) => println!(
            "  {} Default config written to {}",
            "✓".green().bold(),
            path.display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "pickplace".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!(
        "  Conveyor pick-and-place controller  {}",
        chrono::Local::now().format("%H:%M:%S").to_string().dimmed()
    );
    println!();
}
