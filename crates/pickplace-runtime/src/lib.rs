//! `pickplace-runtime` – the control loop.
//!
//! Everything that runs once per tick lives here: the pick-and-place state
//! machine, the device-facing rig it drives, and the loop that ties both to
//! the fallen-object detector.
//!
//! # Modules
//!
//! - [`cycle`] – [`CycleController`][cycle::CycleController]: the six-state
//!   cycle (`Waiting → Grasping → Rotating → Releasing → RotatingBack`, plus
//!   the `Avoiding` override).  Pure logic: it reads a
//!   [`SensorReadings`][cycle::SensorReadings] snapshot, polls a
//!   [`FallenObjectMonitor`][pickplace_perception::FallenObjectMonitor], and
//!   emits [`MotionCommand`][pickplace_types::MotionCommand]s.
//! - [`rig`] – [`ArmRig`][rig::ArmRig]: resolves the named arm joints,
//!   fingers and sensors from a
//!   [`DeviceRegistry`][pickplace_hal::DeviceRegistry], performs startup
//!   initialisation, and applies commands index-aligned to the arm joints.
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]: pulls
//!   ticks from a [`TickSource`][control_loop::TickSource], runs
//!   read → decide → act, and keeps a
//!   [`RunSummary`][control_loop::RunSummary].
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.

pub mod control_loop;
pub mod cycle;
pub mod rig;
pub mod telemetry;

pub use control_loop::{ControlLoop, FixedRateTicks, RunSummary, TickSource};
pub use cycle::{AvoidWindow, CycleConfig, CycleController, PhaseTimer, SensorReadings, TickReport};
pub use rig::{ArmRig, RigSetup};
pub use telemetry::{TracerProviderGuard, init_tracing};
