//! [`CycleController`] – the pick-and-place state machine.
//!
//! The controller owns the [`CycleState`] and turns sensor readings plus
//! fallen-object events into [`MotionCommand`]s.  It receives no feedback
//! from the actuators: phases advance on sensor thresholds, on the
//! [`PhaseTimer`], or on elapsed time.
//!
//! # Transition table
//!
//! | State | Exit condition | Actions on exit |
//! |---|---|---|
//! | `Waiting` | distance < `proximity_threshold` | timer = `phase_ticks`, close gripper |
//! | `Grasping` | timer expired | arm → `carry_targets` |
//! | `Rotating` | wrist < `rotation_done_below` | timer = `phase_ticks`, open gripper |
//! | `Releasing` | timer expired | arm → `home_targets` |
//! | `RotatingBack` | wrist > `return_done_above` | – |
//! | `Avoiding` | window elapsed | arm → `home_targets`, detector reset |
//!
//! Everything in the table is gated on the timer having run out.
//!
//! # Fallen-object override
//!
//! While `Waiting`, the detector is polled whenever more than
//! `camera_poll_interval` has passed since the previous poll.  That check runs
//! before the timer gate, so an event is acted on in the same tick it fires:
//! the arm is sent to `avoid_targets` and the state becomes `Avoiding` for
//! `avoid_duration`.

use pickplace_perception::FallenObjectMonitor;
use pickplace_types::{CycleState, MotionCommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Thresholds, poses, and timings for the cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Distance reading below which an object is in the gripper.
    pub proximity_threshold: f64,
    /// Finger position that closes the gripper on the object.
    pub grip_position: f64,
    /// Finger position for the open gripper.
    pub gripper_min_position: f64,
    /// Ticks the timer is armed for after closing or opening the gripper.
    pub phase_ticks: i32,
    /// Arm pose at the drop point.
    pub carry_targets: Vec<f64>,
    /// Arm pose clear of the belt.
    pub avoid_targets: Vec<f64>,
    /// Arm pose at the pick position.
    pub home_targets: Vec<f64>,
    /// Wrist reading below which the arm has reached the drop point.
    pub rotation_done_below: f64,
    /// Wrist reading above which the arm is back at the pick position.
    pub return_done_above: f64,
    /// Minimum time between detector polls while waiting.
    pub camera_poll_interval: f64,
    /// How long the arm stays clear after a fallen object is seen.
    pub avoid_duration: f64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: 500.0,
            grip_position: 0.85,
            gripper_min_position: 0.0495,
            phase_ticks: 8,
            carry_targets: vec![-1.88, -2.14, -2.38, -1.51],
            avoid_targets: vec![2.0, -1.0, -1.0, -1.0],
            home_targets: vec![0.0; 4],
            rotation_done_below: -2.3,
            return_done_above: -0.1,
            camera_poll_interval: 2.0,
            avoid_duration: 7.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Supporting types
// ─────────────────────────────────────────────────────────────────────────────

/// Sensor snapshot for one tick.  `None` means the sensor is not bound or
/// could not be read this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReadings {
    pub distance: Option<f64>,
    pub wrist_position: Option<f64>,
}

/// Decrementing tick counter gating phase actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimer {
    counter: i32,
}

impl PhaseTimer {
    pub fn arm(&mut self, ticks: i32) {
        self.counter = ticks;
    }

    pub fn tick(&mut self) {
        self.counter = self.counter.saturating_sub(1);
    }

    /// `true` once the counter has run down to zero or below.
    pub fn expired(&self) -> bool {
        self.counter <= 0
    }

    pub fn remaining(&self) -> i32 {
        self.counter
    }
}

/// Interval during which the arm is held clear of the belt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvoidWindow {
    pub start: f64,
    pub duration: f64,
}

impl AvoidWindow {
    pub fn elapsed(&self, now: f64) -> bool {
        now - self.start > self.duration
    }
}

/// Everything one call to [`CycleController::tick`] produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Commands for the rig, in the order they must be applied.
    pub commands: Vec<MotionCommand>,
    /// State changes made during the tick, oldest first.
    pub transitions: Vec<(CycleState, CycleState)>,
}

// ─────────────────────────────────────────────────────────────────────────────
// CycleController
// ─────────────────────────────────────────────────────────────────────────────

/// The six-state pick-and-place controller.
#[derive(Debug, Clone)]
pub struct CycleController {
    config: CycleConfig,
    state: CycleState,
    timer: PhaseTimer,
    last_camera_check: f64,
    avoid: Option<AvoidWindow>,
}

impl CycleController {
    /// Controller in `Waiting` with an expired timer.  The detector is
    /// polled on the first tick.
    pub fn new(config: CycleConfig) -> Self {
        Self {
            config,
            state: CycleState::Waiting,
            timer: PhaseTimer::default(),
            last_camera_check: f64::NEG_INFINITY,
            avoid: None,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn timer(&self) -> PhaseTimer {
        self.timer
    }

    /// Active avoidance window, only while `Avoiding`.
    pub fn avoid_window(&self) -> Option<AvoidWindow> {
        self.avoid
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Advance the cycle by one control tick at time `now`.
    pub fn tick(
        &mut self,
        sensors: &SensorReadings,
        monitor: &mut dyn FallenObjectMonitor,
        now: f64,
    ) -> TickReport {
        let mut report = TickReport::default();
        self.timer.tick();

        if self.state == CycleState::Waiting
            && now - self.last_camera_check > self.config.camera_poll_interval
        {
            if monitor.poll(now) {
                info!(now, "fallen object reported; moving clear of the belt");
                self.avoid = Some(AvoidWindow {
                    start: now,
                    duration: self.config.avoid_duration,
                });
                report
                    .commands
                    .push(MotionCommand::SetArm(self.config.avoid_targets.clone()));
                self.enter(CycleState::Avoiding, &mut report);
            }
            self.last_camera_check = now;
        }

        if !self.timer.expired() {
            return report;
        }

        match self.state {
            CycleState::Waiting => {
                if let Some(d) = sensors.distance
                    && d < self.config.proximity_threshold
                {
                    info!(distance = d, "object in reach; grasping");
                    self.timer.arm(self.config.phase_ticks);
                    report
                        .commands
                        .push(MotionCommand::SetGripper(self.config.grip_position));
                    self.enter(CycleState::Grasping, &mut report);
                }
            }
            CycleState::Grasping => {
                info!("arm rotating to drop point");
                report
                    .commands
                    .push(MotionCommand::SetArm(self.config.carry_targets.clone()));
                self.enter(CycleState::Rotating, &mut report);
            }
            CycleState::Rotating => {
                if let Some(p) = sensors.wrist_position
                    && p < self.config.rotation_done_below
                {
                    info!(wrist = p, "releasing object");
                    self.timer.arm(self.config.phase_ticks);
                    report
                        .commands
                        .push(MotionCommand::SetGripper(self.config.gripper_min_position));
                    self.enter(CycleState::Releasing, &mut report);
                }
            }
            CycleState::Releasing => {
                info!("arm returning");
                report
                    .commands
                    .push(MotionCommand::SetArm(self.config.home_targets.clone()));
                self.enter(CycleState::RotatingBack, &mut report);
            }
            CycleState::RotatingBack => {
                if let Some(p) = sensors.wrist_position
                    && p > self.config.return_done_above
                {
                    info!(wrist = p, "waiting for next object");
                    self.enter(CycleState::Waiting, &mut report);
                }
            }
            CycleState::Avoiding => {
                if let Some(window) = self.avoid
                    && window.elapsed(now)
                {
                    info!(now, "avoidance complete; resuming");
                    report
                        .commands
                        .push(MotionCommand::SetArm(self.config.home_targets.clone()));
                    self.avoid = None;
                    self.enter(CycleState::Waiting, &mut report);
                    monitor.reset();
                }
            }
        }
        report
    }

    fn enter(&mut self, next: CycleState, report: &mut TickReport) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "cycle transition");
        report.transitions.push((self.state, next));
        self.state = next;
    }
}
