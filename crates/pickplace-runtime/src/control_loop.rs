//! [`ControlLoop`] – one read → decide → act pass per tick.
//!
//! The loop owns the [`ArmRig`], the [`CycleController`], and the
//! fallen-object monitor, and pulls time from a [`TickSource`].  It never
//! blocks and never returns an error: device faults are absorbed by the rig
//! and the detector, so a tick always completes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pickplace_perception::FallenObjectMonitor;
use pickplace_types::CycleState;
use serde::Serialize;
use tracing::{debug, info};

use crate::cycle::{CycleController, TickReport};
use crate::rig::ArmRig;

// ─────────────────────────────────────────────────────────────────────────────
// Tick sources
// ─────────────────────────────────────────────────────────────────────────────

/// Supplies the simulation time of each tick; `None` ends the run.
pub trait TickSource {
    fn next_tick(&mut self) -> Option<f64>;
}

/// Ticks at a fixed period, the first one at `period`.
///
/// Ends after `limit` ticks if one is set, or as soon as the stop flag is
/// raised.
#[derive(Debug, Clone)]
pub struct FixedRateTicks {
    period: f64,
    issued: u64,
    limit: Option<u64>,
    stop: Option<Arc<AtomicBool>>,
}

impl FixedRateTicks {
    /// Ticks every `period_ms` milliseconds, reported in seconds.
    pub fn from_millis(period_ms: u32) -> Self {
        Self {
            period: f64::from(period_ms) / 1000.0,
            issued: 0,
            limit: None,
            stop: None,
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Tick period in seconds.
    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }
}

impl TickSource for FixedRateTicks {
    fn next_tick(&mut self) -> Option<f64> {
        if let Some(stop) = &self.stop
            && stop.load(Ordering::SeqCst)
        {
            info!(ticks = self.issued, "stop requested");
            return None;
        }
        if self.limit.is_some_and(|limit| self.issued >= limit) {
            return None;
        }
        self.issued += 1;
        Some(self.issued as f64 * self.period)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run summary
// ─────────────────────────────────────────────────────────────────────────────

/// Tallies kept across a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    /// Completed `RotatingBack → Waiting` returns.
    pub pick_cycles_completed: u64,
    /// `Waiting → Avoiding` entries.
    pub avoidance_episodes: u64,
    /// Transition counts keyed `"from->to"`.
    pub transitions: BTreeMap<String, u64>,
    pub final_state: CycleState,
    pub last_tick_time: Option<f64>,
}

impl RunSummary {
    fn record(&mut self, now: f64, report: &TickReport, state: CycleState) {
        self.ticks += 1;
        self.last_tick_time = Some(now);
        self.final_state = state;
        for &(from, to) in &report.transitions {
            match (from, to) {
                (CycleState::RotatingBack, CycleState::Waiting) => self.pick_cycles_completed += 1,
                (CycleState::Waiting, CycleState::Avoiding) => self.avoidance_episodes += 1,
                _ => {}
            }
            *self.transitions.entry(format!("{from}->{to}")).or_default() += 1;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loop
// ─────────────────────────────────────────────────────────────────────────────

/// The per-tick driver.
pub struct ControlLoop<M: FallenObjectMonitor> {
    rig: ArmRig,
    controller: CycleController,
    monitor: M,
    summary: RunSummary,
}

impl<M: FallenObjectMonitor> ControlLoop<M> {
    pub fn new(rig: ArmRig, controller: CycleController, monitor: M) -> Self {
        Self {
            rig,
            controller,
            monitor,
            summary: RunSummary::default(),
        }
    }

    /// Run one tick at time `now`.
    pub fn step(&mut self, now: f64) -> TickReport {
        let readings = self.rig.read();
        let report = self
            .controller
            .tick(&readings, &mut self.monitor, now);
        for command in &report.commands {
            debug!(?command, "applying");
            self.rig.apply(command);
        }
        self.summary
            .record(now, &report, self.controller.state());
        report
    }

    /// Step until `ticks` runs dry.
    pub fn run(&mut self, ticks: &mut dyn TickSource) -> &RunSummary {
        while let Some(now) = ticks.next_tick() {
            self.step(now);
        }
        info!(
            ticks = self.summary.ticks,
            cycles = self.summary.pick_cycles_completed,
            avoidances = self.summary.avoidance_episodes,
            state = %self.summary.final_state,
            "control loop finished"
        );
        &self.summary
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn controller(&self) -> &CycleController {
        &self.controller
    }

    pub fn monitor(&self) -> &M {
        &self.monitor
    }

    pub fn rig(&self) -> &ArmRig {
        &self.rig
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::CycleConfig;
    use crate::rig::{ARM_JOINTS, DISTANCE_SENSOR, FINGER_JOINTS, POSITION_SENSOR, RigSetup};
    use pickplace_hal::sim::{SimHandles, SimRig};

    /// Monitor that fires on its first poll and counts resets.
    #[derive(Default)]
    struct OneShot {
        armed: bool,
        polls: u32,
        resets: u32,
    }

    impl FallenObjectMonitor for OneShot {
        fn poll(&mut self, _now: f64) -> bool {
            self.polls += 1;
            std::mem::take(&mut self.armed)
        }
        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    /// Fixed ticks that advance the simulated joints before each tick.
    struct WorldTicks {
        inner: FixedRateTicks,
        world: SimHandles,
    }

    impl TickSource for WorldTicks {
        fn next_tick(&mut self) -> Option<f64> {
            let now = self.inner.next_tick()?;
            self.world.advance(self.inner.period());
            Some(now)
        }
    }

    fn sim_loop(monitor: OneShot, distance: f64) -> (ControlLoop<OneShot>, SimHandles) {
        let (mut registry, handles) = SimRig::new()
            .with_arm(&ARM_JOINTS)
            .with_arm(&FINGER_JOINTS)
            .with_position_sensor(POSITION_SENSOR, "wrist_1_joint")
            .with_value_sensor(DISTANCE_SENSOR, distance)
            .build();
        let rig = ArmRig::from_registry(
            &mut registry,
            RigSetup {
                arm_velocity: 1.2,
                gripper_open: 0.0495,
                period_ms: 32,
            },
        );
        let ctl = ControlLoop::new(rig, CycleController::new(CycleConfig::default()), monitor);
        (ctl, handles)
    }

    #[test]
    fn fixed_rate_ticks_respect_limit() {
        let mut ticks = FixedRateTicks::from_millis(32).with_limit(3);
        assert_eq!(ticks.next_tick(), Some(0.032));
        assert_eq!(ticks.next_tick(), Some(0.064));
        assert!(ticks.next_tick().is_some());
        assert_eq!(ticks.next_tick(), None);
        assert_eq!(ticks.issued(), 3);
    }

    #[test]
    fn stop_flag_ends_ticks() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut ticks = FixedRateTicks::from_millis(32).with_stop_flag(stop.clone());
        assert!(ticks.next_tick().is_some());
        stop.store(true, Ordering::SeqCst);
        assert_eq!(ticks.next_tick(), None);
    }

    #[test]
    fn step_applies_commands_to_rig() {
        let (mut ctl, handles) = sim_loop(OneShot::default(), 400.0);
        let report = ctl.step(0.032);
        assert_eq!(ctl.controller().state(), CycleState::Grasping);
        assert_eq!(report.commands.len(), 1);
        for name in FINGER_JOINTS {
            assert!((handles.joints[name].target() - 0.85).abs() < 1e-12);
        }
    }

    #[test]
    fn full_pick_cycle_is_counted() {
        let (mut ctl, handles) = sim_loop(OneShot::default(), 400.0);
        let mut ticks = WorldTicks {
            inner: FixedRateTicks::from_millis(32).with_limit(200),
            world: handles,
        };
        let summary = ctl.run(&mut ticks).clone();

        assert_eq!(summary.ticks, 200);
        assert_eq!(summary.pick_cycles_completed, 1);
        assert_eq!(summary.avoidance_episodes, 0);
        assert_eq!(summary.transitions["waiting->grasping"], 2);
        assert_eq!(summary.transitions["rotating->releasing"], 1);
        assert_eq!(summary.last_tick_time, Some(200.0 * 0.032));
    }

    #[test]
    fn avoidance_episode_resets_monitor() {
        let monitor = OneShot {
            armed: true,
            ..OneShot::default()
        };
        let (mut ctl, handles) = sim_loop(monitor, 1000.0);
        let mut ticks = WorldTicks {
            inner: FixedRateTicks::from_millis(32).with_limit(320),
            world: handles.clone(),
        };
        let summary = ctl.run(&mut ticks).clone();

        assert_eq!(summary.avoidance_episodes, 1);
        assert_eq!(summary.transitions["avoiding->waiting"], 1);
        assert_eq!(summary.final_state, CycleState::Waiting);
        assert_eq!(ctl.monitor().resets, 1);
        // Arm sent home after the episode.
        assert!(handles.joints["shoulder_lift_joint"].target().abs() < 1e-12);
    }

    #[test]
    fn summary_serialises_as_json() {
        let (mut ctl, _handles) = sim_loop(OneShot::default(), 400.0);
        ctl.step(0.032);
        let json = serde_json::to_value(ctl.summary()).expect("serialise");
        assert_eq!(json["ticks"], 1);
        assert_eq!(json["final_state"], "grasping");
        assert_eq!(json["transitions"]["waiting->grasping"], 1);
    }
}
