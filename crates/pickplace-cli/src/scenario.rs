//! Simulated conveyor the binary runs against.
//!
//! Cans arrive in front of the distance sensor at a fixed interval and leave
//! when the gripper closes on them.  Optionally, a fallen can lies on the
//! belt in view of every camera for a window of time.  The world advances
//! the simulated joints once per tick before the controller reads its
//! sensors.

use pickplace_hal::sim::{SimHandles, SimRig, paint_rect, solid_frame};
use pickplace_hal::{CameraFrame, DeviceRegistry};
use pickplace_runtime::control_loop::{FixedRateTicks, TickSource};
use pickplace_runtime::rig::{ARM_JOINTS, DISTANCE_SENSOR, FINGER_JOINTS, POSITION_SENSOR};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Cameras present in the simulated cell.
pub const CAMERAS: [&str; 3] = ["camera1", "camera2", "camera3"];

/// Finger target above which the world treats the gripper as closed.
const GRIPPED_ABOVE: f64 = 0.5;

const BELT_RGB: [u8; 3] = [70, 70, 70];
const CAN_RGB: [u8; 3] = [200, 15, 15];

/// Shape of the simulated run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Seconds between a pick and the next can arriving.
    pub can_interval: f64,
    /// Distance reported while a can is in reach.
    pub near_distance: f64,
    /// Distance reported for an empty belt.
    pub far_distance: f64,
    /// When the fallen can appears; `None` disables it.
    pub fallen_at: Option<f64>,
    /// How long the fallen can stays in view.
    pub fallen_for: f64,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            can_interval: 6.0,
            near_distance: 400.0,
            far_distance: 1000.0,
            fallen_at: Some(20.0),
            fallen_for: 8.0,
            frame_width: 320,
            frame_height: 240,
        }
    }
}

/// Registry with the full arm, both sensors and every camera, plus the
/// handles the world drives.
pub fn build_cell(cfg: &ScenarioConfig) -> (DeviceRegistry, SimHandles) {
    let mut rig = SimRig::new()
        .with_arm(&ARM_JOINTS)
        .with_arm(&FINGER_JOINTS)
        .with_position_sensor(POSITION_SENSOR, "wrist_1_joint")
        .with_value_sensor(DISTANCE_SENSOR, cfg.far_distance);
    for camera in CAMERAS {
        rig = rig.with_camera(camera);
    }
    rig.build()
}

/// Empty belt as seen by a camera.
pub fn belt_frame(cfg: &ScenarioConfig) -> CameraFrame {
    solid_frame(cfg.frame_width, cfg.frame_height, BELT_RGB)
}

/// A can lying on its side across the lower middle of the frame.
pub fn fallen_can_frame(cfg: &ScenarioConfig) -> CameraFrame {
    let (w, h) = (cfg.frame_width, cfg.frame_height);
    let mut frame = belt_frame(cfg);
    paint_rect(&mut frame, (w * 5 / 16, h * 5 / 8, w * 3 / 8, h / 6), CAN_RGB);
    frame
}

/// [`TickSource`] that steps the simulated conveyor.
pub struct SimConveyor {
    ticks: FixedRateTicks,
    world: SimHandles,
    cfg: ScenarioConfig,
    next_arrival: f64,
    can_present: bool,
    was_gripping: bool,
    showing_fallen: Option<bool>,
    belt: CameraFrame,
    fallen: CameraFrame,
}

impl SimConveyor {
    pub fn new(ticks: FixedRateTicks, world: SimHandles, cfg: ScenarioConfig) -> Self {
        Self {
            ticks,
            world,
            next_arrival: cfg.can_interval,
            can_present: false,
            was_gripping: false,
            showing_fallen: None,
            belt: belt_frame(&cfg),
            fallen: fallen_can_frame(&cfg),
            cfg,
        }
    }

    /// Any finger commanded past the closed threshold.
    fn gripping(&self) -> bool {
        FINGER_JOINTS
            .iter()
            .filter_map(|name| self.world.joints.get(*name))
            .any(|joint| joint.target() > GRIPPED_ABOVE)
    }

    fn update_belt(&mut self, now: f64) {
        let gripping = self.gripping();
        if self.can_present {
            if gripping && !self.was_gripping {
                self.can_present = false;
                self.next_arrival = now + self.cfg.can_interval;
                self.set_distance(self.cfg.far_distance);
                debug!(now, "can lifted off the belt");
            }
        } else if now >= self.next_arrival {
            self.can_present = true;
            self.set_distance(self.cfg.near_distance);
            info!(now, "can arrived at pick point");
        }
        self.was_gripping = gripping;
    }

    fn update_cameras(&mut self, now: f64) {
        let fallen = self
            .cfg
            .fallen_at
            .is_some_and(|t| now >= t && now < t + self.cfg.fallen_for);
        if self.showing_fallen == Some(fallen) {
            return;
        }
        let frame = if fallen { &self.fallen } else { &self.belt };
        for scene in self.world.scenes.values() {
            scene.show(frame.clone());
        }
        if fallen {
            info!(now, "can knocked over on the belt");
        } else if self.showing_fallen.is_some() {
            info!(now, "belt cleared");
        }
        self.showing_fallen = Some(fallen);
    }

    fn set_distance(&self, value: f64) {
        if let Some(sensor) = self.world.values.get(DISTANCE_SENSOR) {
            sensor.set(value);
        }
    }
}

impl TickSource for SimConveyor {
    fn next_tick(&mut self) -> Option<f64> {
        let now = self.ticks.next_tick()?;
        self.world.advance(self.ticks.period());
        self.update_belt(now);
        self.update_cameras(now);
        Some(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pickplace_hal::{Actuator, Camera};

    fn pixel(frame: &CameraFrame, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * frame.width + x) * 3) as usize;
        [frame.data[i], frame.data[i + 1], frame.data[i + 2]]
    }

    fn conveyor(cfg: ScenarioConfig) -> (SimConveyor, DeviceRegistry, SimHandles) {
        let (registry, handles) = build_cell(&cfg);
        let ticks = FixedRateTicks::from_millis(32).with_limit(10_000);
        (SimConveyor::new(ticks, handles.clone(), cfg), registry, handles)
    }

    fn run_until(conv: &mut SimConveyor, t: f64) {
        while let Some(now) = conv.next_tick() {
            if now >= t {
                break;
            }
        }
    }

    #[test]
    fn can_arrives_after_interval() {
        let (mut conv, _registry, handles) = conveyor(ScenarioConfig::default());
        run_until(&mut conv, 5.9);
        assert_eq!(handles.values[DISTANCE_SENSOR].get(), 1000.0);
        run_until(&mut conv, 6.1);
        assert_eq!(handles.values[DISTANCE_SENSOR].get(), 400.0);
    }

    #[test]
    fn closing_the_gripper_takes_the_can() {
        let (mut conv, mut registry, handles) = conveyor(ScenarioConfig {
            can_interval: 1.0,
            ..ScenarioConfig::default()
        });
        run_until(&mut conv, 1.1);
        assert_eq!(handles.values[DISTANCE_SENSOR].get(), 400.0);

        let mut finger = registry.take_actuator("finger_1_joint_1").expect("finger");
        finger.set_position(0.85).expect("sim motor");
        conv.next_tick();
        assert_eq!(handles.values[DISTANCE_SENSOR].get(), 1000.0);
    }

    #[test]
    fn fallen_can_shows_for_its_window() {
        let cfg = ScenarioConfig {
            fallen_at: Some(1.0),
            fallen_for: 2.0,
            ..ScenarioConfig::default()
        };
        let (mut conv, mut registry, _handles) = conveyor(cfg);
        let mut camera = registry.take_camera("camera3").expect("camera3");

        run_until(&mut conv, 0.5);
        let frame = camera.capture().expect("ok").expect("frame");
        assert_eq!(pixel(&frame, 160, 170), BELT_RGB);

        run_until(&mut conv, 1.5);
        let frame = camera.capture().expect("ok").expect("frame");
        assert_eq!(pixel(&frame, 160, 170), CAN_RGB);

        run_until(&mut conv, 3.5);
        let frame = camera.capture().expect("ok").expect("frame");
        assert_eq!(pixel(&frame, 160, 170), BELT_RGB);
    }

    #[test]
    fn cell_has_every_camera() {
        let (_conv, mut registry, _handles) = conveyor(ScenarioConfig::default());
        for name in CAMERAS {
            assert!(registry.take_camera(name).is_some(), "{name}");
        }
        assert!(registry.unclaimed().iter().all(|d| !d.starts_with("camera")));
    }
}
