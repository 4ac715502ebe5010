//! [`ArmRig`] – the devices the cycle controller drives.
//!
//! The rig resolves the arm joints, gripper fingers, and the two sensors from
//! a [`DeviceRegistry`] once at startup, then applies [`MotionCommand`]s and
//! gathers [`SensorReadings`] every tick.  Arm joints are kept positionally:
//! a missing joint leaves a `None` slot so targets stay index-aligned with
//! [`ARM_JOINTS`].  Missing devices and driver faults never escape the rig.

use pickplace_hal::{Actuator, DeviceRegistry, Sensor};
use pickplace_types::MotionCommand;
use tracing::{debug, info, warn};

use crate::cycle::SensorReadings;

/// Gripper finger motors, all driven to the same position.
pub const FINGER_JOINTS: [&str; 3] = ["finger_1_joint_1", "finger_2_joint_1", "finger_middle_joint_1"];

/// Arm motors, in the order joint targets are listed.
pub const ARM_JOINTS: [&str; 4] = ["shoulder_lift_joint", "elbow_joint", "wrist_1_joint", "wrist_2_joint"];

/// Object-arrival sensor.
pub const DISTANCE_SENSOR: &str = "distance sensor";

/// Joint-position sensor used to tell when a rotation has finished.
pub const POSITION_SENSOR: &str = "wrist_1_joint_sensor";

/// Startup parameters for [`ArmRig::from_registry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigSetup {
    /// Velocity applied to every arm joint once.
    pub arm_velocity: f64,
    /// Position the fingers are opened to at startup.
    pub gripper_open: f64,
    /// Sampling period for the sensors.
    pub period_ms: u32,
}

/// Owned device handles for one manipulator.
pub struct ArmRig {
    arm: Vec<Option<Box<dyn Actuator>>>,
    fingers: Vec<Box<dyn Actuator>>,
    distance: Option<Box<dyn Sensor>>,
    wrist: Option<Box<dyn Sensor>>,
}

impl ArmRig {
    /// Rig over explicitly supplied devices.  `arm` slots follow
    /// [`ARM_JOINTS`] order.
    pub fn new(
        arm: Vec<Option<Box<dyn Actuator>>>,
        fingers: Vec<Box<dyn Actuator>>,
        distance: Option<Box<dyn Sensor>>,
        wrist: Option<Box<dyn Sensor>>,
    ) -> Self {
        Self {
            arm,
            fingers,
            distance,
            wrist,
        }
    }

    /// Resolve every device by name and perform startup initialisation:
    /// open the fingers, set the arm velocity, enable the sensors.
    pub fn from_registry(registry: &mut DeviceRegistry, setup: RigSetup) -> Self {
        let mut fingers = Vec::new();
        for name in FINGER_JOINTS {
            if let Some(mut motor) = registry.take_actuator(name) {
                if let Err(e) = motor.set_position(setup.gripper_open) {
                    warn!(device = name, error = %e, "could not open finger at startup");
                }
                fingers.push(motor);
            }
        }

        let arm = ARM_JOINTS
            .iter()
            .map(|name| {
                registry.take_actuator(name).map(|mut motor| {
                    if let Err(e) = motor.set_velocity(setup.arm_velocity) {
                        warn!(device = name, error = %e, "could not set joint velocity");
                    }
                    motor
                })
            })
            .collect();

        let enable = |mut sensor: Box<dyn Sensor>| {
            sensor.enable(setup.period_ms);
            info!(device = sensor.id(), "sensor active");
            sensor
        };
        let distance = registry.take_sensor(DISTANCE_SENSOR).map(enable);
        let wrist = registry.take_sensor(POSITION_SENSOR).map(enable);

        let rig = Self::new(arm, fingers, distance, wrist);
        info!(
            arm_joints = rig.bound_arm_joints(),
            fingers = rig.fingers.len(),
            velocity = setup.arm_velocity,
            "rig ready; waiting for objects"
        );
        rig
    }

    /// Number of arm slots with a bound motor.
    pub fn bound_arm_joints(&self) -> usize {
        self.arm.iter().filter(|slot| slot.is_some()).count()
    }

    /// Read both sensors.  Unbound or failing sensors report `None`.
    pub fn read(&mut self) -> SensorReadings {
        SensorReadings {
            distance: read_sensor(self.distance.as_mut()),
            wrist_position: read_sensor(self.wrist.as_mut()),
        }
    }

    /// Apply one command, skipping devices that are not bound.
    pub fn apply(&mut self, command: &MotionCommand) {
        match command {
            MotionCommand::SetGripper(position) => {
                for motor in &mut self.fingers {
                    drive(motor.as_mut(), *position);
                }
            }
            MotionCommand::SetArm(targets) => {
                for (slot, target) in self.arm.iter_mut().zip(targets) {
                    match slot {
                        Some(motor) => drive(motor.as_mut(), *target),
                        None => debug!(position = *target, "arm joint not bound; skipped"),
                    }
                }
            }
        }
    }
}

fn drive(motor: &mut dyn Actuator, target: f64) {
    if let Err(e) = motor.set_position(target) {
        warn!(device = motor.id(), position = target, error = %e, "actuator command failed");
    }
}

fn read_sensor(sensor: Option<&mut Box<dyn Sensor>>) -> Option<f64> {
    let sensor = sensor?;
    match sensor.read() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(device = sensor.id(), error = %e, "sensor read failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pickplace_hal::sim::SimRig;

    fn setup() -> RigSetup {
        RigSetup {
            arm_velocity: 1.2,
            gripper_open: 0.0495,
            period_ms: 32,
        }
    }

    fn full_rig() -> (ArmRig, pickplace_hal::sim::SimHandles) {
        let (mut registry, handles) = SimRig::new()
            .with_arm(&ARM_JOINTS)
            .with_arm(&FINGER_JOINTS)
            .with_position_sensor(POSITION_SENSOR, "wrist_1_joint")
            .with_value_sensor(DISTANCE_SENSOR, 1000.0)
            .build();
        (ArmRig::from_registry(&mut registry, setup()), handles)
    }

    #[test]
    fn startup_opens_fingers_and_sets_arm_velocity() {
        let (rig, handles) = full_rig();
        assert_eq!(rig.bound_arm_joints(), 4);
        for name in FINGER_JOINTS {
            assert!((handles.joints[name].target() - 0.0495).abs() < 1e-12);
        }
        for name in ARM_JOINTS {
            assert!((handles.joints[name].velocity() - 1.2).abs() < 1e-12);
        }
    }

    #[test]
    fn arm_targets_are_index_aligned() {
        let (mut rig, handles) = full_rig();
        rig.apply(&MotionCommand::SetArm(vec![-1.88, -2.14, -2.38, -1.51]));
        assert!((handles.joints["shoulder_lift_joint"].target() + 1.88).abs() < 1e-12);
        assert!((handles.joints["wrist_2_joint"].target() + 1.51).abs() < 1e-12);
    }

    #[test]
    fn gripper_command_drives_every_finger() {
        let (mut rig, handles) = full_rig();
        rig.apply(&MotionCommand::SetGripper(0.85));
        for name in FINGER_JOINTS {
            assert!((handles.joints[name].target() - 0.85).abs() < 1e-12);
        }
    }

    #[test]
    fn partial_arm_drives_only_bound_joints() {
        let (mut registry, handles) = SimRig::new()
            .with_arm(&["shoulder_lift_joint", "wrist_1_joint"])
            .build();
        let mut rig = ArmRig::from_registry(&mut registry, setup());
        assert_eq!(rig.bound_arm_joints(), 2);

        rig.apply(&MotionCommand::SetArm(vec![-1.88, -2.14, -2.38, -1.51]));
        assert!((handles.joints["shoulder_lift_joint"].target() + 1.88).abs() < 1e-12);
        // Slot 2, not slot 1: positions follow the joint list, not the bound count.
        assert!((handles.joints["wrist_1_joint"].target() + 2.38).abs() < 1e-12);
    }

    #[test]
    fn short_target_list_leaves_remaining_joints_alone() {
        let (mut rig, handles) = full_rig();
        rig.apply(&MotionCommand::SetArm(vec![0.5]));
        assert!((handles.joints["shoulder_lift_joint"].target() - 0.5).abs() < 1e-12);
        assert!(handles.joints["elbow_joint"].target().abs() < 1e-12);
    }

    #[test]
    fn readings_follow_the_sim() {
        let (mut rig, handles) = full_rig();
        handles.values[DISTANCE_SENSOR].set(420.0);
        rig.apply(&MotionCommand::SetArm(vec![0.0, 0.0, -0.6, 0.0]));
        handles.advance(1.0);
        let r = rig.read();
        assert_eq!(r.distance, Some(420.0));
        let wrist = r.wrist_position.expect("wrist sensor bound");
        assert!((wrist + 0.6).abs() < 1e-9);
    }

    #[test]
    fn empty_registry_yields_inert_rig() {
        let mut registry = DeviceRegistry::new();
        let mut rig = ArmRig::from_registry(&mut registry, setup());
        assert_eq!(rig.bound_arm_joints(), 0);
        assert_eq!(rig.read(), SensorReadings::default());
        rig.apply(&MotionCommand::SetGripper(0.85));
        rig.apply(&MotionCommand::SetArm(vec![1.0; 4]));
    }
}
