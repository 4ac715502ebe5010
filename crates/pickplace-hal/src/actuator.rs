//! Generic `Actuator` trait for position-controlled motors.
//!
//! Arm joints and gripper fingers both implement this trait.  The cycle
//! controller never holds an actuator directly; the runtime's rig owns the
//! boxed drivers and applies [`MotionCommand`][pickplace_types::MotionCommand]s
//! to them.

use pickplace_types::RigError;

/// A position-controlled motor (arm joint, finger joint, …).
pub trait Actuator: Send {
    /// Stable device name, e.g. `"elbow_joint"` or `"finger_1_joint_1"`.
    fn id(&self) -> &str;

    /// Command the motor towards `target` (radians from its zero position).
    ///
    /// # Errors
    ///
    /// Returns [`RigError::HardwareFault`] if the command cannot be applied.
    fn set_position(&mut self, target: f64) -> Result<(), RigError>;

    /// Set the travel velocity used for subsequent position commands.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::HardwareFault`] if the driver rejects the value.
    fn set_velocity(&mut self, velocity: f64) -> Result<(), RigError>;

    /// Most recently commanded target position.
    fn target(&self) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockActuator {
        id: String,
        target: f64,
        velocity: f64,
    }

    impl Actuator for MockActuator {
        fn id(&self) -> &str {
            &self.id
        }

        fn set_position(&mut self, target: f64) -> Result<(), RigError> {
            self.target = target;
            Ok(())
        }

        fn set_velocity(&mut self, velocity: f64) -> Result<(), RigError> {
            if velocity < 0.0 {
                return Err(RigError::HardwareFault {
                    component: self.id.clone(),
                    details: format!("negative velocity {velocity}"),
                });
            }
            self.velocity = velocity;
            Ok(())
        }

        fn target(&self) -> f64 {
            self.target
        }
    }

    #[test]
    fn mock_actuator_records_target_and_velocity() {
        let mut act = MockActuator {
            id: "elbow_joint".to_string(),
            target: 0.0,
            velocity: 0.0,
        };
        act.set_position(-2.14).unwrap();
        act.set_velocity(1.2).unwrap();
        assert_eq!(act.id(), "elbow_joint");
        assert!((act.target() + 2.14).abs() < f64::EPSILON);
        assert!((act.velocity - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn mock_actuator_rejects_negative_velocity() {
        let mut act = MockActuator {
            id: "wrist_1_joint".to_string(),
            target: 0.0,
            velocity: 0.0,
        };
        assert!(matches!(
            act.set_velocity(-1.0),
            Err(RigError::HardwareFault { .. })
        ));
    }
}
