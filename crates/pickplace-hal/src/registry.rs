//! [`DeviceRegistry`] – startup-time device resolution.
//!
//! Drivers are registered under their device name.  Components then *take*
//! the devices they need exactly once during startup; a name that was never
//! registered resolves to `None` so the owning component can degrade instead
//! of failing.  After startup the registry is no longer consulted.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::actuator::Actuator;
use crate::camera::Camera;
use crate::sensor::Sensor;

/// Name-keyed store of device drivers awaiting resolution.
#[derive(Default)]
pub struct DeviceRegistry {
    actuators: HashMap<String, Box<dyn Actuator>>,
    sensors: HashMap<String, Box<dyn Sensor>>,
    cameras: HashMap<String, Box<dyn Camera>>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an actuator driver, replacing any driver with the same id.
    pub fn register_actuator(&mut self, actuator: Box<dyn Actuator>) {
        self.actuators.insert(actuator.id().to_string(), actuator);
    }

    /// Register a sensor driver, replacing any driver with the same id.
    pub fn register_sensor(&mut self, sensor: Box<dyn Sensor>) {
        self.sensors.insert(sensor.id().to_string(), sensor);
    }

    /// Register a camera driver, replacing any driver with the same id.
    pub fn register_camera(&mut self, camera: Box<dyn Camera>) {
        self.cameras.insert(camera.id().to_string(), camera);
    }

    /// Remove and return the actuator named `name`, if registered.
    pub fn take_actuator(&mut self, name: &str) -> Option<Box<dyn Actuator>> {
        let found = self.actuators.remove(name);
        log_resolution("actuator", name, found.is_some());
        found
    }

    /// Remove and return the sensor named `name`, if registered.
    pub fn take_sensor(&mut self, name: &str) -> Option<Box<dyn Sensor>> {
        let found = self.sensors.remove(name);
        log_resolution("sensor", name, found.is_some());
        found
    }

    /// Remove and return the camera named `name`, if registered.
    pub fn take_camera(&mut self, name: &str) -> Option<Box<dyn Camera>> {
        let found = self.cameras.remove(name);
        log_resolution("camera", name, found.is_some());
        found
    }

    /// Names of all devices still waiting to be taken, sorted.
    pub fn unclaimed(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .actuators
            .keys()
            .chain(self.sensors.keys())
            .chain(self.cameras.keys())
            .cloned()
            .collect();
        names.sort();
        names
    }
}

fn log_resolution(kind: &str, name: &str, found: bool) {
    if found {
        debug!(kind, device = name, "device resolved");
    } else {
        warn!(kind, device = name, "device not found; dependent actions will be skipped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraFrame;
    use pickplace_types::RigError;

    struct MockActuator {
        id: String,
    }
    impl Actuator for MockActuator {
        fn id(&self) -> &str {
            &self.id
        }
        fn set_position(&mut self, _target: f64) -> Result<(), RigError> {
            Ok(())
        }
        fn set_velocity(&mut self, _velocity: f64) -> Result<(), RigError> {
            Ok(())
        }
        fn target(&self) -> f64 {
            0.0
        }
    }

    struct MockSensor {
        id: String,
    }
    impl Sensor for MockSensor {
        fn id(&self) -> &str {
            &self.id
        }
        fn enable(&mut self, _period_ms: u32) {}
        fn read(&mut self) -> Result<f64, RigError> {
            Ok(42.0)
        }
    }

    struct MockCamera {
        id: String,
    }
    impl Camera for MockCamera {
        fn id(&self) -> &str {
            &self.id
        }
        fn capture(&mut self) -> Result<Option<CameraFrame>, RigError> {
            Ok(None)
        }
    }

    #[test]
    fn take_returns_registered_devices_once() {
        let mut registry = DeviceRegistry::new();
        registry.register_actuator(Box::new(MockActuator {
            id: "elbow_joint".to_string(),
        }));

        let act = registry.take_actuator("elbow_joint").expect("registered");
        assert_eq!(act.id(), "elbow_joint");
        assert!(registry.take_actuator("elbow_joint").is_none());
    }

    #[test]
    fn missing_devices_resolve_to_none() {
        let mut registry = DeviceRegistry::new();
        assert!(registry.take_actuator("wrist_2_joint").is_none());
        assert!(registry.take_sensor("distance sensor").is_none());
        assert!(registry.take_camera("camera1").is_none());
    }

    #[test]
    fn sensors_and_cameras_resolve_by_name() {
        let mut registry = DeviceRegistry::new();
        registry.register_sensor(Box::new(MockSensor {
            id: "distance sensor".to_string(),
        }));
        registry.register_camera(Box::new(MockCamera {
            id: "camera1".to_string(),
        }));

        let mut sensor = registry.take_sensor("distance sensor").unwrap();
        assert!((sensor.read().unwrap() - 42.0).abs() < f64::EPSILON);
        let mut camera = registry.take_camera("camera1").unwrap();
        assert_eq!(camera.capture().unwrap(), None);
    }

    #[test]
    fn unclaimed_lists_leftovers() {
        let mut registry = DeviceRegistry::new();
        registry.register_camera(Box::new(MockCamera {
            id: "camera2".to_string(),
        }));
        registry.register_actuator(Box::new(MockActuator {
            id: "elbow_joint".to_string(),
        }));
        let _ = registry.take_actuator("elbow_joint");
        assert_eq!(registry.unclaimed(), vec!["camera2".to_string()]);
    }
}
