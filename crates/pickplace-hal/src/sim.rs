//! In-process simulated drivers for headless runs and tests.
//!
//! [`SimRig`] builds a [`DeviceRegistry`] populated with simulated motors,
//! sensors and cameras, and hands back the [`SimHandles`] that let a test or
//! scenario drive the simulated world: advance joint motion, move the
//! distance reading, or put a frame in front of a camera.
//!
//! # Example
//!
//! ```rust
//! use pickplace_hal::sim::SimRig;
//!
//! let (mut registry, handles) = SimRig::new()
//!     .with_arm(&["shoulder_lift_joint", "elbow_joint"])
//!     .with_position_sensor("elbow_joint_sensor", "elbow_joint")
//!     .build();
//!
//! let mut elbow = registry.take_actuator("elbow_joint").unwrap();
//! elbow.set_velocity(1.0).unwrap();
//! elbow.set_position(-0.5).unwrap();
//! handles.advance(1.0);
//!
//! let mut sensor = registry.take_sensor("elbow_joint_sensor").unwrap();
//! sensor.enable(32);
//! assert!((sensor.read().unwrap() + 0.5).abs() < 1e-9);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use pickplace_types::RigError;

use crate::actuator::Actuator;
use crate::camera::{Camera, CameraFrame};
use crate::registry::DeviceRegistry;
use crate::sensor::Sensor;

/// Velocity used by a simulated joint until `set_velocity` is called.
pub const DEFAULT_SIM_VELOCITY: f64 = 1.0;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned lock only means another test thread panicked mid-update.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ────────────────────────────────────────────────────────────────────────────
// Joints
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct JointState {
    target: f64,
    position: f64,
    velocity: f64,
}

/// Shared handle to one simulated joint.  The motor writes its target, the
/// world advances its position, and position sensors read it back.
#[derive(Debug, Clone)]
pub struct SimJoint {
    state: Arc<Mutex<JointState>>,
}

impl Default for SimJoint {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(JointState {
                target: 0.0,
                position: 0.0,
                velocity: DEFAULT_SIM_VELOCITY,
            })),
        }
    }
}

impl SimJoint {
    /// Current simulated joint angle.
    pub fn position(&self) -> f64 {
        lock(&self.state).position
    }

    /// Most recently commanded target.
    pub fn target(&self) -> f64 {
        lock(&self.state).target
    }

    /// Velocity the joint is travelling at.
    pub fn velocity(&self) -> f64 {
        lock(&self.state).velocity
    }

    /// Move the joint towards its target by at most `velocity * dt`.
    pub fn advance(&self, dt: f64) {
        let mut s = lock(&self.state);
        let step = s.velocity.abs() * dt.max(0.0);
        let delta = s.target - s.position;
        if delta.abs() <= step {
            s.position = s.target;
        } else {
            s.position += step.copysign(delta);
        }
    }
}

/// Simulated motor bound to a [`SimJoint`].  Always succeeds.
pub struct SimMotor {
    id: String,
    joint: SimJoint,
}

impl SimMotor {
    /// Create a motor named `id` driving `joint`.
    pub fn new(id: impl Into<String>, joint: SimJoint) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            joint,
        })
    }
}

impl Actuator for SimMotor {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_position(&mut self, target: f64) -> Result<(), RigError> {
        lock(&self.joint.state).target = target;
        Ok(())
    }

    fn set_velocity(&mut self, velocity: f64) -> Result<(), RigError> {
        lock(&self.joint.state).velocity = velocity;
        Ok(())
    }

    fn target(&self) -> f64 {
        self.joint.target()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sensors
// ────────────────────────────────────────────────────────────────────────────

/// Shared scalar that a [`SimSensor`] reports.  Scenarios move it around.
#[derive(Debug, Clone, Default)]
pub struct SimValue(Arc<Mutex<f64>>);

impl SimValue {
    /// Create a value holding `initial`.
    pub fn new(initial: f64) -> Self {
        Self(Arc::new(Mutex::new(initial)))
    }

    /// Overwrite the reported value.
    pub fn set(&self, value: f64) {
        *lock(&self.0) = value;
    }

    /// Current value.
    pub fn get(&self) -> f64 {
        *lock(&self.0)
    }
}

enum SensorSource {
    Value(SimValue),
    Joint(SimJoint),
}

/// Simulated scalar sensor.  Reading before [`Sensor::enable`] is a fault,
/// matching a real device that was never switched on.
pub struct SimSensor {
    id: String,
    source: SensorSource,
    enabled: bool,
}

impl SimSensor {
    /// Sensor reporting a free-standing [`SimValue`].
    pub fn value(id: impl Into<String>, value: SimValue) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            source: SensorSource::Value(value),
            enabled: false,
        })
    }

    /// Position sensor reporting the angle of `joint`.
    pub fn joint(id: impl Into<String>, joint: SimJoint) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            source: SensorSource::Joint(joint),
            enabled: false,
        })
    }
}

impl Sensor for SimSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn enable(&mut self, _period_ms: u32) {
        self.enabled = true;
    }

    fn read(&mut self) -> Result<f64, RigError> {
        if !self.enabled {
            return Err(RigError::HardwareFault {
                component: self.id.clone(),
                details: "sensor read before enable".to_string(),
            });
        }
        Ok(match &self.source {
            SensorSource::Value(v) => v.get(),
            SensorSource::Joint(j) => j.position(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Cameras
// ────────────────────────────────────────────────────────────────────────────

/// Shared slot holding whatever the simulated camera currently sees.
#[derive(Debug, Clone, Default)]
pub struct SimScene(Arc<Mutex<Option<CameraFrame>>>);

impl SimScene {
    /// Put `frame` in front of the camera.
    pub fn show(&self, frame: CameraFrame) {
        *lock(&self.0) = Some(frame);
    }

    /// Make the camera return no data.
    pub fn clear(&self) {
        *lock(&self.0) = None;
    }
}

/// Simulated camera returning a copy of its [`SimScene`] on every capture.
pub struct SimCamera {
    id: String,
    scene: SimScene,
}

impl SimCamera {
    /// Camera named `id` looking at `scene`.
    pub fn new(id: impl Into<String>, scene: SimScene) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            scene,
        })
    }
}

impl Camera for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<Option<CameraFrame>, RigError> {
        Ok(lock(&self.scene.0).clone())
    }
}

/// A uniformly coloured RGB frame.
pub fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> CameraFrame {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for _ in 0..(width as usize * height as usize) {
        data.extend_from_slice(&rgb);
    }
    CameraFrame {
        width,
        height,
        data,
    }
}

/// Paint an axis-aligned rectangle `(x, y, w, h)` in pixel space onto
/// `frame`.  Parts outside the frame are clipped.
pub fn paint_rect(frame: &mut CameraFrame, rect: (u32, u32, u32, u32), rgb: [u8; 3]) {
    let (x, y, w, h) = rect;
    let x_end = x.saturating_add(w).min(frame.width);
    let y_end = y.saturating_add(h).min(frame.height);
    for py in y.min(frame.height)..y_end {
        for px in x.min(frame.width)..x_end {
            let idx = (py as usize * frame.width as usize + px as usize) * 3;
            frame.data[idx..idx + 3].copy_from_slice(&rgb);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRig builder
// ────────────────────────────────────────────────────────────────────────────

/// Handles to the simulated world behind a [`SimRig`]-built registry.
#[derive(Debug, Clone, Default)]
pub struct SimHandles {
    /// Every simulated joint, keyed by motor name.
    pub joints: HashMap<String, SimJoint>,
    /// Every free-standing sensor value, keyed by sensor name.
    pub values: HashMap<String, SimValue>,
    /// Every camera scene, keyed by camera name.
    pub scenes: HashMap<String, SimScene>,
}

impl SimHandles {
    /// Advance every joint by `dt` time units.
    pub fn advance(&self, dt: f64) {
        for joint in self.joints.values() {
            joint.advance(dt);
        }
    }
}

/// Builder for a [`DeviceRegistry`] backed entirely by simulated drivers.
#[derive(Default)]
pub struct SimRig {
    registry: DeviceRegistry,
    handles: SimHandles,
}

impl SimRig {
    /// Start an empty rig.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one simulated motor per name.
    pub fn with_arm(mut self, names: &[&str]) -> Self {
        for name in names {
            let joint = SimJoint::default();
            self.registry
                .register_actuator(SimMotor::new(*name, joint.clone()));
            self.handles.joints.insert((*name).to_string(), joint);
        }
        self
    }

    /// Add a position sensor reading the joint driven by motor `joint_name`.
    /// Ignored if no such motor was added first.
    pub fn with_position_sensor(mut self, id: &str, joint_name: &str) -> Self {
        if let Some(joint) = self.handles.joints.get(joint_name) {
            self.registry
                .register_sensor(SimSensor::joint(id, joint.clone()));
        }
        self
    }

    /// Add a scalar sensor reporting `initial` until changed.
    pub fn with_value_sensor(mut self, id: &str, initial: f64) -> Self {
        let value = SimValue::new(initial);
        self.registry
            .register_sensor(SimSensor::value(id, value.clone()));
        self.handles.values.insert(id.to_string(), value);
        self
    }

    /// Add a camera with an empty scene.
    pub fn with_camera(mut self, id: &str) -> Self {
        let scene = SimScene::default();
        self.registry.register_camera(SimCamera::new(id, scene.clone()));
        self.handles.scenes.insert(id.to_string(), scene);
        self
    }

    /// Consume the builder.
    pub fn build(self) -> (DeviceRegistry, SimHandles) {
        (self.registry, self.handles)
    }
}
