//! `pickplace-hal` – Hardware Abstraction Layer.
//!
//! Capability traits for the three device kinds the controller touches, a
//! startup-time [`DeviceRegistry`][registry::DeviceRegistry] that resolves
//! them by name, and in-process simulated drivers.
//!
//! # Modules
//!
//! - [`actuator`] – [`Actuator`][actuator::Actuator]: position-controlled
//!   motors (arm joints, finger joints).
//! - [`camera`] – [`Camera`][camera::Camera] and
//!   [`CameraFrame`][camera::CameraFrame]: RGB image capture.
//! - [`sensor`] – [`Sensor`][sensor::Sensor]: scalar sensors (distance,
//!   joint position).
//! - [`registry`] – [`DeviceRegistry`][registry::DeviceRegistry]: name-based
//!   lookup performed once at startup.  A missing device resolves to `None`.
//! - [`sim`] – simulated motors, sensors and cameras for headless runs and
//!   tests.

pub mod actuator;
pub mod camera;
pub mod registry;
pub mod sensor;
pub mod sim;

pub use actuator::Actuator;
pub use camera::{Camera, CameraFrame};
pub use registry::DeviceRegistry;
pub use sensor::Sensor;
