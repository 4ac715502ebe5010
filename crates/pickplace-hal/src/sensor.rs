//! Generic `Sensor` trait for scalar sensors.

use pickplace_types::RigError;

/// A sensor that reports one scalar per tick once enabled (distance, joint
/// angle, …).
pub trait Sensor: Send {
    /// Stable device name, e.g. `"distance sensor"`.
    fn id(&self) -> &str;

    /// Start sampling at the given period.
    fn enable(&mut self, period_ms: u32);

    /// Latest reading.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::HardwareFault`] when the device cannot be read,
    /// for example because it was never enabled.
    fn read(&mut self) -> Result<f64, RigError>;
}
