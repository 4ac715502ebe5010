//! Generic `Camera` trait and the raw frame type it produces.

use pickplace_types::RigError;

/// A raw RGB24 frame returned by a camera driver.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Row-major RGB24 pixel data, `width * height * 3` bytes.
    pub data: Vec<u8>,
}

impl CameraFrame {
    /// Number of bytes an RGB24 frame of this size must carry.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Check that the buffer matches the declared dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::FrameAcquisition`] for empty frames or when the
    /// buffer length disagrees with `width * height * 3`.
    pub fn validate(&self, camera: &str) -> Result<(), RigError> {
        if self.width == 0 || self.height == 0 {
            return Err(RigError::FrameAcquisition {
                camera: camera.to_string(),
                details: format!("empty frame {}x{}", self.width, self.height),
            });
        }
        if self.data.len() != self.expected_len() {
            return Err(RigError::FrameAcquisition {
                camera: camera.to_string(),
                details: format!(
                    "buffer holds {} bytes, expected {} for {}x{} RGB",
                    self.data.len(),
                    self.expected_len(),
                    self.width,
                    self.height
                ),
            });
        }
        Ok(())
    }
}

/// A camera or image-capture device.
pub trait Camera: Send {
    /// Stable device name, e.g. `"camera1"`.
    fn id(&self) -> &str;

    /// Start delivering frames at the given sampling period.
    fn enable(&mut self, _period_ms: u32) {}

    /// Return the current frame.
    ///
    /// `Ok(None)` means the device had no image this tick, which callers
    /// treat as a miss rather than a fault.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::FrameAcquisition`] if the device failed to deliver.
    fn capture(&mut self) -> Result<Option<CameraFrame>, RigError>;
}
