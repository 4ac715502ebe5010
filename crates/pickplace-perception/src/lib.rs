//! `pickplace-perception` – fallen-object detection.
//!
//! Watches the belt through zero or more cameras and raises a single boolean
//! event when a red can is seen lying on its side.  Detection never actuates
//! anything; the cycle controller decides what to do with the event.
//!
//! # Modules
//!
//! - [`roi`] – [`Roi`][roi::Roi]: fractional region of interest and the
//!   crop into a pixel rectangle.
//! - [`mask`] – red segmentation: 8-bit HSV conversion, dual hue band
//!   thresholding, morphological closing.
//! - [`contour`] – external contour extraction and the wide-silhouette
//!   classification rule.
//! - [`detector`] – [`FallenObjectDetector`][detector::FallenObjectDetector]:
//!   per-camera pipeline with frame skipping and event cooldown.

pub mod contour;
pub mod detector;
pub mod mask;
pub mod roi;

pub use contour::{Blob, external_blobs, find_fallen};
pub use detector::{
    CameraBinding, CameraOutcome, DetectorConfig, DetectorState, FallenObjectDetector,
    FallenObjectMonitor, VisionConfig,
};
pub use mask::{HueBand, red_mask, rgb_to_hsv};
pub use roi::{PixelRect, Roi};
