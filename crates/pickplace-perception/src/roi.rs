//! Regions of interest.
//!
//! An [`Roi`] is stored as fractions of the frame so the same configuration
//! works for any camera resolution.  It is converted to a [`PixelRect`]
//! against the actual frame size on every processed frame.

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Fractional region of interest: origin `(x, y)` and size `(w, h)`, all in
/// `[0, 1]` relative to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Pixel-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Resolve against a `width × height` frame.
    ///
    /// Corners are truncated towards zero (`x1 = ⌊W·x⌋`, `x2 = ⌊W·(x+w)⌋`)
    /// and clamped to the frame, so an out-of-range ROI shrinks rather than
    /// indexing past the buffer.  The result may be empty.
    pub fn to_pixels(&self, width: u32, height: u32) -> PixelRect {
        let edge = |frac: f64, size: u32| -> u32 {
            let v = (size as f64 * frac).floor();
            if v.is_nan() || v <= 0.0 {
                0
            } else {
                (v as u32).min(size)
            }
        };
        let x1 = edge(self.x, width);
        let y1 = edge(self.y, height);
        let x2 = edge(self.x + self.w, width).max(x1);
        let y2 = edge(self.y + self.h, height).max(y1);
        PixelRect {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }
}

impl PixelRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Crop `frame` to `roi`, or return it unchanged when no ROI is configured.
pub fn crop(frame: &RgbImage, roi: Option<&Roi>) -> (RgbImage, PixelRect) {
    match roi {
        None => (
            frame.clone(),
            PixelRect {
                x: 0,
                y: 0,
                width: frame.width(),
                height: frame.height(),
            },
        ),
        Some(roi) => {
            let rect = roi.to_pixels(frame.width(), frame.height());
            let cropped =
                image::imageops::crop_imm(frame, rect.x, rect.y, rect.width, rect.height)
                    .to_image();
            (cropped, rect)
        }
    }
}
