//! External contours and the fallen-can rule.
//!
//! An upright can shows a narrow, tall silhouette; one lying on its side
//! shows a wide, flat one.  After noise filtering by enclosed area, the first
//! external contour whose bounding box is wider than `aspect_threshold` times
//! its height is taken as a fallen object.

use image::{GrayImage, imageops};
use imageproc::contours::{BorderType, Contour, find_contours};

use crate::roi::PixelRect;

/// Summary of one external contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    /// Area enclosed by the traced boundary polygon, in pixels².
    pub area: f64,
    /// Axis-aligned bounding box, inclusive of boundary pixels.
    pub bbox: PixelRect,
}

impl Blob {
    /// `width / height` of the bounding box, `0.0` for a zero-height box.
    pub fn aspect_ratio(&self) -> f64 {
        if self.bbox.height > 0 {
            self.bbox.width as f64 / self.bbox.height as f64
        } else {
            0.0
        }
    }
}

/// Shoelace area of a closed polygon.
fn polygon_area(contour: &Contour<i32>) -> f64 {
    let pts = &contour.points;
    if pts.len() < 3 {
        return 0.0;
    }
    let twice: i64 = pts
        .iter()
        .zip(pts.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

fn bounding_box(contour: &Contour<i32>) -> PixelRect {
    let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
    let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    if contour.points.is_empty() {
        return PixelRect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    }
    PixelRect {
        x: min_x.max(0) as u32,
        y: min_y.max(0) as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    }
}

/// Outermost contours of the non-zero regions of `mask`.
///
/// The image border counts as background, so a region touching it is still
/// external.  Borders nested inside a hole of another region are not
/// reported.
pub fn external_blobs(mask: &GrayImage) -> Vec<Blob> {
    // Border tracing labels regions that touch the frame edge as holes; a
    // one-pixel background margin keeps every region enclosed.
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    imageops::replace(&mut padded, mask, 1, 1);

    find_contours::<i32>(&padded)
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            let mut bbox = bounding_box(c);
            bbox.x = bbox.x.saturating_sub(1);
            bbox.y = bbox.y.saturating_sub(1);
            Blob {
                area: polygon_area(c),
                bbox,
            }
        })
        .collect()
}

/// First blob with `area >= min_area` and aspect ratio above
/// `aspect_threshold`, if any.
pub fn find_fallen(mask: &GrayImage, min_area: f64, aspect_threshold: f64) -> Option<Blob> {
    external_blobs(mask)
        .into_iter()
        .filter(|b| b.area >= min_area)
        .find(|b| b.aspect_ratio() > aspect_threshold)
}
