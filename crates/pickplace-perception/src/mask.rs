//! Red segmentation.
//!
//! The region is shrunk to a fixed working size, converted to 8-bit HSV
//! (hue halved into `[0, 180)`, saturation and value in `[0, 255]`) and
//! thresholded against a set of hue bands.  Red straddles the hue
//! wrap-around, so the default configuration uses one band at each end of
//! the circle.  A single closing pass then merges fragments before the mask
//! is scaled back to the region's pixel size.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use serde::{Deserialize, Serialize};

/// Mask value for selected pixels.
pub const FOREGROUND: u8 = 255;

/// Inclusive HSV box, 8-bit convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueBand {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HueBand {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Return `true` when every channel of `hsv` lies within the band.
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| self.lower[c] <= hsv[c] && hsv[c] <= self.upper[c])
    }
}

/// Default red bands: low end `[0,120,80]..[10,255,255]` and high end
/// `[170,120,80]..[180,255,255]`.
pub fn default_red_bands() -> Vec<HueBand> {
    vec![
        HueBand::new([0, 120, 80], [10, 255, 255]),
        HueBand::new([170, 120, 80], [180, 255, 255]),
    ]
}

/// Convert one RGB pixel to 8-bit HSV.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(f32::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    let s = if max > 0.0 { diff * 255.0 / max } else { 0.0 };

    let mut h = if diff == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / diff
    } else if max == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    // 360° / 2 keeps hue in a byte; 359.x rounds to 180 and is folded to 0.
    let h = (h / 2.0).round() as u16 % 180;
    [h as u8, s.round() as u8, max as u8]
}

/// Build a binary mask over `region` selecting pixels inside any of `bands`.
///
/// `working` is the `(width, height)` the thresholding runs at; the returned
/// mask has the same dimensions as `region`.  `closing_radius` is the
/// half-size of the square structuring element (1 ⇒ 3×3, 0 disables the
/// closing pass).  Scaling back is linear with any non-zero sample kept, so
/// region edges grow by up to a pixel rather than being truncated.
pub fn red_mask(
    region: &RgbImage,
    working: (u32, u32),
    bands: &[HueBand],
    closing_radius: u8,
) -> GrayImage {
    let (w, h) = region.dimensions();
    if w == 0 || h == 0 {
        return GrayImage::new(w, h);
    }

    let (ww, wh) = (working.0.max(1), working.1.max(1));
    let small = imageops::resize(region, ww, wh, FilterType::Triangle);

    let mut mask = GrayImage::from_fn(ww, wh, |x, y| {
        let hsv = rgb_to_hsv(small.get_pixel(x, y).0);
        if bands.iter().any(|band| band.contains(hsv)) {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    });

    if closing_radius > 0 {
        mask = morphology::close(&mask, Norm::LInf, closing_radius);
    }

    // Linear upscale, then any non-zero sample counts as foreground.
    let mut scaled = imageops::resize(&mask, w, h, FilterType::Triangle);
    for p in scaled.pixels_mut() {
        if p.0[0] > 0 {
            p.0[0] = FOREGROUND;
        }
    }
    scaled
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn primary_colours_map_to_opencv_hues() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
    }

    #[test]
    fn greys_have_no_saturation() {
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
    }

    #[test]
    fn magenta_red_lands_in_high_band() {
        // Slightly bluish red: hue just below 360°.
        let hsv = rgb_to_hsv([220, 20, 40]);
        assert!(hsv[0] >= 170, "hue {}", hsv[0]);
        assert!(default_red_bands()[1].contains(hsv));
    }

    #[test]
    fn dull_red_is_rejected_by_saturation_floor() {
        // Pinkish: hue is red but saturation is well under 120.
        let hsv = rgb_to_hsv([200, 150, 150]);
        assert!(!default_red_bands().iter().any(|b| b.contains(hsv)));
    }

    #[test]
    fn mask_selects_red_block_at_original_size() {
        let mut region = RgbImage::from_pixel(120, 90, Rgb([30, 30, 30]));
        for y in 30..60 {
            for x in 20..100 {
                region.put_pixel(x, y, Rgb([200, 10, 10]));
            }
        }

        let mask = red_mask(&region, (240, 180), &default_red_bands(), 1);
        assert_eq!(mask.dimensions(), (120, 90));
        assert_eq!(mask.get_pixel(60, 45).0[0], FOREGROUND);
        assert_eq!(mask.get_pixel(5, 5).0[0], 0);
        assert_eq!(mask.get_pixel(110, 80).0[0], 0);
    }

    #[test]
    fn closing_fills_single_pixel_gaps() {
        let mut region = RgbImage::from_pixel(40, 20, Rgb([200, 10, 10]));
        // One-pixel dark seam through the middle.
        for y in 0..20 {
            region.put_pixel(20, y, Rgb([0, 0, 0]));
        }
        let closed = red_mask(&region, (40, 20), &default_red_bands(), 1);
        assert_eq!(closed.get_pixel(20, 10).0[0], FOREGROUND);

        let open = red_mask(&region, (40, 20), &default_red_bands(), 0);
        assert_eq!(open.get_pixel(20, 10).0[0], 0);
    }

    #[test]
    fn upscaled_mask_stays_binary_and_covers_the_block() {
        let mut region = RgbImage::from_pixel(480, 360, Rgb([30, 30, 30]));
        for y in 100..200 {
            for x in 100..300 {
                region.put_pixel(x, y, Rgb([200, 10, 10]));
            }
        }
        let mask = red_mask(&region, (240, 180), &default_red_bands(), 1);
        assert!(mask.pixels().all(|p| p.0[0] == 0 || p.0[0] == FOREGROUND));
        for (x, y) in [(100, 100), (299, 199), (200, 150)] {
            assert_eq!(mask.get_pixel(x, y).0[0], FOREGROUND, "({x}, {y})");
        }
        assert_eq!(mask.get_pixel(50, 50).0[0], 0);
    }

    #[test]
    fn empty_region_gives_empty_mask() {
        let region = RgbImage::new(0, 0);
        let mask = red_mask(&region, (240, 180), &default_red_bands(), 1);
        assert_eq!(mask.dimensions(), (0, 0));
    }
}
