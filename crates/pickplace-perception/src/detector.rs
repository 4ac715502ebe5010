//! [`FallenObjectDetector`] – rate-limited fallen-can detection.
//!
//! # Rate limiting
//!
//! Every [`poll`][FallenObjectMonitor::poll] increments a frame counter; the
//! vision pipeline only runs when the counter is a multiple of
//! `process_every_n_frames`.  Once an event has fired, processed frames are
//! ignored until `cooldown` time units have passed, and no further event is
//! raised until [`reset`][FallenObjectMonitor::reset] clears the flag.
//!
//! # Per-camera pipeline
//!
//! Cameras are visited in binding order and the first detection
//! short-circuits the rest.  Each visit yields a [`CameraOutcome`]; a missing
//! frame or a processing fault skips that camera for this poll only.
//!
//! | Step | Operation |
//! |---|---|
//! | 1 | capture and validate the RGB frame |
//! | 2 | crop to the camera's [`Roi`] (full frame when none) |
//! | 3 | red mask at the working size, closed, scaled back |
//! | 4 | external contours, area floor, aspect-ratio test |

use std::collections::BTreeMap;

use image::RgbImage;
use pickplace_hal::{Camera, CameraFrame, DeviceRegistry};
use pickplace_types::RigError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::contour::find_fallen;
use crate::mask::{HueBand, default_red_bands, red_mask};
use crate::roi::{Roi, crop};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Tuning for the per-frame vision pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Width the region is resampled to before thresholding.
    pub working_width: u32,
    /// Height the region is resampled to before thresholding.
    pub working_height: u32,
    /// HSV bands whose union is "red".
    pub red_bands: Vec<HueBand>,
    /// Half-size of the square closing element (1 ⇒ 3×3).
    pub closing_radius: u8,
    /// Contours enclosing less than this many pixels are noise.
    pub min_contour_area: f64,
    /// Bounding-box `w / h` above which a contour is a fallen can.
    pub fallen_aspect_ratio: f64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            working_width: 240,
            working_height: 180,
            red_bands: default_red_bands(),
            closing_radius: 1,
            min_contour_area: 400.0,
            fallen_aspect_ratio: 1.5,
        }
    }
}

/// Detector configuration, including which camera each robot uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Run the vision pipeline on every Nth poll.
    pub process_every_n_frames: u32,
    /// Minimum time between two events.
    pub cooldown: f64,
    pub vision: VisionConfig,
    /// Robot name → camera device name.
    pub camera_map: BTreeMap<String, String>,
    /// Camera device name → region of interest.
    pub rois: BTreeMap<String, Roi>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let camera_map = [("UR3e", "camera3"), ("UR5e", "camera1"), ("UR10e", "camera2")]
            .into_iter()
            .map(|(robot, cam)| (robot.to_string(), cam.to_string()))
            .collect();
        let rois = [
            ("camera1", Roi::new(0.2, 0.4, 0.6, 0.6)),
            ("camera2", Roi::new(0.2, 0.4, 0.6, 0.6)),
            ("camera3", Roi::new(0.3, 0.3, 0.4, 0.7)),
        ]
        .into_iter()
        .map(|(cam, roi)| (cam.to_string(), roi))
        .collect();
        Self {
            process_every_n_frames: 3,
            cooldown: 10.0,
            vision: VisionConfig::default(),
            camera_map,
            rois,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public types
// ─────────────────────────────────────────────────────────────────────────────

/// Event source consumed by the cycle controller.
pub trait FallenObjectMonitor {
    /// Return `true` iff a new fallen-object event fires on this call.
    fn poll(&mut self, now: f64) -> bool;

    /// Clear the fired flag so the next detection can raise a fresh event.
    fn reset(&mut self);
}

/// A camera and the region of the belt it watches.
pub struct CameraBinding {
    camera: Box<dyn Camera>,
    roi: Option<Roi>,
}

impl CameraBinding {
    /// Bind `camera` to `roi`; `None` searches the whole frame.
    pub fn new(camera: Box<dyn Camera>, roi: Option<Roi>) -> Self {
        Self { camera, roi }
    }

    pub fn id(&self) -> &str {
        self.camera.id()
    }

    pub fn roi(&self) -> Option<&Roi> {
        self.roi.as_ref()
    }
}

/// Result of visiting one camera during a processed poll.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraOutcome {
    /// A fallen object is in view.
    Fallen,
    /// Frame processed, nothing found.
    Clear,
    /// The camera delivered no frame this tick.
    NoFrame,
    /// Acquisition or processing failed; the camera is skipped this tick.
    Faulted(RigError),
}

/// Detector bookkeeping.  Only the detector mutates it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorState {
    fallen: bool,
    last_event_time: f64,
    frame_counter: u64,
}

impl DetectorState {
    /// `true` from an event until the next reset.
    pub fn is_fallen(&self) -> bool {
        self.fallen
    }

    /// Time of the most recent event (0 before any).
    pub fn last_event_time(&self) -> f64 {
        self.last_event_time
    }

    /// Number of polls so far.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FallenObjectDetector
// ─────────────────────────────────────────────────────────────────────────────

/// Watches the belt through bound cameras and raises fallen-object events.
pub struct FallenObjectDetector {
    bindings: Vec<CameraBinding>,
    config: DetectorConfig,
    state: DetectorState,
}

impl FallenObjectDetector {
    /// Detector over explicit bindings.
    pub fn new(bindings: Vec<CameraBinding>, config: DetectorConfig) -> Self {
        Self {
            bindings,
            config,
            state: DetectorState::default(),
        }
    }

    /// Resolve the camera assigned to `robot_name` from `registry`, enable it
    /// at `period_ms`, and bind it to its configured ROI.
    ///
    /// An unknown robot or an absent camera yields a detector with no
    /// cameras, which never fires.
    pub fn from_registry(
        robot_name: &str,
        registry: &mut DeviceRegistry,
        config: DetectorConfig,
        period_ms: u32,
    ) -> Self {
        let mut bindings = Vec::new();
        match config.camera_map.get(robot_name) {
            Some(camera_name) => {
                if let Some(mut camera) = registry.take_camera(camera_name) {
                    camera.enable(period_ms);
                    let roi = config.rois.get(camera_name).copied();
                    info!(robot = robot_name, camera = %camera_name, ?roi, "camera active");
                    bindings.push(CameraBinding::new(camera, roi));
                }
            }
            None => warn!(robot = robot_name, "no camera mapped for robot"),
        }
        info!(cameras = bindings.len(), "fallen-object detector ready");
        Self::new(bindings, config)
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn camera_count(&self) -> usize {
        self.bindings.len()
    }

    fn in_cooldown(&self, now: f64) -> bool {
        self.state.fallen && now - self.state.last_event_time < self.config.cooldown
    }

    fn raise(&mut self, camera: &str, now: f64) {
        self.state.fallen = true;
        self.state.last_event_time = now;
        let wall = chrono::Local::now().format("%H:%M:%S");
        warn!(
            camera,
            at = %wall,
            tick_time = now,
            "FALLEN OBJECT on belt; arm moving to avoidance pose"
        );
    }
}

impl FallenObjectMonitor for FallenObjectDetector {
    fn poll(&mut self, now: f64) -> bool {
        self.state.frame_counter += 1;
        let every = u64::from(self.config.process_every_n_frames.max(1));
        if self.state.frame_counter % every != 0 {
            return false;
        }
        if self.in_cooldown(now) {
            debug!(now, "detector in cooldown");
            return false;
        }

        let vision = &self.config.vision;
        let mut fired = None;
        for binding in &mut self.bindings {
            match inspect(binding, vision) {
                CameraOutcome::Fallen => {
                    fired = Some(binding.id().to_string());
                    break;
                }
                CameraOutcome::Clear => debug!(camera = binding.id(), "belt clear"),
                CameraOutcome::NoFrame => debug!(camera = binding.id(), "no frame this tick"),
                CameraOutcome::Faulted(e) => {
                    warn!(camera = binding.id(), error = %e, "camera skipped this tick")
                }
            }
        }

        match fired {
            Some(camera) if !self.state.fallen => {
                self.raise(&camera, now);
                true
            }
            _ => false,
        }
    }

    fn reset(&mut self) {
        if self.state.fallen {
            debug!("detector reset");
        }
        self.state.fallen = false;
    }
}

/// Run the full pipeline for one camera.
pub fn inspect(binding: &mut CameraBinding, vision: &VisionConfig) -> CameraOutcome {
    let frame = match binding.camera.capture() {
        Ok(Some(frame)) => frame,
        Ok(None) => return CameraOutcome::NoFrame,
        Err(e) => return CameraOutcome::Faulted(e),
    };
    match analyze_frame(binding.camera.id(), &frame, binding.roi.as_ref(), vision) {
        Ok(true) => CameraOutcome::Fallen,
        Ok(false) => CameraOutcome::Clear,
        Err(e) => CameraOutcome::Faulted(e),
    }
}

/// Decide whether `frame` shows a fallen object inside `roi`.
///
/// # Errors
///
/// [`RigError::FrameAcquisition`] for a malformed buffer and
/// [`RigError::Vision`] when the ROI resolves to an empty region.
pub fn analyze_frame(
    camera: &str,
    frame: &CameraFrame,
    roi: Option<&Roi>,
    vision: &VisionConfig,
) -> Result<bool, RigError> {
    frame.validate(camera)?;
    let image = RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or_else(
        || RigError::FrameAcquisition {
            camera: camera.to_string(),
            details: "buffer does not fit frame dimensions".to_string(),
        },
    )?;

    let (region, rect) = crop(&image, roi);
    if rect.is_empty() {
        return Err(RigError::Vision {
            camera: camera.to_string(),
            details: format!("region of interest {roi:?} is empty on {}x{}", frame.width, frame.height),
        });
    }

    let mask = red_mask(
        &region,
        (vision.working_width, vision.working_height),
        &vision.red_bands,
        vision.closing_radius,
    );
    Ok(find_fallen(&mask, vision.min_contour_area, vision.fallen_aspect_ratio).is_some())
}
