//! `pickplace-types` – shared vocabulary for the pick-and-place stack.
//!
//! Every crate in the workspace speaks in terms of these types: the
//! [`CycleState`] owned by the cycle controller, the [`MotionCommand`]s it
//! emits, and the [`RigError`] returned by hardware drivers and the vision
//! pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Phase of the pick-and-place cycle.
///
/// The normal cycle walks `Waiting → Grasping → Rotating → Releasing →
/// RotatingBack → Waiting`.  `Avoiding` is an override that can only be
/// entered from `Waiting` and always returns to `Waiting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    /// Idle, watching the distance sensor for an incoming object.
    #[default]
    Waiting,
    /// Gripper closed; arm about to swing to the carry pose.
    Grasping,
    /// Arm travelling towards the drop point.
    Rotating,
    /// Gripper opened; arm about to return to zero.
    Releasing,
    /// Arm travelling back to the pick position.
    RotatingBack,
    /// Arm held clear of the belt after a fallen object was seen.
    Avoiding,
}

impl CycleState {
    /// All states, in cycle order.
    pub const ALL: [CycleState; 6] = [
        CycleState::Waiting,
        CycleState::Grasping,
        CycleState::Rotating,
        CycleState::Releasing,
        CycleState::RotatingBack,
        CycleState::Avoiding,
    ];

    /// Stable lowercase label used in logs and summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleState::Waiting => "waiting",
            CycleState::Grasping => "grasping",
            CycleState::Rotating => "rotating",
            CycleState::Releasing => "releasing",
            CycleState::RotatingBack => "rotating_back",
            CycleState::Avoiding => "avoiding",
        }
    }

    /// Return `true` when `self → next` is an edge of the cycle graph.
    ///
    /// Staying in the same state is not a transition and returns `false`.
    pub fn can_transition_to(&self, next: CycleState) -> bool {
        matches!(
            (self, next),
            (CycleState::Waiting, CycleState::Grasping)
                | (CycleState::Grasping, CycleState::Rotating)
                | (CycleState::Rotating, CycleState::Releasing)
                | (CycleState::Releasing, CycleState::RotatingBack)
                | (CycleState::RotatingBack, CycleState::Waiting)
                | (CycleState::Waiting, CycleState::Avoiding)
                | (CycleState::Avoiding, CycleState::Waiting)
        )
    }
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An actuation request produced by the cycle controller.
///
/// The controller never holds device handles; the rig that owns the motors
/// applies these commands and silently skips any device that is not bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "snake_case")]
pub enum MotionCommand {
    /// Drive every finger joint to the same position.
    SetGripper(f64),
    /// Drive the arm joints to positional targets, index-aligned with the
    /// rig's ordered joint list.  Extra targets or unbound joints are skipped.
    SetArm(Vec<f64>),
}

/// Error type shared by the hardware layer and the vision pipeline.
///
/// None of these are fatal to the control loop: callers log them and carry
/// on with the next device or the next tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RigError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Frame acquisition failed on {camera}: {details}")]
    FrameAcquisition { camera: String, details: String },

    #[error("Vision processing failed on {camera}: {details}")]
    Vision { camera: String, details: String },

    #[error("Configuration Error: {0}")]
    Config(String),
}
