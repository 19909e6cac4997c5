//! Per-frame output of the pipeline.
//!
//! These types describe what gets published for a single frame:
//! - the tracked user with its rotation and walk speed
//! - the slot reserved for a second sensor's user
//! - the raw depth map

use crate::motion::UNKNOWN;
use crate::skeleton::User;

/// Everything published to the info region for one frame.
///
/// Depth maps are published separately (see `DepthMaps`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraInformations {
    pub user: User,

    /// Whether a second sensor contributes to this frame.
    pub has_second_view: bool,
    pub second_user: User,
    pub second_rotation_projected: i32,
    pub average_rotation: i32,
    pub average_walk_speed: i32,

    /// Set on the sentinel value published before any frame is available.
    pub invalid: bool,
}

impl CameraInformations {
    pub fn new(user: User) -> Self {
        Self {
            user,
            ..Self::default()
        }
    }

    /// The "not yet available" sentinel.
    pub fn invalid() -> Self {
        Self {
            invalid: true,
            ..Self::default()
        }
    }
}

impl Default for CameraInformations {
    fn default() -> Self {
        Self {
            user: User::untracked(),
            has_second_view: false,
            second_user: User::untracked(),
            second_rotation_projected: UNKNOWN,
            average_rotation: UNKNOWN,
            average_walk_speed: UNKNOWN,
            invalid: false,
        }
    }
}

/// Depth samples of one frame, in millimetres.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DepthMaps {
    pub depth: Vec<u16>,
    /// Only set when a second sensor contributes.
    pub second_depth: Option<Vec<u16>>,
    pub invalid: bool,
}

impl DepthMaps {
    pub fn from_depth(depth: &[u16]) -> Self {
        Self {
            depth: depth.to_vec(),
            second_depth: None,
            invalid: false,
        }
    }

    /// The "not yet available" sentinel.
    pub fn invalid() -> Self {
        Self {
            invalid: true,
            ..Self::default()
        }
    }
}

/// Result of assembling one frame.
pub struct AssembledFrame {
    pub info: CameraInformations,
    pub depth: DepthMaps,
    /// Time spent sampling joints and running the estimators.
    pub elapsed_ms: f64,
}
