//! Walk-speed estimation from foot displacement between two frames.

use crate::skeleton::{Joint, User, is_acceptable};

use super::UNKNOWN;

/// Maximum change of the published speed, in cm/s per second.
pub const MAX_ACCELERATION_CM_S2: f32 = 100.0;

/// Speeds at or below this value (cm/s) count as "not moving".
pub const MIN_COMPUTED_WALK_SPEED: i32 = 40;

/// Walk speed for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkSpeedEstimate {
    /// Speed in cm/s.
    pub speed: i32,
    /// Product of the four foot confidences, each offset by one.
    pub confidence: f32,
}

/// Estimate the user's walk speed from the displacement of both feet since
/// the previous frame.
///
/// Returns `None` when any of the four feet (current and previous, left and
/// right) is not acceptable, or when no time elapsed between the frames.
///
/// # Arguments
/// * `frequency` - Sensor frame rate in frames per second
/// * `user` - Current frame, with `previous_left`/`previous_right` filled in
/// * `previous_timestamp_ms` - Timestamp of the previous frame
/// * `previous_speed` - Speed published for the previous frame, -1 if unknown
pub fn walk_speed_for_user(
    frequency: u32,
    user: &User,
    previous_timestamp_ms: i64,
    previous_speed: i32,
) -> Option<WalkSpeedEstimate> {
    let feet = [
        &user.right.foot,
        &user.previous_right.foot,
        &user.left.foot,
        &user.previous_left.foot,
    ];
    if !feet.iter().all(|foot| is_acceptable(foot)) {
        return None;
    }

    let elapsed_ms = user.timestamp_ms - previous_timestamp_ms;
    if elapsed_ms <= 0 {
        return None;
    }

    let right_mm = planar_displacement(&user.previous_right.foot, &user.right.foot);
    let left_mm = planar_displacement(&user.previous_left.foot, &user.left.foot);
    let average_mm = (right_mm + left_mm) / 2.0;

    // mm -> cm and ms -> s
    let mut speed = ((average_mm as f64 * 0.1) / (elapsed_ms as f64 * 0.001)) as i32;

    if previous_speed != UNKNOWN {
        let margin = (MAX_ACCELERATION_CM_S2 / frequency as f32) as i32;
        if (speed - previous_speed).abs() > margin {
            speed = if speed < previous_speed {
                previous_speed - margin
            } else {
                previous_speed + margin
            };
        }
    }

    let confidence = feet.iter().map(|foot| foot.confidence + 1.0).product();

    Some(WalkSpeedEstimate { speed, confidence })
}

/// Next value of the no-movement counter, given the previous frame's speed
/// and counter.
pub fn frames_without_move(previous_speed: i32, previous_count: i32) -> i32 {
    if previous_speed != UNKNOWN && previous_speed <= MIN_COMPUTED_WALK_SPEED {
        previous_count + 1
    } else {
        0
    }
}

/// Distance travelled in the horizontal X/Z plane, in millimetres.
fn planar_displacement(from: &Joint, to: &Joint) -> f32 {
    let dx = from.position.x - to.position.x;
    let dz = from.position.z - to.position.z;
    (dx * dx + dz * dz).sqrt()
}
