//! Motion signals derived from the tracked skeleton.
//!
//! - Orientation: facing angle from joint pairs, rate-limited to a maximum
//!   angular velocity
//! - Walk speed: planar foot displacement between frames, rate-limited to a
//!   maximum acceleration

pub mod orientation;
pub mod walk_speed;

pub use orientation::{
    Heading, MAX_ANGULAR_VELOCITY_DEG_S, RotationEstimate, aggregate_rotations, reduce_angle,
    rotation_for_user, rotation_from_joints,
};
pub use walk_speed::{
    MAX_ACCELERATION_CM_S2, MIN_COMPUTED_WALK_SPEED, WalkSpeedEstimate, frames_without_move,
    walk_speed_for_user,
};

/// Sentinel used for rotations and speeds that could not be computed.
pub const UNKNOWN: i32 = -1;
