//! Facing-angle estimation from pairs of joints.
//!
//! The angle is measured in the horizontal X/Z plane between a "right" and a
//! "left" joint. 0° means the right joint lies straight along +X from the
//! left one; angles grow towards +Z.

use crate::skeleton::{Joint, User, is_acceptable};

use super::UNKNOWN;

/// Maximum angular velocity of the published rotation, in degrees per second.
pub const MAX_ANGULAR_VELOCITY_DEG_S: f32 = 55.0;

/// Rotation for one joint pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationEstimate {
    /// Degrees in [0, 360), or -1 when unknown.
    pub rotation: f32,
    /// `(left + 1) * (right + 1)` of the joint confidences, or -1 when unknown.
    pub confidence: f32,
}

impl RotationEstimate {
    pub const UNKNOWN: RotationEstimate = RotationEstimate {
        rotation: -1.0,
        confidence: -1.0,
    };

    /// True when both joints were usable and did not coincide.
    pub fn is_known(&self) -> bool {
        self.rotation >= 0.0
    }
}

/// Bring an angle that is at most one turn out of range back into [0, 360).
pub fn reduce_angle(angle: f32) -> f32 {
    if angle >= 360.0 {
        angle - 360.0
    } else if angle < 0.0 {
        360.0 + angle
    } else {
        angle
    }
}

/// Estimate the facing angle from two joints, rate-limited against the
/// previous frame's rotation.
///
/// # Arguments
/// * `frequency` - Sensor frame rate in frames per second
/// * `right` - Joint on the right side of the body (or the torso)
/// * `left` - Joint on the left side of the body (or the torso)
/// * `previous_rotation` - Rotation published for the previous frame, if any
pub fn rotation_from_joints(
    frequency: u32,
    right: &Joint,
    left: &Joint,
    previous_rotation: Option<f32>,
) -> RotationEstimate {
    if !is_acceptable(right) || !is_acceptable(left) {
        return RotationEstimate::UNKNOWN;
    }

    let Some(raw) = raw_rotation(right, left) else {
        return RotationEstimate::UNKNOWN;
    };

    let rotation = match previous_rotation {
        Some(previous) => smooth_rotation(frequency, raw, previous),
        None => raw,
    };

    RotationEstimate {
        rotation,
        confidence: (left.confidence + 1.0) * (right.confidence + 1.0),
    }
}

/// Unsmoothed angle between the two joints, `None` when they coincide in X/Z.
fn raw_rotation(right: &Joint, left: &Joint) -> Option<f32> {
    let r = &right.position;
    let l = &left.position;

    if r.x == l.x && r.z == l.z {
        return None;
    }

    let angle = ((r.z - l.z).abs() / (r.x - l.x).abs()).atan().to_degrees();

    let rotation = if r.z == l.z && r.x > l.x {
        0.0
    } else if r.x == l.x && r.z > l.z {
        90.0
    } else if r.z == l.z && r.x < l.x {
        180.0
    } else if r.x == l.x && r.z < l.z {
        // Reported as 90, not 270. Consumers depend on the published value.
        90.0
    } else if r.z < l.z {
        if r.x > l.x { angle } else { 180.0 - angle }
    } else if r.x < l.x {
        180.0 + angle
    } else {
        360.0 - angle
    };

    Some(rotation)
}

/// Limit the change from `previous` to `MAX_ANGULAR_VELOCITY_DEG_S / frequency`,
/// treating 0° and 360° as neighbours.
fn smooth_rotation(frequency: u32, rotation: f32, previous: f32) -> f32 {
    let mut rotation = rotation;
    let mut previous = previous;

    if (rotation - previous).abs() > 180.0 {
        if rotation < previous {
            rotation += 360.0;
        } else {
            previous += 360.0;
        }
    }

    let margin = MAX_ANGULAR_VELOCITY_DEG_S / frequency as f32;
    let diff = rotation - previous;
    if diff.abs() > margin {
        rotation = if diff > 0.0 {
            previous + margin
        } else {
            previous - margin
        };
    }

    reduce_angle(rotation)
}

/// Combine per-pair rotations (degrees, -1 = unknown) into one.
///
/// Angles above 180° are averaged as their negative equivalent so values on
/// both sides of 0° do not cancel out to 180°. Returns -1 when every pair is
/// unknown.
pub fn aggregate_rotations(rotations: &[f32]) -> f32 {
    let (sum, count) = rotations
        .iter()
        .filter(|&&r| r >= 0.0)
        .fold((0.0f32, 0u32), |(sum, count), &r| {
            let signed = if r > 180.0 { r - 360.0 } else { r };
            (sum + signed, count + 1)
        });

    if count == 0 {
        return -1.0;
    }

    reduce_angle(sum / count as f32)
}

/// Rotation state carried from one frame to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heading {
    /// Rate-limited rotation in [0, 360), kept below whole-degree resolution.
    pub exact: f32,
    /// Whole degrees published for the frame.
    pub published: i32,
}

/// Signed shortest turn from `from` to `to`, in (-180, 180].
fn circular_offset(to: f32, from: f32) -> f32 {
    let d = (to - from).rem_euclid(360.0);
    if d > 180.0 { d - 360.0 } else { d }
}

/// Move the published whole degree towards `exact`.
///
/// Steps never exceed `floor(55 / f)` degrees, or one degree once that
/// margin drops below one. The sub-degree remainder stays in `exact`.
fn publish_step(frequency: u32, published: i32, exact: f32) -> i32 {
    let margin = MAX_ANGULAR_VELOCITY_DEG_S / frequency as f32;
    let limit = (margin.floor() as i32).max(1);
    let step = (circular_offset(exact, published as f32).round() as i32).clamp(-limit, limit);
    (published + step).rem_euclid(360)
}

/// Compute `user.rotation` and `user.rotation_confidence` from four joint pairs.
///
/// Pairs: right hip/left hip, right hip/torso, torso/left hip and right
/// shoulder/left shoulder. Only the hip pair's confidence is kept. With a
/// previous heading the pairs are averaged as offsets from it, so the mean
/// stays inside the per-frame margin.
///
/// Returns the heading to pass in on the next frame, `None` when the
/// rotation is unknown.
pub fn rotation_for_user(
    frequency: u32,
    previous: Option<Heading>,
    user: &mut User,
) -> Option<Heading> {
    let previous_exact = previous.map(|h| h.exact);

    let pairs = [
        rotation_from_joints(frequency, &user.right.hip, &user.left.hip, previous_exact),
        rotation_from_joints(frequency, &user.right.hip, &user.torso, previous_exact),
        rotation_from_joints(frequency, &user.torso, &user.left.hip, previous_exact),
        rotation_from_joints(frequency, &user.right.shoulder, &user.left.shoulder, previous_exact),
    ];
    user.rotation_confidence = pairs[0].confidence;

    let known: Vec<f32> = pairs
        .iter()
        .filter(|p| p.is_known())
        .map(|p| p.rotation)
        .collect();
    if known.is_empty() {
        user.rotation = UNKNOWN;
        return None;
    }

    let heading = match previous {
        Some(prev) => {
            let mean = known
                .iter()
                .map(|&r| circular_offset(r, prev.exact))
                .sum::<f32>()
                / known.len() as f32;
            let exact = reduce_angle(prev.exact + mean);
            Heading {
                exact,
                published: publish_step(frequency, prev.published, exact),
            }
        }
        None => {
            let exact = aggregate_rotations(&known);
            Heading {
                exact,
                published: (exact.round() as i32).rem_euclid(360),
            }
        }
    };

    user.rotation = heading.published;
    Some(heading)
}
