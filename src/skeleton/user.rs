//! Per-frame user snapshot.

use super::joint::{BodySide, Joint, JointKind};

/// Identifier the tracking driver assigns to a detected user.
///
/// `UserId(0)` means "nobody": it is what an untracked frame publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UserId(pub u32);

impl UserId {
    pub const NONE: UserId = UserId(0);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "U{}", self.0)
    }
}

/// The joints of one body side used by the estimators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPart {
    pub hip: Joint,
    pub knee: Joint,
    pub foot: Joint,
    pub shoulder: Joint,
}

impl BodyPart {
    /// A body part with every joint inactive.
    pub fn new(side: BodySide) -> Self {
        let [hip, knee, foot, shoulder] = side.joint_kinds();
        Self {
            hip: Joint::inactive(hip),
            knee: Joint::inactive(knee),
            foot: Joint::inactive(foot),
            shoulder: Joint::inactive(shoulder),
        }
    }

    pub fn joints(&self) -> [&Joint; 4] {
        [&self.hip, &self.knee, &self.foot, &self.shoulder]
    }
}

/// Everything known about the tracked user for one frame.
///
/// A new value is built each frame. `previous_left`/`previous_right` are
/// copies of the prior frame's parts so the walk-speed estimator can compare
/// feet without keeping any long-lived state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct User {
    pub id: UserId,
    pub is_tracking: bool,

    /// Milliseconds since the UNIX epoch when this frame was sampled.
    pub timestamp_ms: i64,

    pub torso: Joint,

    pub left: BodyPart,
    pub right: BodyPart,

    pub previous_left: BodyPart,
    pub previous_right: BodyPart,

    /// Facing angle in degrees, [0, 360), or -1 when unknown.
    pub rotation: i32,
    /// Product of the hip confidences offset by one; roughly 2.56..4 when tracked.
    pub rotation_confidence: f32,

    /// Walk speed in cm/s, or -1 when unknown.
    pub walk_speed: i32,
    /// Product of the four foot confidences offset by one; roughly 6.55..16.
    pub walk_speed_confidence: f32,

    /// Consecutive frames whose speed stayed under the movement threshold.
    pub frames_without_move: i32,
}

impl User {
    /// The value published when no user is tracked.
    pub fn untracked() -> Self {
        Self {
            id: UserId::NONE,
            is_tracking: false,
            timestamp_ms: 0,
            torso: Joint::inactive(JointKind::Torso),
            left: BodyPart::new(BodySide::Left),
            right: BodyPart::new(BodySide::Right),
            previous_left: BodyPart::new(BodySide::Left),
            previous_right: BodyPart::new(BodySide::Right),
            rotation: -1,
            rotation_confidence: -1.0,
            walk_speed: -1,
            walk_speed_confidence: -1.0,
            frames_without_move: 0,
        }
    }

    /// A tracked user with no joints sampled yet.
    pub fn tracked(id: UserId, timestamp_ms: i64) -> Self {
        Self {
            id,
            is_tracking: true,
            timestamp_ms,
            ..Self::untracked()
        }
    }

    pub fn part_mut(&mut self, side: BodySide) -> &mut BodyPart {
        match side {
            BodySide::Left => &mut self.left,
            BodySide::Right => &mut self.right,
        }
    }
}

impl Default for User {
    fn default() -> Self {
        Self::untracked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untracked_user_sentinels() {
        let user = User::untracked();
        assert_eq!(user.id, UserId::NONE);
        assert!(!user.is_tracking);
        assert_eq!(user.rotation, -1);
        assert_eq!(user.walk_speed, -1);
        assert_eq!(user.rotation_confidence, -1.0);
        assert_eq!(user.frames_without_move, 0);
    }

    #[test]
    fn test_body_part_kinds() {
        let part = BodyPart::new(BodySide::Left);
        assert_eq!(part.hip.kind, JointKind::LeftHip);
        assert_eq!(part.knee.kind, JointKind::LeftKnee);
        assert_eq!(part.foot.kind, JointKind::LeftFoot);
        assert_eq!(part.shoulder.kind, JointKind::LeftShoulder);
        assert!(part.joints().iter().all(|j| !j.is_active));
    }

    #[test]
    fn test_user_id_display() {
        assert_eq!(format!("{}", UserId::new(3)), "U3");
        assert!(UserId::default().is_none());
    }
}
