//! Joint identifiers and the per-joint sample.

use nalgebra::Vector3;
use serde::Deserialize;

/// Minimum confidence for a joint position to be used in geometry.
pub const MIN_JOINT_CONFIDENCE: f32 = 0.6;

/// Skeletal joint identifiers of the full skeleton profile.
///
/// Discriminants follow the tracking driver's numbering and are what gets
/// written into the shared info region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum JointKind {
    Head = 1,
    Neck = 2,
    Torso = 3,
    Waist = 4,
    LeftCollar = 5,
    LeftShoulder = 6,
    LeftElbow = 7,
    LeftWrist = 8,
    LeftHand = 9,
    LeftFingertip = 10,
    RightCollar = 11,
    RightShoulder = 12,
    RightElbow = 13,
    RightWrist = 14,
    RightHand = 15,
    RightFingertip = 16,
    LeftHip = 17,
    LeftKnee = 18,
    LeftAnkle = 19,
    LeftFoot = 20,
    RightHip = 21,
    RightKnee = 22,
    RightAnkle = 23,
    RightFoot = 24,
}

impl JointKind {
    /// Wire code of the joint, 1 (head) to 24 (right foot).
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Inverse of `as_u8`; `None` for codes outside 1..=24.
    pub fn from_u8(value: u8) -> Option<Self> {
        use JointKind::*;
        let kind = match value {
            1 => Head,
            2 => Neck,
            3 => Torso,
            4 => Waist,
            5 => LeftCollar,
            6 => LeftShoulder,
            7 => LeftElbow,
            8 => LeftWrist,
            9 => LeftHand,
            10 => LeftFingertip,
            11 => RightCollar,
            12 => RightShoulder,
            13 => RightElbow,
            14 => RightWrist,
            15 => RightHand,
            16 => RightFingertip,
            17 => LeftHip,
            18 => LeftKnee,
            19 => LeftAnkle,
            20 => LeftFoot,
            21 => RightHip,
            22 => RightKnee,
            23 => RightAnkle,
            24 => RightFoot,
            _ => return None,
        };
        Some(kind)
    }
}

/// Side of the body a `BodyPart` describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodySide {
    Left,
    Right,
}

impl BodySide {
    /// Joint kinds of this side in `BodyPart` order: hip, knee, foot, shoulder.
    pub fn joint_kinds(self) -> [JointKind; 4] {
        match self {
            BodySide::Left => [
                JointKind::LeftHip,
                JointKind::LeftKnee,
                JointKind::LeftFoot,
                JointKind::LeftShoulder,
            ],
            BodySide::Right => [
                JointKind::RightHip,
                JointKind::RightKnee,
                JointKind::RightFoot,
                JointKind::RightShoulder,
            ],
        }
    }
}

/// One tracked joint for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    pub kind: JointKind,
    /// Whether the driver reports this joint as part of the active profile.
    pub is_active: bool,
    /// Real-world position in millimetres.
    pub position: Vector3<f32>,
    /// Driver confidence, normally in [0, 1].
    pub confidence: f32,
    /// Position projected into depth-image coordinates (x, y in pixels, z in mm).
    pub projective: Vector3<f32>,
}

impl Joint {
    /// A joint carrying no signal.
    pub fn inactive(kind: JointKind) -> Self {
        Self {
            kind,
            is_active: false,
            position: Vector3::zeros(),
            confidence: 0.0,
            projective: Vector3::zeros(),
        }
    }

    /// An active joint at `position` with the given confidence.
    pub fn tracked(kind: JointKind, position: Vector3<f32>, confidence: f32) -> Self {
        Self {
            kind,
            is_active: true,
            position,
            confidence,
            projective: Vector3::zeros(),
        }
    }

    pub fn is_acceptable(&self) -> bool {
        is_acceptable(self)
    }
}

/// A joint may be used in geometry only when it is active and confident enough.
pub fn is_acceptable(joint: &Joint) -> bool {
    joint.is_active && joint.confidence >= MIN_JOINT_CONFIDENCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acceptable_at_threshold() {
        let joint = Joint::tracked(JointKind::Torso, Vector3::zeros(), 0.6);
        assert!(is_acceptable(&joint));

        let joint = Joint::tracked(JointKind::Torso, Vector3::zeros(), 1.0);
        assert!(joint.is_acceptable());
    }

    #[test]
    fn test_rejected_below_threshold() {
        let joint = Joint::tracked(JointKind::LeftHip, Vector3::zeros(), 0.59);
        assert!(!is_acceptable(&joint));

        let joint = Joint::tracked(JointKind::LeftHip, Vector3::zeros(), 0.0);
        assert!(!is_acceptable(&joint));
    }

    #[test]
    fn test_inactive_never_acceptable() {
        let mut joint = Joint::inactive(JointKind::RightFoot);
        joint.confidence = 1.0;
        assert!(!is_acceptable(&joint));
    }

    #[test]
    fn test_joint_kind_code() {
        for code in 1..=24u8 {
            assert_eq!(JointKind::from_u8(code).map(JointKind::as_u8), Some(code));
        }
        assert_eq!(JointKind::from_u8(0), None);
        assert_eq!(JointKind::from_u8(25), None);
    }

    #[test]
    fn test_side_joint_kinds() {
        let [hip, _, foot, shoulder] = BodySide::Right.joint_kinds();
        assert_eq!(hip, JointKind::RightHip);
        assert_eq!(foot, JointKind::RightFoot);
        assert_eq!(shoulder, JointKind::RightShoulder);
    }
}
