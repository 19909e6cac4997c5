//! Fixed binary layout of the published records.
//!
//! All values are little-endian. Offsets never depend on content, so a
//! consumer can map the region and read fields directly.
//!
//! ```text
//! Joint (32 bytes)
//!   0   u8      kind
//!   1   u8      active
//!   2   2       padding
//!   4   f32x3   position (mm)
//!   16  f32     confidence
//!   20  f32x3   projective position
//!
//! BodyPart (128 bytes): hip, knee, foot, shoulder
//!
//! User (584 bytes)
//!   0   u32     id
//!   4   u8      is_tracking (+3 padding)
//!   8   i64     timestamp_ms
//!   16  Joint   torso
//!   48  BodyPart x4  left, right, previous_left, previous_right
//!   560 i32     rotation
//!   564 f32     rotation_confidence
//!   568 i32     walk_speed
//!   572 f32     walk_speed_confidence
//!   576 i32     frames_without_move (+4 padding)
//!
//! CameraInformations (1188 bytes)
//!   0    User   user
//!   584  u8     has_second_view (+3 padding)
//!   588  User   second_user
//!   1172 i32    second_rotation_projected
//!   1176 i32    average_rotation
//!   1180 i32    average_walk_speed
//!   1184 u8     invalid (+3 padding)
//! ```

use byteorder::{ByteOrder, LittleEndian};
use nalgebra::Vector3;
use thiserror::Error;

use crate::sensor::DEPTH_MAP_LENGTH;
use crate::skeleton::{BodyPart, Joint, JointKind, User, UserId};
use crate::tracking::CameraInformations;

pub const JOINT_LEN: usize = 32;
pub const BODY_PART_LEN: usize = 4 * JOINT_LEN;
pub const USER_LEN: usize = 16 + JOINT_LEN + 4 * BODY_PART_LEN + 24;
pub const CAMERA_INFO_LEN: usize = USER_LEN + 4 + USER_LEN + 12 + 4;
pub const DEPTH_LEN: usize = DEPTH_MAP_LENGTH * 2;

/// Errors raised while encoding or decoding a record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall { needed: usize, got: usize },

    #[error("Invalid joint kind {value} at offset {offset}")]
    InvalidJointKind { offset: usize, value: u8 },

    #[error("Depth map has {got} samples, expected {expected}")]
    DepthLength { expected: usize, got: usize },
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn u8(&mut self, v: u8) {
        self.buf[self.pos] = v;
        self.pos += 1;
    }

    fn flag(&mut self, v: bool, padding: usize) {
        self.u8(v as u8);
        self.pad(padding);
    }

    fn pad(&mut self, n: usize) {
        self.buf[self.pos..self.pos + n].fill(0);
        self.pos += n;
    }

    fn u32(&mut self, v: u32) {
        LittleEndian::write_u32(&mut self.buf[self.pos..], v);
        self.pos += 4;
    }

    fn i32(&mut self, v: i32) {
        LittleEndian::write_i32(&mut self.buf[self.pos..], v);
        self.pos += 4;
    }

    fn i64(&mut self, v: i64) {
        LittleEndian::write_i64(&mut self.buf[self.pos..], v);
        self.pos += 8;
    }

    fn f32(&mut self, v: f32) {
        LittleEndian::write_f32(&mut self.buf[self.pos..], v);
        self.pos += 4;
    }

    fn vec3(&mut self, v: &Vector3<f32>) {
        self.f32(v.x);
        self.f32(v.y);
        self.f32(v.z);
    }

    fn joint(&mut self, joint: &Joint) {
        self.u8(joint.kind.as_u8());
        self.flag(joint.is_active, 2);
        self.vec3(&joint.position);
        self.f32(joint.confidence);
        self.vec3(&joint.projective);
    }

    fn body_part(&mut self, part: &BodyPart) {
        for joint in part.joints() {
            self.joint(joint);
        }
    }

    fn user(&mut self, user: &User) {
        self.u32(user.id.0);
        self.flag(user.is_tracking, 3);
        self.i64(user.timestamp_ms);
        self.joint(&user.torso);
        self.body_part(&user.left);
        self.body_part(&user.right);
        self.body_part(&user.previous_left);
        self.body_part(&user.previous_right);
        self.i32(user.rotation);
        self.f32(user.rotation_confidence);
        self.i32(user.walk_speed);
        self.f32(user.walk_speed_confidence);
        self.i32(user.frames_without_move);
        self.pad(4);
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn u8(&mut self) -> u8 {
        let v = self.buf[self.pos];
        self.pos += 1;
        v
    }

    fn flag(&mut self, padding: usize) -> bool {
        let v = self.u8() != 0;
        self.pos += padding;
        v
    }

    fn u32(&mut self) -> u32 {
        let v = LittleEndian::read_u32(&self.buf[self.pos..]);
        self.pos += 4;
        v
    }

    fn i32(&mut self) -> i32 {
        let v = LittleEndian::read_i32(&self.buf[self.pos..]);
        self.pos += 4;
        v
    }

    fn i64(&mut self) -> i64 {
        let v = LittleEndian::read_i64(&self.buf[self.pos..]);
        self.pos += 8;
        v
    }

    fn f32(&mut self) -> f32 {
        let v = LittleEndian::read_f32(&self.buf[self.pos..]);
        self.pos += 4;
        v
    }

    fn vec3(&mut self) -> Vector3<f32> {
        let x = self.f32();
        let y = self.f32();
        let z = self.f32();
        Vector3::new(x, y, z)
    }

    fn joint(&mut self) -> Result<Joint, LayoutError> {
        let offset = self.pos;
        let value = self.u8();
        let kind = JointKind::from_u8(value).ok_or(LayoutError::InvalidJointKind { offset, value })?;
        let is_active = self.flag(2);
        let position = self.vec3();
        let confidence = self.f32();
        let projective = self.vec3();
        Ok(Joint {
            kind,
            is_active,
            position,
            confidence,
            projective,
        })
    }

    fn body_part(&mut self) -> Result<BodyPart, LayoutError> {
        Ok(BodyPart {
            hip: self.joint()?,
            knee: self.joint()?,
            foot: self.joint()?,
            shoulder: self.joint()?,
        })
    }

    fn user(&mut self) -> Result<User, LayoutError> {
        let id = UserId(self.u32());
        let is_tracking = self.flag(3);
        let timestamp_ms = self.i64();
        let torso = self.joint()?;
        let left = self.body_part()?;
        let right = self.body_part()?;
        let previous_left = self.body_part()?;
        let previous_right = self.body_part()?;
        let user = User {
            id,
            is_tracking,
            timestamp_ms,
            torso,
            left,
            right,
            previous_left,
            previous_right,
            rotation: self.i32(),
            rotation_confidence: self.f32(),
            walk_speed: self.i32(),
            walk_speed_confidence: self.f32(),
            frames_without_move: self.i32(),
        };
        self.pos += 4;
        Ok(user)
    }
}

fn check_len(needed: usize, got: usize) -> Result<(), LayoutError> {
    if got < needed {
        return Err(LayoutError::BufferTooSmall { needed, got });
    }
    Ok(())
}

/// Write `info` into the first `CAMERA_INFO_LEN` bytes of `out`.
pub fn encode_camera_info(info: &CameraInformations, out: &mut [u8]) -> Result<(), LayoutError> {
    check_len(CAMERA_INFO_LEN, out.len())?;

    let mut w = Writer::new(out);
    w.user(&info.user);
    w.flag(info.has_second_view, 3);
    w.user(&info.second_user);
    w.i32(info.second_rotation_projected);
    w.i32(info.average_rotation);
    w.i32(info.average_walk_speed);
    w.flag(info.invalid, 3);
    debug_assert_eq!(w.pos, CAMERA_INFO_LEN);
    Ok(())
}

pub fn decode_camera_info(bytes: &[u8]) -> Result<CameraInformations, LayoutError> {
    check_len(CAMERA_INFO_LEN, bytes.len())?;

    let mut r = Reader::new(bytes);
    let user = r.user()?;
    let has_second_view = r.flag(3);
    let second_user = r.user()?;
    let second_rotation_projected = r.i32();
    let average_rotation = r.i32();
    let average_walk_speed = r.i32();
    let invalid = r.flag(3);

    Ok(CameraInformations {
        user,
        has_second_view,
        second_user,
        second_rotation_projected,
        average_rotation,
        average_walk_speed,
        invalid,
    })
}

/// Write a full depth map into the first `DEPTH_LEN` bytes of `out`.
pub fn encode_depth(depth: &[u16], out: &mut [u8]) -> Result<(), LayoutError> {
    if depth.len() != DEPTH_MAP_LENGTH {
        return Err(LayoutError::DepthLength {
            expected: DEPTH_MAP_LENGTH,
            got: depth.len(),
        });
    }
    check_len(DEPTH_LEN, out.len())?;

    LittleEndian::write_u16_into(depth, &mut out[..DEPTH_LEN]);
    Ok(())
}

pub fn decode_depth(bytes: &[u8]) -> Result<Vec<u16>, LayoutError> {
    check_len(DEPTH_LEN, bytes.len())?;

    let mut depth = vec![0u16; DEPTH_MAP_LENGTH];
    LittleEndian::read_u16_into(&bytes[..DEPTH_LEN], &mut depth);
    Ok(depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> CameraInformations {
        let mut user = User::tracked(UserId::new(4), 1_700_000_000_123);
        user.torso = Joint::tracked(JointKind::Torso, Vector3::new(1.0, 2.0, 3.0), 0.75);
        user.right.foot = Joint::tracked(JointKind::RightFoot, Vector3::new(-5.5, 0.0, 2100.0), 1.0);
        user.right.foot.projective = Vector3::new(300.0, 400.0, 2100.0);
        user.previous_left.hip = Joint::tracked(JointKind::LeftHip, Vector3::new(7.0, 8.0, 9.0), 0.6);
        user.rotation = 271;
        user.rotation_confidence = 3.24;
        user.walk_speed = 42;
        user.walk_speed_confidence = 12.5;
        user.frames_without_move = 3;
        CameraInformations::new(user)
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(JOINT_LEN, 32);
        assert_eq!(USER_LEN, 584);
        assert_eq!(CAMERA_INFO_LEN, 1188);
        assert_eq!(DEPTH_LEN, 640 * 480 * 2);
    }

    #[test]
    fn test_camera_info_survives_encoding() {
        let info = sample_info();
        let mut buf = vec![0xAAu8; CAMERA_INFO_LEN];
        encode_camera_info(&info, &mut buf).unwrap();
        assert_eq!(decode_camera_info(&buf).unwrap(), info);
    }

    #[test]
    fn test_field_offsets() {
        let info = sample_info();
        let mut buf = vec![0u8; CAMERA_INFO_LEN];
        encode_camera_info(&info, &mut buf).unwrap();

        assert_eq!(LittleEndian::read_u32(&buf[0..]), 4);
        assert_eq!(buf[4], 1);
        assert_eq!(LittleEndian::read_i64(&buf[8..]), 1_700_000_000_123);
        assert_eq!(buf[16], JointKind::Torso.as_u8());
        assert_eq!(LittleEndian::read_i32(&buf[560..]), 271);
        assert_eq!(LittleEndian::read_i32(&buf[568..]), 42);
        assert_eq!(LittleEndian::read_i32(&buf[1176..]), -1);
        assert_eq!(buf[1184], 0);
    }

    #[test]
    fn test_short_buffers_rejected() {
        let mut buf = vec![0u8; CAMERA_INFO_LEN - 1];
        assert_eq!(
            encode_camera_info(&sample_info(), &mut buf),
            Err(LayoutError::BufferTooSmall {
                needed: CAMERA_INFO_LEN,
                got: CAMERA_INFO_LEN - 1
            })
        );
        assert!(decode_depth(&buf).is_err());
    }

    #[test]
    fn test_invalid_joint_kind_rejected() {
        let mut buf = vec![0u8; CAMERA_INFO_LEN];
        encode_camera_info(&sample_info(), &mut buf).unwrap();
        buf[16] = 0;
        assert_eq!(
            decode_camera_info(&buf),
            Err(LayoutError::InvalidJointKind { offset: 16, value: 0 })
        );
    }

    #[test]
    fn test_depth_encoding() {
        let mut depth = vec![0u16; DEPTH_MAP_LENGTH];
        depth[0] = 0x1234;
        depth[DEPTH_MAP_LENGTH - 1] = 4000;
        let mut buf = vec![0u8; DEPTH_LEN];
        encode_depth(&depth, &mut buf).unwrap();

        assert_eq!(buf[0], 0x34);
        assert_eq!(buf[1], 0x12);
        assert_eq!(decode_depth(&buf).unwrap(), depth);

        assert_eq!(
            encode_depth(&depth[..10], &mut buf),
            Err(LayoutError::DepthLength {
                expected: DEPTH_MAP_LENGTH,
                got: 10
            })
        );
    }
}
