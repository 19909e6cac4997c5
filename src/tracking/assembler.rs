//! Frame assembler: turns one sensor frame into a `CameraInformations`.
//!
//! For every frame:
//! - Copies the depth map
//! - Picks the first tracked user among the ones the driver reports
//! - Samples the nine joints used by the estimators
//! - Carries the previous frame's body parts forward
//! - Runs orientation and (after the first frame) walk-speed estimation

use std::time::Instant;

use tracing::debug;

use crate::motion::{Heading, frames_without_move, rotation_for_user, walk_speed_for_user};
use crate::sensor::SkeletonSensor;
use crate::skeleton::{BodySide, Joint, JointKind, User, UserId};
use crate::tracking::result::{AssembledFrame, CameraInformations, DepthMaps};

/// Maximum number of users requested from the driver per frame.
pub const MAX_USERS: usize = 5;

/// Per-loop frame assembler.
///
/// Only the previous frame's `User` is kept between calls. A new assembler
/// is created every time the acquisition loop starts.
pub struct FrameAssembler {
    /// Sensor frame rate, used by the rate limiters.
    frequency: u32,

    /// Output of the previous frame.
    previous: User,

    /// Rotation carried from the previous frame, `None` once it is unknown.
    heading: Option<Heading>,

    /// True until the first frame was assembled; walk speed is skipped then.
    first_frame: bool,

    /// Running frame counter.
    frame_count: u64,
}

impl FrameAssembler {
    /// Create an assembler for a sensor running at `frequency` Hz.
    pub fn new(frequency: u32) -> Self {
        Self {
            frequency,
            previous: User::untracked(),
            heading: None,
            first_frame: true,
            frame_count: 0,
        }
    }

    /// Number of frames assembled so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn previous_user(&self) -> &User {
        &self.previous
    }

    /// Assemble the sensor's current frame.
    ///
    /// `timestamp_ms` is the frame's wall-clock time in milliseconds since the
    /// UNIX epoch.
    pub fn assemble<S: SkeletonSensor + ?Sized>(
        &mut self,
        sensor: &S,
        timestamp_ms: i64,
    ) -> AssembledFrame {
        let t_start = Instant::now();
        let previous = self.previous;

        let depth = DepthMaps::from_depth(sensor.depth_map());

        let user = match first_tracked_user(sensor) {
            Some(id) => self.build_user(sensor, id, timestamp_ms, &previous),
            None => {
                self.heading = None;
                User::untracked()
            }
        };

        self.previous = user;
        self.first_frame = false;
        self.frame_count += 1;

        AssembledFrame {
            info: CameraInformations::new(user),
            depth,
            elapsed_ms: t_start.elapsed().as_secs_f64() * 1000.0,
        }
    }

    fn build_user<S: SkeletonSensor + ?Sized>(
        &mut self,
        sensor: &S,
        id: UserId,
        timestamp_ms: i64,
        previous: &User,
    ) -> User {
        let mut user = User::tracked(id, timestamp_ms);

        user.torso = sample_joint(sensor, id, JointKind::Torso);
        for side in [BodySide::Left, BodySide::Right] {
            let [hip, knee, foot, shoulder] = side.joint_kinds();
            let part = user.part_mut(side);
            part.hip = sample_joint(sensor, id, hip);
            part.knee = sample_joint(sensor, id, knee);
            part.foot = sample_joint(sensor, id, foot);
            part.shoulder = sample_joint(sensor, id, shoulder);
        }

        user.previous_left = previous.left;
        user.previous_right = previous.right;

        self.heading = rotation_for_user(self.frequency, self.heading, &mut user);

        if !self.first_frame {
            if let Some(estimate) = walk_speed_for_user(
                self.frequency,
                &user,
                previous.timestamp_ms,
                previous.walk_speed,
            ) {
                user.walk_speed = estimate.speed;
                user.walk_speed_confidence = estimate.confidence;
            }
            user.frames_without_move =
                frames_without_move(previous.walk_speed, previous.frames_without_move);
        }

        user
    }
}

/// First user the driver reports as tracked, if any.
fn first_tracked_user<S: SkeletonSensor + ?Sized>(sensor: &S) -> Option<UserId> {
    sensor
        .users(MAX_USERS)
        .into_iter()
        .find(|&id| !id.is_none() && sensor.is_tracking(id))
}

/// Read one joint; inactive joints carry no position.
fn sample_joint<S: SkeletonSensor + ?Sized>(sensor: &S, user: UserId, kind: JointKind) -> Joint {
    if !sensor.is_joint_active(kind) {
        return Joint::inactive(kind);
    }

    match sensor.joint_position(user, kind) {
        Ok(sample) => {
            let mut joint = Joint::tracked(kind, sample.position, sample.confidence);
            joint.projective = sensor.to_projective(&sample.position);
            joint
        }
        Err(e) => {
            debug!("No position for {:?} of {}: {}", kind, user, e);
            Joint::inactive(kind)
        }
    }
}
