//! Contracts of the hardware collaborators.
//!
//! The skeleton-tracking driver and the motorized mount are external. The
//! pipeline only talks to them through the `SkeletonSensor` and `Accessory`
//! traits defined here.

pub mod accessory;

#[cfg(test)]
pub(crate) mod testing;

use crossbeam_channel::Sender;
use nalgebra::Vector3;
use thiserror::Error;

use crate::skeleton::{JointKind, UserId};

pub use accessory::{Accessory, LightMode, MotorControl};

/// Width of the depth map in pixels.
pub const DEPTH_WIDTH: usize = 640;
/// Height of the depth map in pixels.
pub const DEPTH_HEIGHT: usize = 480;
/// Number of depth samples per frame.
pub const DEPTH_MAP_LENGTH: usize = DEPTH_WIDTH * DEPTH_HEIGHT;

/// Status reported by the tracking driver when a call fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}")]
pub struct SensorError {
    pub status: String,
}

impl SensorError {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

/// A device node found during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Connection string used to match the configured camera path.
    pub creation_info: String,
    pub instance_name: String,
}

/// Position and confidence of one joint as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSample {
    pub position: Vector3<f32>,
    pub confidence: f32,
}

/// Outcome of a skeleton calibration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationStatus {
    Ok,
    /// Calibration was aborted on purpose; do not retry.
    ManualAbort,
    /// Any other failure, with the driver's reason.
    Failed(String),
}

/// Events the driver delivers asynchronously while generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorEvent {
    NewUser(UserId),
    LostUser(UserId),
    CalibrationStart(UserId),
    CalibrationComplete {
        user: UserId,
        status: CalibrationStatus,
    },
}

/// Skeleton-tracking driver.
///
/// Setup methods are called once, in order, by `Acquisition::init`. After
/// `start_generating` the acquisition thread calls `wait_for_update` once per
/// frame and then queries depth, users and joints for that frame.
pub trait SkeletonSensor: Send {
    fn init_context(&mut self) -> Result<(), SensorError>;

    fn enumerate_devices(&mut self) -> Result<Vec<DeviceInfo>, SensorError>;

    fn create_device(&mut self, device: &DeviceInfo) -> Result<(), SensorError>;

    fn create_depth_generator(&mut self) -> Result<(), SensorError>;

    fn create_user_generator(&mut self) -> Result<(), SensorError>;

    /// Route new-user, lost-user and calibration events into `events`.
    fn register_callbacks(&mut self, events: Sender<SensorEvent>) -> Result<(), SensorError>;

    fn supports_skeleton(&self) -> bool;

    fn needs_pose_for_calibration(&self) -> bool;

    fn set_full_skeleton_profile(&mut self);

    fn start_generating(&mut self) -> Result<(), SensorError>;

    /// Block until the device has a new frame. No timeout.
    fn wait_for_update(&mut self) -> Result<(), SensorError>;

    /// Depth samples of the current frame, row-major, millimetres.
    fn depth_map(&self) -> &[u16];

    /// Up to `max` user ids currently known to the driver.
    fn users(&self, max: usize) -> Vec<UserId>;

    fn is_tracking(&self, user: UserId) -> bool;

    fn is_joint_active(&self, kind: JointKind) -> bool;

    fn joint_position(&self, user: UserId, kind: JointKind) -> Result<JointSample, SensorError>;

    /// Project a real-world position into depth-image coordinates.
    fn to_projective(&self, position: &Vector3<f32>) -> Vector3<f32>;

    fn request_calibration(&mut self, user: UserId) -> Result<(), SensorError>;

    fn start_tracking(&mut self, user: UserId) -> Result<(), SensorError>;

    /// Release generator and context handles. Must be safe to call twice.
    fn release(&mut self);
}
