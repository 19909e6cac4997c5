//! Lifecycle errors and their stable numeric codes.

use thiserror::Error;

use crate::channel::RegionError;
use crate::sensor::SensorError;
use crate::skeleton::UserId;

/// Driver setup steps performed by `Acquisition::init`, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    ContextInit,
    DeviceEnumeration,
    DeviceCreation,
    DepthGenerator,
    UserGenerator,
    CallbackRegistration,
}

impl SetupStage {
    pub fn name(self) -> &'static str {
        match self {
            Self::ContextInit => "context init",
            Self::DeviceEnumeration => "device enumeration",
            Self::DeviceCreation => "device creation",
            Self::DepthGenerator => "depth generator creation",
            Self::UserGenerator => "user generator creation",
            Self::CallbackRegistration => "callback registration",
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::ContextInit => 40,
            Self::DeviceEnumeration => 41,
            Self::DeviceCreation => 42,
            Self::DepthGenerator => 43,
            Self::UserGenerator => 44,
            Self::CallbackRegistration => 45,
        }
    }
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Acquisition is already initialized")]
    AlreadyInitialized,

    #[error("Device '{camera_path}' not found")]
    DeviceNotFound { camera_path: String },

    #[error("Depth region attach failed: {0}")]
    DepthRegion(#[source] RegionError),

    #[error("Info region attach failed: {0}")]
    InfoRegion(#[source] RegionError),

    #[error("User generator does not support skeleton tracking")]
    SkeletonUnsupported,

    #[error("Calibration pose required, not supported")]
    PoseRequired,

    #[error("{} failed: {source}", .stage.name())]
    Sensor {
        stage: SetupStage,
        #[source]
        source: SensorError,
    },
}

impl InitError {
    pub fn sensor(stage: SetupStage) -> impl FnOnce(SensorError) -> Self {
        move |source| Self::Sensor { stage, source }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::AlreadyInitialized => 1,
            Self::DeviceNotFound { .. } => 4,
            Self::DepthRegion(_) => 10,
            Self::InfoRegion(_) => 11,
            Self::SkeletonUnsupported => 20,
            Self::PoseRequired => 30,
            Self::Sensor { stage, .. } => stage.code(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error("Acquisition is not initialized")]
    NotInitialized,

    #[error("Acquisition loop already started")]
    AlreadyStarted,

    #[error("start generating failed: {0}")]
    StartGenerating(#[source] SensorError),
}

impl StartError {
    pub fn code(&self) -> i32 {
        match self {
            Self::NotInitialized => 5,
            Self::AlreadyStarted => 6,
            Self::StartGenerating(_) => 46,
        }
    }
}

/// Refusals of user-level calibration and tracking commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Cannot start calibration of {user}: acquisition not running")]
    CalibrationRefused { user: UserId },

    #[error("Cannot start tracking of {user}: acquisition not running")]
    TrackingRefused { user: UserId },

    #[error("{operation} failed: {source}")]
    Sensor {
        operation: &'static str,
        #[source]
        source: SensorError,
    },
}

impl CommandError {
    pub fn code(&self) -> i32 {
        match self {
            Self::CalibrationRefused { .. } => 100,
            Self::TrackingRefused { .. } => 101,
            Self::Sensor { .. } => 102,
        }
    }
}
