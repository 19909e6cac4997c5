//! Per-frame processing: sensor frame in, `CameraInformations` out.
//!
//! - Joint sampling for the first tracked user
//! - Orientation and walk-speed estimation
//! - No-movement frame counting

pub mod assembler;
pub mod result;

pub use assembler::{FrameAssembler, MAX_USERS};
pub use result::{AssembledFrame, CameraInformations, DepthMaps};
