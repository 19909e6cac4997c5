//! Shared-memory channel to the consumer process.
//!
//! Two regions per sensor: the raw depth map and the `CameraInformations`
//! record. Both use the fixed layout in `layout`.

pub mod layout;
pub mod publisher;
pub mod region;

pub use layout::{CAMERA_INFO_LEN, DEPTH_LEN, LayoutError};
pub use publisher::{PublishOutcome, Publisher, RegionNames};
pub use region::{HEADER_LEN, RegionError, SharedRegion};
