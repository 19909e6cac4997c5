//! Publishes assembled frames to the two shared regions.

use std::path::Path;

use tracing::{debug, warn};

use crate::channel::layout::{self, CAMERA_INFO_LEN, DEPTH_LEN};
use crate::channel::region::{RegionError, SharedRegion};
use crate::tracking::{AssembledFrame, CameraInformations, DepthMaps};

/// Names of the depth and info regions for one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionNames {
    pub depth: &'static str,
    pub info: &'static str,
}

impl RegionNames {
    pub fn for_sensor(first_sensor: bool) -> Self {
        if first_sensor {
            Self {
                depth: "vrcontroller-depth-1",
                info: "vrcontroller-info-1",
            }
        } else {
            Self {
                depth: "vrcontroller-depth-2",
                info: "vrcontroller-info-2",
            }
        }
    }
}

/// Which regions a `publish` call actually wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    pub depth_written: bool,
    pub info_written: bool,
}

/// Writer side of the shared channel.
///
/// Each region has its own lock. A publish takes the depth lock, copies,
/// releases it, then does the same for the info region.
pub struct Publisher {
    depth: SharedRegion,
    info: SharedRegion,
}

impl Publisher {
    /// Publisher over two already attached regions.
    pub fn new(depth: SharedRegion, info: SharedRegion) -> Self {
        Self { depth, info }
    }

    /// Attach the depth region of `names` in `dir`.
    pub fn attach_depth(dir: &Path, names: RegionNames) -> Result<SharedRegion, RegionError> {
        SharedRegion::attach(dir, names.depth, DEPTH_LEN)
    }

    /// Attach the info region of `names` in `dir`.
    pub fn attach_info(dir: &Path, names: RegionNames) -> Result<SharedRegion, RegionError> {
        SharedRegion::attach(dir, names.info, CAMERA_INFO_LEN)
    }

    pub fn depth_region(&self) -> &SharedRegion {
        &self.depth
    }

    pub fn info_region(&self) -> &SharedRegion {
        &self.info
    }

    /// Write both records of `frame`, each under its own region lock.
    pub fn publish(&self, frame: &AssembledFrame) -> PublishOutcome {
        PublishOutcome {
            depth_written: self.publish_depth(&frame.depth),
            info_written: self.publish_info(&frame.info),
        }
    }

    pub fn publish_depth(&self, maps: &DepthMaps) -> bool {
        let result = self
            .depth
            .write_with(|buf| layout::encode_depth(&maps.depth, buf));
        report(&self.depth, result)
    }

    pub fn publish_info(&self, info: &CameraInformations) -> bool {
        let result = self
            .info
            .write_with(|buf| layout::encode_camera_info(info, buf));
        report(&self.info, result)
    }

    /// Read back the last published info record.
    pub fn read_info(&self) -> Option<CameraInformations> {
        let bytes = self.info.read_payload()?;
        layout::decode_camera_info(&bytes).ok()
    }

    /// Read back the last published depth map.
    pub fn read_depth(&self) -> Option<Vec<u16>> {
        let bytes = self.depth.read_payload()?;
        layout::decode_depth(&bytes).ok()
    }

    pub fn detach(&self) {
        self.depth.detach();
        self.info.detach();
    }
}

/// Create zeroed backing files for both regions of one sensor.
#[cfg(test)]
pub(crate) fn create_backing_files(dir: &Path, names: RegionNames) {
    use crate::channel::region::HEADER_LEN;

    for (name, len) in [(names.depth, DEPTH_LEN), (names.info, CAMERA_INFO_LEN)] {
        std::fs::File::create(dir.join(name))
            .and_then(|f| f.set_len((HEADER_LEN + len) as u64))
            .unwrap();
    }
}

fn report(region: &SharedRegion, result: Result<bool, layout::LayoutError>) -> bool {
    match result {
        Ok(true) => true,
        Ok(false) => {
            debug!("Region {} detached, write skipped", region.name());
            false
        }
        Err(e) => {
            warn!("Failed to publish to {}: {}", region.name(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::DEPTH_MAP_LENGTH;
    use crate::skeleton::{User, UserId};

    fn publisher(dir: &Path, first_sensor: bool) -> Publisher {
        let names = RegionNames::for_sensor(first_sensor);
        create_backing_files(dir, names);
        Publisher::new(
            Publisher::attach_depth(dir, names).unwrap(),
            Publisher::attach_info(dir, names).unwrap(),
        )
    }

    fn frame(user: u32, depth: u16) -> AssembledFrame {
        let mut user = User::tracked(UserId::new(user), 10);
        user.rotation = 45;
        AssembledFrame {
            info: CameraInformations::new(user),
            depth: DepthMaps::from_depth(&vec![depth; DEPTH_MAP_LENGTH]),
            elapsed_ms: 0.0,
        }
    }

    #[test]
    fn test_region_names() {
        assert_eq!(RegionNames::for_sensor(true).depth, "vrcontroller-depth-1");
        assert_eq!(RegionNames::for_sensor(true).info, "vrcontroller-info-1");
        assert_eq!(RegionNames::for_sensor(false).depth, "vrcontroller-depth-2");
        assert_eq!(RegionNames::for_sensor(false).info, "vrcontroller-info-2");
    }

    #[test]
    fn test_publish_writes_both_regions() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(dir.path(), true);

        let outcome = publisher.publish(&frame(3, 1234));
        assert_eq!(
            outcome,
            PublishOutcome {
                depth_written: true,
                info_written: true
            }
        );

        let info = publisher.read_info().unwrap();
        assert_eq!(info.user.id, UserId::new(3));
        assert_eq!(info.user.rotation, 45);
        assert!(publisher.read_depth().unwrap().iter().all(|&d| d == 1234));
    }

    #[test]
    fn test_regions_update_independently() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(dir.path(), false);

        publisher.publish(&frame(1, 100));
        publisher.info_region().detach();
        let outcome = publisher.publish(&frame(2, 200));

        assert!(outcome.depth_written);
        assert!(!outcome.info_written);
        assert_eq!(publisher.depth_region().write_count(), Some(2));
        assert!(publisher.read_info().is_none());
        assert!(publisher.read_depth().unwrap().iter().all(|&d| d == 200));
    }

    #[test]
    fn test_bad_depth_skips_only_depth() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(dir.path(), true);

        let mut bad = frame(5, 1);
        bad.depth = DepthMaps::from_depth(&[1, 2, 3]);
        let outcome = publisher.publish(&bad);

        assert!(!outcome.depth_written);
        assert!(outcome.info_written);
        assert_eq!(publisher.read_info().unwrap().user.id, UserId::new(5));
    }

    #[test]
    fn test_detached_publisher_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(dir.path(), true);
        publisher.detach();
        assert_eq!(publisher.publish(&frame(1, 1)), PublishOutcome::default());
    }
}
