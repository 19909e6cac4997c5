//! Skeleton recordings replayed as a live sensor.
//!
//! A recording is a CSV file with one row per joint sample:
//!
//! ```text
//! frame,user,joint,active,x,y,z,confidence
//! 0,1,torso,true,0.0,300.0,2000.0,1.0
//! 0,1,left_foot,true,-150.0,-800.0,2000.0,0.9
//! ```
//!
//! Frames are played back at the configured frequency and the recording
//! loops when it reaches its end. Depth maps are blank.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use crossbeam_channel::Sender;
use csv::{ReaderBuilder, Trim};
use nalgebra::Vector3;
use serde::Deserialize;
use tracing::{debug, info};

use crate::sensor::{
    CalibrationStatus, DEPTH_HEIGHT, DEPTH_MAP_LENGTH, DEPTH_WIDTH, DeviceInfo, JointSample,
    SensorError, SensorEvent, SkeletonSensor,
};
use crate::skeleton::{JointKind, UserId};

/// Depth camera focal length in pixels.
const FOCAL_LENGTH_PX: f32 = 575.8;

#[derive(Debug, Deserialize)]
struct JointRow {
    frame: u64,
    user: u32,
    joint: JointKind,
    active: bool,
    x: f32,
    y: f32,
    z: f32,
    confidence: f32,
}

/// Skeletons of one recorded frame.
#[derive(Debug, Clone, Default)]
pub struct RecordedFrame {
    /// Users in order of first appearance within the frame.
    pub users: Vec<UserId>,
    /// `None` marks a joint the tracker reported as inactive.
    pub joints: HashMap<(UserId, JointKind), Option<JointSample>>,
}

pub struct RecordedSensor {
    path: PathBuf,
    frames: Vec<RecordedFrame>,
    /// Joint kinds present anywhere in the recording.
    profile: HashSet<JointKind>,
    period: Duration,
    next_deadline: Option<Instant>,
    cursor: Option<usize>,
    depth: Vec<u16>,
    events: Option<Sender<SensorEvent>>,
    present: HashSet<UserId>,
    tracking: HashSet<UserId>,
    generating: bool,
    released: bool,
}

impl RecordedSensor {
    /// Load a recording and pace it at `frequency` frames per second.
    pub fn open<P: AsRef<Path>>(path: P, frequency: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if frequency == 0 {
            bail!("frequency must be positive");
        }
        let frames = load_frames(&path)?;
        if frames.is_empty() {
            bail!("Recording {} has no frames", path.display());
        }

        let profile = frames
            .iter()
            .flat_map(|f| f.joints.keys().map(|&(_, kind)| kind))
            .collect();

        info!("Loaded {} recorded frames from {}", frames.len(), path.display());

        Ok(Self {
            path,
            frames,
            profile,
            period: Duration::from_secs_f64(1.0 / frequency as f64),
            next_deadline: None,
            cursor: None,
            depth: vec![0; DEPTH_MAP_LENGTH],
            events: None,
            present: HashSet::new(),
            tracking: HashSet::new(),
            generating: false,
            released: false,
        })
    }

    /// Connection string reported during device enumeration.
    pub fn creation_info(&self) -> String {
        self.path.display().to_string()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn frame(&self) -> Option<&RecordedFrame> {
        self.cursor.and_then(|c| self.frames.get(c))
    }

    fn emit(&self, event: SensorEvent) {
        if let Some(events) = &self.events {
            // The receiver only disappears with the acquisition.
            let _ = events.send(event);
        }
    }

    fn pace(&mut self) {
        let now = Instant::now();
        let due = match self.next_deadline {
            Some(deadline) if deadline > now => {
                thread::sleep(deadline - now);
                deadline
            }
            _ => now,
        };
        self.next_deadline = Some(due + self.period);
    }

    fn advance(&mut self) {
        let next = match self.cursor {
            Some(c) if c + 1 < self.frames.len() => c + 1,
            Some(_) => {
                debug!("Recording finished, looping");
                0
            }
            None => 0,
        };
        self.cursor = Some(next);

        let users: HashSet<UserId> = self.frames[next].users.iter().copied().collect();
        let lost: Vec<UserId> = self.present.difference(&users).copied().collect();
        for user in lost {
            self.present.remove(&user);
            self.tracking.remove(&user);
            self.emit(SensorEvent::LostUser(user));
        }
        for user in self.frames[next].users.clone() {
            if self.present.insert(user) {
                self.emit(SensorEvent::NewUser(user));
            }
        }
    }

    fn ensure_live(&self, operation: &str) -> Result<(), SensorError> {
        if self.released {
            return Err(SensorError::new(format!("{}: sensor released", operation)));
        }
        Ok(())
    }
}

impl SkeletonSensor for RecordedSensor {
    fn init_context(&mut self) -> Result<(), SensorError> {
        self.ensure_live("init context")
    }

    fn enumerate_devices(&mut self) -> Result<Vec<DeviceInfo>, SensorError> {
        self.ensure_live("enumerate devices")?;
        Ok(vec![DeviceInfo {
            creation_info: self.creation_info(),
            instance_name: "Recording".to_string(),
        }])
    }

    fn create_device(&mut self, _device: &DeviceInfo) -> Result<(), SensorError> {
        self.ensure_live("create device")
    }

    fn create_depth_generator(&mut self) -> Result<(), SensorError> {
        self.ensure_live("create depth generator")
    }

    fn create_user_generator(&mut self) -> Result<(), SensorError> {
        self.ensure_live("create user generator")
    }

    fn register_callbacks(&mut self, events: Sender<SensorEvent>) -> Result<(), SensorError> {
        self.ensure_live("register callbacks")?;
        self.events = Some(events);
        Ok(())
    }

    fn supports_skeleton(&self) -> bool {
        true
    }

    fn needs_pose_for_calibration(&self) -> bool {
        false
    }

    fn set_full_skeleton_profile(&mut self) {}

    fn start_generating(&mut self) -> Result<(), SensorError> {
        self.ensure_live("start generating")?;
        self.generating = true;
        Ok(())
    }

    fn wait_for_update(&mut self) -> Result<(), SensorError> {
        if !self.generating {
            return Err(SensorError::new("not generating"));
        }
        self.pace();
        self.advance();
        Ok(())
    }

    fn depth_map(&self) -> &[u16] {
        &self.depth
    }

    fn users(&self, max: usize) -> Vec<UserId> {
        self.frame()
            .map(|f| f.users.iter().take(max).copied().collect())
            .unwrap_or_default()
    }

    fn is_tracking(&self, user: UserId) -> bool {
        self.tracking.contains(&user) && self.present.contains(&user)
    }

    fn is_joint_active(&self, kind: JointKind) -> bool {
        self.profile.contains(&kind)
    }

    fn joint_position(&self, user: UserId, kind: JointKind) -> Result<JointSample, SensorError> {
        match self.frame().and_then(|f| f.joints.get(&(user, kind))) {
            Some(Some(sample)) => Ok(*sample),
            Some(None) => Err(SensorError::new(format!("{:?} of {} not tracked", kind, user))),
            None => Err(SensorError::new(format!("{:?} of {} not recorded", kind, user))),
        }
    }

    fn to_projective(&self, position: &Vector3<f32>) -> Vector3<f32> {
        if position.z <= 0.0 {
            return Vector3::zeros();
        }
        let scale = FOCAL_LENGTH_PX / position.z;
        Vector3::new(
            DEPTH_WIDTH as f32 / 2.0 + position.x * scale,
            DEPTH_HEIGHT as f32 / 2.0 - position.y * scale,
            position.z,
        )
    }

    fn request_calibration(&mut self, user: UserId) -> Result<(), SensorError> {
        self.ensure_live("request calibration")?;
        self.emit(SensorEvent::CalibrationStart(user));
        self.emit(SensorEvent::CalibrationComplete {
            user,
            status: CalibrationStatus::Ok,
        });
        Ok(())
    }

    fn start_tracking(&mut self, user: UserId) -> Result<(), SensorError> {
        self.ensure_live("start tracking")?;
        self.tracking.insert(user);
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            debug!("Releasing recording {}", self.path.display());
        }
        self.generating = false;
        self.released = true;
        self.events = None;
    }
}

fn load_frames(csv_path: &Path) -> Result<Vec<RecordedFrame>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_path(csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;

    let mut frames: BTreeMap<u64, RecordedFrame> = BTreeMap::new();
    for (line, row) in rdr.deserialize::<JointRow>().enumerate() {
        let row = row.with_context(|| {
            format!("Invalid row {} in {}", line + 1, csv_path.display())
        })?;

        let user = UserId::new(row.user);
        let frame = frames.entry(row.frame).or_default();
        if !frame.users.contains(&user) {
            frame.users.push(user);
        }
        let sample = row.active.then(|| JointSample {
            position: Vector3::new(row.x, row.y, row.z),
            confidence: row.confidence,
        });
        frame.joints.insert((user, row.joint), sample);
    }

    Ok(frames.into_values().collect())
}
