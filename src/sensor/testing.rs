//! Scripted in-memory sensor for unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use nalgebra::Vector3;
use parking_lot::Mutex;

use crate::skeleton::{JointKind, UserId};

use super::{
    DEPTH_MAP_LENGTH, DeviceInfo, JointSample, SensorError, SensorEvent, SkeletonSensor,
};

/// Calls observed by a `ScriptedSensor`.
#[derive(Debug, Default)]
pub struct SensorLog {
    pub calibration_requests: Vec<UserId>,
    pub tracking_requests: Vec<UserId>,
    pub releases: usize,
    pub waits: usize,
}

/// What the sensor reports for one frame.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFrame {
    pub users: Vec<(UserId, bool)>,
    pub joints: HashMap<JointKind, JointSample>,
    pub depth_value: u16,
    pub events: Vec<SensorEvent>,
}

impl ScriptedFrame {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A tracked user standing square to the sensor, feet at `foot_z` mm.
    pub fn standing(user: UserId, foot_z: f32) -> Self {
        let mut joints: HashMap<JointKind, JointSample> = HashMap::new();
        let mut put = |kind: JointKind, x: f32, y: f32, z: f32| {
            joints.insert(
                kind,
                JointSample {
                    position: Vector3::new(x, y, z),
                    confidence: 1.0,
                },
            );
        };
        put(JointKind::Torso, 0.0, 300.0, 2000.0);
        put(JointKind::RightHip, 150.0, 0.0, 2000.0);
        put(JointKind::LeftHip, -150.0, 0.0, 2000.0);
        put(JointKind::RightShoulder, 200.0, 500.0, 2000.0);
        put(JointKind::LeftShoulder, -200.0, 500.0, 2000.0);
        put(JointKind::RightKnee, 150.0, -400.0, 2000.0);
        put(JointKind::LeftKnee, -150.0, -400.0, 2000.0);
        put(JointKind::RightFoot, 150.0, -800.0, foot_z);
        put(JointKind::LeftFoot, -150.0, -800.0, foot_z);

        Self {
            users: vec![(user, true)],
            joints,
            depth_value: 1500,
            events: Vec::new(),
        }
    }

    pub fn with_event(mut self, event: SensorEvent) -> Self {
        self.events.push(event);
        self
    }
}

/// Sensor that replays a fixed list of frames, repeating the last one.
pub struct ScriptedSensor {
    pub devices: Vec<DeviceInfo>,
    /// Name of the setup call that should fail, e.g. `"create_device"`.
    pub fail_at: Option<&'static str>,
    pub supports_skeleton: bool,
    pub needs_pose: bool,
    /// Every `wait_for_update` fails, as with an unplugged device.
    pub fail_wait: bool,
    /// When set, `wait_for_update` blocks until a message arrives.
    pub wait_gate: Option<Receiver<()>>,
    frames: Vec<ScriptedFrame>,
    cursor: Option<usize>,
    depth: Vec<u16>,
    events: Option<Sender<SensorEvent>>,
    pub log: Arc<Mutex<SensorLog>>,
}

impl ScriptedSensor {
    pub fn new(camera_path: &str, frames: Vec<ScriptedFrame>) -> Self {
        Self {
            devices: vec![DeviceInfo {
                creation_info: camera_path.to_string(),
                instance_name: "Device1".to_string(),
            }],
            fail_at: None,
            supports_skeleton: true,
            needs_pose: false,
            fail_wait: false,
            wait_gate: None,
            frames,
            cursor: None,
            depth: vec![0; DEPTH_MAP_LENGTH],
            events: None,
            log: Arc::new(Mutex::new(SensorLog::default())),
        }
    }

    /// Move to the next scripted frame and emit its events.
    pub fn advance(&mut self) {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.frames.len() {
            self.cursor = Some(next);
            let frame = &self.frames[next];
            self.depth.fill(frame.depth_value);
            if let Some(events) = &self.events {
                for event in &frame.events {
                    let _ = events.send(event.clone());
                }
            }
        }
    }

    fn frame(&self) -> Option<&ScriptedFrame> {
        self.cursor.and_then(|c| self.frames.get(c))
    }

    fn step(&self, name: &'static str) -> Result<(), SensorError> {
        if self.fail_at == Some(name) {
            Err(SensorError::new(format!("{} refused by scripted sensor", name)))
        } else {
            Ok(())
        }
    }
}

impl SkeletonSensor for ScriptedSensor {
    fn init_context(&mut self) -> Result<(), SensorError> {
        self.step("init_context")
    }

    fn enumerate_devices(&mut self) -> Result<Vec<DeviceInfo>, SensorError> {
        self.step("enumerate_devices")?;
        Ok(self.devices.clone())
    }

    fn create_device(&mut self, _device: &DeviceInfo) -> Result<(), SensorError> {
        self.step("create_device")
    }

    fn create_depth_generator(&mut self) -> Result<(), SensorError> {
        self.step("create_depth_generator")
    }

    fn create_user_generator(&mut self) -> Result<(), SensorError> {
        self.step("create_user_generator")
    }

    fn register_callbacks(&mut self, events: Sender<SensorEvent>) -> Result<(), SensorError> {
        self.step("register_callbacks")?;
        self.events = Some(events);
        Ok(())
    }

    fn supports_skeleton(&self) -> bool {
        self.supports_skeleton
    }

    fn needs_pose_for_calibration(&self) -> bool {
        self.needs_pose
    }

    fn set_full_skeleton_profile(&mut self) {}

    fn start_generating(&mut self) -> Result<(), SensorError> {
        self.step("start_generating")
    }

    fn wait_for_update(&mut self) -> Result<(), SensorError> {
        self.log.lock().waits += 1;
        if let Some(gate) = &self.wait_gate {
            let _ = gate.recv();
        }
        if self.fail_wait {
            return Err(SensorError::new("device disconnected"));
        }
        let at_end = self.cursor.is_some_and(|c| c + 1 >= self.frames.len());
        if at_end {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            self.advance();
        }
        Ok(())
    }

    fn depth_map(&self) -> &[u16] {
        &self.depth
    }

    fn users(&self, max: usize) -> Vec<UserId> {
        self.frame()
            .map(|f| f.users.iter().take(max).map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }

    fn is_tracking(&self, user: UserId) -> bool {
        self.frame()
            .is_some_and(|f| f.users.iter().any(|(id, tracked)| *id == user && *tracked))
    }

    fn is_joint_active(&self, kind: JointKind) -> bool {
        self.frame().is_some_and(|f| f.joints.contains_key(&kind))
    }

    fn joint_position(&self, _user: UserId, kind: JointKind) -> Result<JointSample, SensorError> {
        self.frame()
            .and_then(|f| f.joints.get(&kind).copied())
            .ok_or_else(|| SensorError::new(format!("no position for {:?}", kind)))
    }

    fn to_projective(&self, position: &Vector3<f32>) -> Vector3<f32> {
        Vector3::new(position.x + 320.0, 240.0 - position.y, position.z)
    }

    fn request_calibration(&mut self, user: UserId) -> Result<(), SensorError> {
        self.log.lock().calibration_requests.push(user);
        Ok(())
    }

    fn start_tracking(&mut self, user: UserId) -> Result<(), SensorError> {
        self.log.lock().tracking_requests.push(user);
        Ok(())
    }

    fn release(&mut self) {
        self.log.lock().releases += 1;
    }
}
