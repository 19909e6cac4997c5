//! Acquisition - sensor setup, the frame loop, and teardown.
//!
//! An `Acquisition` is shared through an `Arc`: one thread runs `start()`
//! and is the only writer to the shared regions, any other thread may query
//! the status flags, issue accessory commands or call `request_stop()`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::channel::{Publisher, RegionNames};
use crate::config::CatcherConfig;
use crate::sensor::{LightMode, MotorControl, SensorError, SensorEvent, SkeletonSensor};
use crate::skeleton::UserId;
use crate::tracking::FrameAssembler;

use super::calibration::{CalibrationCommand, command_for_event};
use super::error::{CommandError, InitError, SetupStage, StartError};
use super::shared_state::StatusFlags;
use super::state::LifecycleState;

/// Frames between two periodic progress logs.
const LOG_EVERY_FRAMES: u64 = 300;

pub struct Acquisition<S: SkeletonSensor> {
    config: CatcherConfig,

    /// Taken out and released by cleanup.
    sensor: Mutex<Option<S>>,

    motor: Mutex<MotorControl>,

    /// Set by a successful `init`.
    publisher: OnceLock<Publisher>,

    flags: StatusFlags,

    /// Claimed while an `init` call runs or after one succeeded.
    init_claimed: AtomicBool,

    /// Claimed by the first `start` call.
    loop_claimed: AtomicBool,

    events_tx: Sender<SensorEvent>,
    events_rx: Receiver<SensorEvent>,
}

impl<S: SkeletonSensor> Acquisition<S> {
    pub fn new(config: CatcherConfig, sensor: S, motor: MotorControl) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            config,
            sensor: Mutex::new(Some(sensor)),
            motor: Mutex::new(motor),
            publisher: OnceLock::new(),
            flags: StatusFlags::new(),
            init_claimed: AtomicBool::new(false),
            loop_claimed: AtomicBool::new(false),
            events_tx,
            events_rx,
        }
    }

    pub fn config(&self) -> &CatcherConfig {
        &self.config
    }

    /// The region writer, once `init` succeeded.
    pub fn publisher(&self) -> Option<&Publisher> {
        self.publisher.get()
    }

    /// Attach the shared regions and bring the driver up.
    ///
    /// Nothing is generated until `start` is called. On failure the
    /// acquisition stays uninitialized and `init` may be retried.
    pub fn init(&self) -> Result<(), InitError> {
        if self.init_claimed.swap(true, Ordering::SeqCst) {
            return Err(InitError::AlreadyInitialized);
        }

        let result = self.attach_and_setup();
        match &result {
            Ok(()) => self.flags.set_initialized(true),
            Err(_) => self.init_claimed.store(false, Ordering::SeqCst),
        }
        result
    }

    fn attach_and_setup(&self) -> Result<(), InitError> {
        let names = RegionNames::for_sensor(self.config.first_sensor);
        let depth =
            Publisher::attach_depth(&self.config.shm_dir, names).map_err(InitError::DepthRegion)?;
        let info =
            Publisher::attach_info(&self.config.shm_dir, names).map_err(InitError::InfoRegion)?;

        {
            let mut guard = self.sensor.lock();
            let sensor = guard.as_mut().ok_or_else(|| {
                InitError::sensor(SetupStage::ContextInit)(SensorError::new("sensor released"))
            })?;
            self.setup_sensor(sensor)?;
        }

        if self.config.use_accessory {
            let ready = self
                .motor
                .lock()
                .init(&self.config.motor_path, self.config.first_sensor);
            if !ready {
                warn!("Continuing without accessory");
            }
        }

        if self.publisher.set(Publisher::new(depth, info)).is_err() {
            warn!("Publisher already attached");
        }

        info!(
            "Acquisition initialized: device '{}', regions {} / {}",
            self.config.camera_path, names.depth, names.info
        );
        Ok(())
    }

    fn setup_sensor(&self, sensor: &mut S) -> Result<(), InitError> {
        sensor
            .init_context()
            .map_err(InitError::sensor(SetupStage::ContextInit))?;

        let devices = sensor
            .enumerate_devices()
            .map_err(InitError::sensor(SetupStage::DeviceEnumeration))?;
        debug!("{} device(s) found", devices.len());
        let device = devices
            .iter()
            .find(|d| d.creation_info == self.config.camera_path)
            .ok_or_else(|| InitError::DeviceNotFound {
                camera_path: self.config.camera_path.clone(),
            })?;

        info!("Creating device: {}", device.creation_info);
        sensor
            .create_device(device)
            .map_err(InitError::sensor(SetupStage::DeviceCreation))?;
        sensor
            .create_depth_generator()
            .map_err(InitError::sensor(SetupStage::DepthGenerator))?;
        sensor
            .create_user_generator()
            .map_err(InitError::sensor(SetupStage::UserGenerator))?;
        sensor
            .register_callbacks(self.events_tx.clone())
            .map_err(InitError::sensor(SetupStage::CallbackRegistration))?;

        if !sensor.supports_skeleton() {
            return Err(InitError::SkeletonUnsupported);
        }
        if sensor.needs_pose_for_calibration() {
            return Err(InitError::PoseRequired);
        }
        sensor.set_full_skeleton_profile();
        Ok(())
    }

    /// Run the acquisition loop on the calling thread until a stop is requested.
    pub fn start(&self) -> Result<(), StartError> {
        if !self.flags.is_initialized() {
            return Err(StartError::NotInitialized);
        }
        if self.loop_claimed.swap(true, Ordering::SeqCst) {
            return Err(StartError::AlreadyStarted);
        }

        if self.flags.is_stop_requested() {
            info!("Stop requested before start");
            self.cleanup();
            return Ok(());
        }

        {
            let mut guard = self.sensor.lock();
            let sensor = guard
                .as_mut()
                .ok_or_else(|| StartError::StartGenerating(SensorError::new("sensor released")))?;
            sensor.start_generating().map_err(StartError::StartGenerating)?;
        }

        info!("Acquisition loop started at {} Hz", self.config.frequency);
        self.run_loop();
        Ok(())
    }

    fn run_loop(&self) {
        let mut assembler = FrameAssembler::new(self.config.frequency);
        let period = Duration::from_secs_f64(1.0 / self.config.frequency.max(1) as f64);
        let mut failed_waits: u64 = 0;

        loop {
            if self.flags.is_stop_requested() {
                self.cleanup();
                break;
            }

            let frame = {
                let mut guard = self.sensor.lock();
                let Some(sensor) = guard.as_mut() else {
                    debug!("Sensor released, leaving loop");
                    break;
                };
                match sensor.wait_for_update() {
                    Ok(()) => Some(assembler.assemble(&*sensor, now_ms())),
                    Err(e) => {
                        failed_waits += 1;
                        if failed_waits == 1 || failed_waits % LOG_EVERY_FRAMES == 0 {
                            warn!("Failed updating data ({} in a row): {}", failed_waits, e);
                        }
                        None
                    }
                }
            };

            // Keep the frame cadence while the sensor is failing.
            let Some(frame) = frame else {
                thread::sleep(period);
                continue;
            };
            if failed_waits > 0 {
                info!("Sensor updates resumed after {} failures", failed_waits);
                failed_waits = 0;
            }

            if let Some(publisher) = self.publisher.get() {
                publisher.publish(&frame);
            }

            let frame_count = assembler.frame_count();
            if frame_count == 1 {
                self.flags.set_started(true);
                info!("First frame published");
            } else if frame_count % LOG_EVERY_FRAMES == 0 {
                debug!(
                    "Frame {}: user {} rotation {} speed {} ({:.2} ms)",
                    frame_count,
                    frame.info.user.id,
                    frame.info.user.rotation,
                    frame.info.user.walk_speed,
                    frame.elapsed_ms
                );
            }

            self.handle_events();
        }

        info!("Acquisition loop finished after {} frames", assembler.frame_count());
    }

    fn handle_events(&self) {
        while let Ok(event) = self.events_rx.try_recv() {
            let result = match command_for_event(&event) {
                Some(CalibrationCommand::RequestCalibration(user)) => self.start_calibration(user),
                Some(CalibrationCommand::StartTracking(user)) => self.start_tracking(user),
                None => Ok(()),
            };
            if let Err(e) = result {
                warn!("{} (code {})", e, e.code());
            }
        }
    }

    /// Ask the loop to stop. Safe from any thread and never blocks on the
    /// sensor once the loop runs.
    ///
    /// If no `start` call has entered the loop yet, the sensor is released
    /// right away on the calling thread. Otherwise the loop releases it at
    /// the top of its next iteration.
    pub fn request_stop(&self) {
        self.flags.request_stop();
        info!("Stop requested");
        if !self.loop_claimed.load(Ordering::SeqCst) {
            self.cleanup();
        }
    }

    /// Release the sensor handles. Idempotent.
    fn cleanup(&self) {
        if let Some(mut sensor) = self.sensor.lock().take() {
            sensor.release();
            info!("Sensor released");
        }
        self.flags.set_stopped(true);
    }

    /// True once `init` succeeded.
    pub fn is_initialized(&self) -> bool {
        self.flags.is_initialized()
    }

    /// True once the loop published its first frame.
    pub fn is_started(&self) -> bool {
        self.flags.is_started()
    }

    /// True once the sensor handles were released.
    pub fn is_stopped(&self) -> bool {
        self.flags.is_stopped()
    }

    /// True once `request_stop` was called.
    pub fn is_stop_requested(&self) -> bool {
        self.flags.is_stop_requested()
    }

    /// Lifecycle state derived from the three status flags.
    pub fn state(&self) -> LifecycleState {
        self.flags.state()
    }

    pub fn start_calibration(&self, user: UserId) -> Result<(), CommandError> {
        if !self.flags.is_started() {
            return Err(CommandError::CalibrationRefused { user });
        }
        let mut guard = self.sensor.lock();
        let sensor = guard
            .as_mut()
            .ok_or(CommandError::CalibrationRefused { user })?;
        sensor
            .request_calibration(user)
            .map_err(|source| CommandError::Sensor {
                operation: "request calibration",
                source,
            })
    }

    pub fn start_tracking(&self, user: UserId) -> Result<(), CommandError> {
        if !self.flags.is_started() {
            return Err(CommandError::TrackingRefused { user });
        }
        let mut guard = self.sensor.lock();
        let sensor = guard.as_mut().ok_or(CommandError::TrackingRefused { user })?;
        sensor
            .start_tracking(user)
            .map_err(|source| CommandError::Sensor {
                operation: "start tracking",
                source,
            })
    }

    pub fn move_to_angle(&self, angle: i32) {
        self.motor.lock().move_to_angle(angle);
    }

    pub fn set_light(&self, mode: LightMode) {
        self.motor.lock().set_light(mode);
    }
}

impl<S: SkeletonSensor> Drop for Acquisition<S> {
    fn drop(&mut self) {
        self.cleanup();
        if let Some(publisher) = self.publisher.get() {
            publisher.detach();
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
