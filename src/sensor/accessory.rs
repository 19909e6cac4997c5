//! Motorized mount (tilt motor and status light).

use tracing::{debug, warn};

/// Light modes supported by the mount's status LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightMode {
    Off,
    Green,
    Red,
    Yellow,
    BlinkGreen,
    BlinkRedYellow,
}

/// Motor/light device driven by the acquisition.
pub trait Accessory: Send {
    /// Open the device at `path`. Returns whether it is usable.
    fn init(&mut self, path: &str) -> bool;

    fn initialized(&self) -> bool;

    /// Tilt the mount to `angle` degrees.
    fn move_to_angle(&mut self, angle: i32);

    fn set_light(&mut self, mode: LightMode);
}

/// Optional accessory owned by the acquisition.
///
/// Commands are dropped with a warning when accessory support is disabled or
/// the device failed to initialize. On drop an initialized mount is returned
/// to angle 0 with its light off.
pub struct MotorControl {
    accessory: Option<Box<dyn Accessory>>,
}

impl MotorControl {
    pub fn disabled() -> Self {
        Self { accessory: None }
    }

    pub fn new(accessory: Box<dyn Accessory>) -> Self {
        Self {
            accessory: Some(accessory),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.accessory.is_some()
    }

    /// Open the device and move it to its start position.
    ///
    /// The light blinks green for the first sensor and red/yellow for the
    /// second one so both mounts can be told apart.
    pub fn init(&mut self, path: &str, first_sensor: bool) -> bool {
        let Some(accessory) = self.accessory.as_mut() else {
            return false;
        };

        if !accessory.init(path) || !accessory.initialized() {
            warn!("Accessory at '{}' could not be initialized", path);
            return false;
        }

        accessory.move_to_angle(0);
        accessory.set_light(if first_sensor {
            LightMode::BlinkGreen
        } else {
            LightMode::BlinkRedYellow
        });
        debug!("Accessory at '{}' ready", path);
        true
    }

    pub fn move_to_angle(&mut self, angle: i32) {
        match self.ready_accessory() {
            Some(accessory) => accessory.move_to_angle(angle),
            None => warn!("Accessory command ignored: accessory support is not enabled or not ready"),
        }
    }

    pub fn set_light(&mut self, mode: LightMode) {
        match self.ready_accessory() {
            Some(accessory) => accessory.set_light(mode),
            None => warn!("Accessory command ignored: accessory support is not enabled or not ready"),
        }
    }

    fn ready_accessory(&mut self) -> Option<&mut Box<dyn Accessory>> {
        self.accessory.as_mut().filter(|a| a.initialized())
    }
}

impl Drop for MotorControl {
    fn drop(&mut self) {
        if let Some(accessory) = self.ready_accessory() {
            accessory.set_light(LightMode::Off);
            accessory.move_to_angle(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Command {
        Angle(i32),
        Light(LightMode),
    }

    struct RecordingAccessory {
        usable: bool,
        initialized: bool,
        log: Arc<Mutex<Vec<Command>>>,
    }

    impl Accessory for RecordingAccessory {
        fn init(&mut self, _path: &str) -> bool {
            self.initialized = self.usable;
            self.usable
        }

        fn initialized(&self) -> bool {
            self.initialized
        }

        fn move_to_angle(&mut self, angle: i32) {
            self.log.lock().push(Command::Angle(angle));
        }

        fn set_light(&mut self, mode: LightMode) {
            self.log.lock().push(Command::Light(mode));
        }
    }

    fn control(usable: bool) -> (MotorControl, Arc<Mutex<Vec<Command>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let accessory = RecordingAccessory {
            usable,
            initialized: false,
            log: Arc::clone(&log),
        };
        (MotorControl::new(Box::new(accessory)), log)
    }

    #[test]
    fn test_init_moves_to_start_position() {
        let (mut motor, log) = control(true);
        assert!(motor.init("usb:1", false));
        assert_eq!(
            *log.lock(),
            vec![Command::Angle(0), Command::Light(LightMode::BlinkRedYellow)]
        );
    }

    #[test]
    fn test_drop_parks_mount() {
        let (mut motor, log) = control(true);
        motor.init("usb:1", true);
        motor.move_to_angle(15);
        drop(motor);

        let log = log.lock();
        assert_eq!(log[log.len() - 2], Command::Light(LightMode::Off));
        assert_eq!(log[log.len() - 1], Command::Angle(0));
    }

    #[test]
    fn test_commands_ignored_when_not_ready() {
        let (mut motor, log) = control(false);
        assert!(!motor.init("usb:1", true));
        motor.move_to_angle(10);
        motor.set_light(LightMode::Red);
        drop(motor);
        assert!(log.lock().is_empty());

        let mut disabled = MotorControl::disabled();
        assert!(!disabled.is_enabled());
        disabled.move_to_angle(10);
    }
}
