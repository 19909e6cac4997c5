//! Status flags shared between the acquisition thread and its controllers.
//!
//! Each flag has its own lock so a status query never waits on another
//! flag's writer.

use parking_lot::Mutex;

use super::state::LifecycleState;

#[derive(Debug, Default)]
pub struct StatusFlags {
    /// Set once `init` succeeded.
    initialized: Mutex<bool>,

    /// Set after the first loop iteration published a frame.
    started: Mutex<bool>,

    /// Set by cleanup once the sensor handles are released.
    stopped: Mutex<bool>,

    /// Checked by the loop at the top of every iteration.
    stop_requested: Mutex<bool>,
}

impl StatusFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        *self.initialized.lock()
    }

    pub fn set_initialized(&self, value: bool) {
        *self.initialized.lock() = value;
    }

    pub fn is_started(&self) -> bool {
        *self.started.lock()
    }

    pub fn set_started(&self, value: bool) {
        *self.started.lock() = value;
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    pub fn set_stopped(&self, value: bool) {
        *self.stopped.lock() = value;
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.stop_requested.lock()
    }

    pub fn request_stop(&self) {
        *self.stop_requested.lock() = true;
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_flags(self.is_initialized(), self.is_started(), self.is_stopped())
    }
}
