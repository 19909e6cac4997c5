//! Lifecycle of an acquisition.

/// State of the acquisition, derived from its status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// `init` has not succeeded yet.
    Uninitialized,
    /// Ready to start; no frame published yet.
    Initialized,
    /// The loop has published at least one frame.
    Running,
    /// Sensor handles released. Terminal.
    Stopped,
}

impl LifecycleState {
    pub fn from_flags(initialized: bool, started: bool, stopped: bool) -> Self {
        if stopped {
            Self::Stopped
        } else if started {
            Self::Running
        } else if initialized {
            Self::Initialized
        } else {
            Self::Uninitialized
        }
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::Uninitialized
    }
}
