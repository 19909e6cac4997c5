//! Acquisition lifecycle and thread coordination.
//!
//! This module contains the `Acquisition` that owns the sensor, runs the
//! frame loop and publishes to the shared channel, along with its status
//! flags, error codes and calibration event handling.

mod acquisition;
pub mod calibration;
pub mod error;
pub mod shared_state;
pub mod state;

pub use acquisition::Acquisition;
pub use calibration::{CalibrationCommand, command_for_event};
pub use error::{CommandError, InitError, SetupStage, StartError};
pub use shared_state::StatusFlags;
pub use state::LifecycleState;
