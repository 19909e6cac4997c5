//! Offline sources for the acquisition pipeline.

pub mod recording;

pub use recording::{RecordedFrame, RecordedSensor};
