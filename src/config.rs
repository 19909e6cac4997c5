//! Acquisition configuration, read from `skeleton-catcher.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatcherConfig {
    /// Sensor frame rate in Hz. Drives the rotation and acceleration limits.
    pub frequency: u32,

    /// Selects the region names and the accessory light colour.
    pub first_sensor: bool,

    /// Creation info of the device to open.
    pub camera_path: String,

    pub use_accessory: bool,
    pub motor_path: String,

    /// Directory holding the shared-memory region files.
    pub shm_dir: PathBuf,
}

impl Default for CatcherConfig {
    fn default() -> Self {
        Self {
            frequency: 30,
            first_sensor: true,
            camera_path: String::new(),
            use_accessory: false,
            motor_path: String::new(),
            shm_dir: PathBuf::from("/dev/shm"),
        }
    }
}

impl CatcherConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.frequency == 0 {
            bail!("frequency must be positive");
        }
        if self.use_accessory && self.motor_path.is_empty() {
            bail!("use_accessory requires motor_path");
        }
        Ok(())
    }
}
