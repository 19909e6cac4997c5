use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use skeleton_catcher::config::CatcherConfig;
use skeleton_catcher::io::RecordedSensor;
use skeleton_catcher::sensor::MotorControl;
use skeleton_catcher::system::Acquisition;

#[derive(Parser, Debug)]
#[command(name = "skeleton-catcher")]
#[command(about = "Publishes skeleton orientation and walk speed to shared memory", long_about = None)]
#[command(after_help = "The sensor is replayed from a recording; there is no motor/light accessory driver, so `use_accessory` is rejected.")]
struct Args {
    /// Skeleton recording (CSV) replayed as the sensor.
    #[arg(value_name = "RECORDING")]
    recording: PathBuf,

    /// TOML configuration file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Sensor frame rate in Hz.
    #[arg(long)]
    frequency: Option<u32>,

    /// Publish to the second sensor's regions.
    #[arg(long, default_value_t = false)]
    second_sensor: bool,

    /// Device creation info to open; defaults to the recording path.
    #[arg(long)]
    camera_path: Option<String>,

    /// Directory holding the shared-memory region files.
    #[arg(long)]
    shm_dir: Option<PathBuf>,

    /// Stop after this many seconds; run until killed otherwise.
    #[arg(long, value_name = "SECONDS")]
    duration_secs: Option<u64>,
}

impl Args {
    fn resolve_config(&self) -> Result<CatcherConfig> {
        let mut config = match &self.config {
            Some(path) => CatcherConfig::load(path)?,
            None => CatcherConfig::default(),
        };

        if let Some(frequency) = self.frequency {
            config.frequency = frequency;
        }
        if self.second_sensor {
            config.first_sensor = false;
        }
        if let Some(camera_path) = &self.camera_path {
            config.camera_path = camera_path.clone();
        }
        if let Some(shm_dir) = &self.shm_dir {
            config.shm_dir = shm_dir.clone();
        }
        config.validate()?;
        if config.use_accessory {
            bail!("use_accessory is set but this binary has no accessory driver");
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = args.resolve_config()?;

    let sensor = RecordedSensor::open(&args.recording, config.frequency)
        .with_context(|| format!("Failed to open recording {}", args.recording.display()))?;
    if config.camera_path.is_empty() {
        config.camera_path = sensor.creation_info();
    }

    info!(
        "Sensor {} at {} Hz, regions in {}",
        if config.first_sensor { 1 } else { 2 },
        config.frequency,
        config.shm_dir.display()
    );

    let acquisition = Arc::new(Acquisition::new(config, sensor, MotorControl::disabled()));
    if let Err(e) = acquisition.init() {
        error!("Initialization failed: {}", e);
        std::process::exit(e.code());
    }

    let runner = {
        let acquisition = acquisition.clone();
        thread::Builder::new()
            .name("acquisition".to_string())
            .spawn(move || acquisition.start())
            .context("Failed to spawn acquisition thread")?
    };

    if let Some(secs) = args.duration_secs {
        thread::sleep(Duration::from_secs(secs));
        acquisition.request_stop();
    }

    let result = runner
        .join()
        .map_err(|_| anyhow!("Acquisition thread panicked"))?;
    if let Err(e) = result {
        error!("Acquisition failed: {}", e);
        std::process::exit(e.code());
    }

    info!("Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessory_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catcher.toml");
        std::fs::write(&path, "use_accessory = true\nmotor_path = \"motor:1\"\n").unwrap();

        let args = Args::parse_from([
            "skeleton-catcher",
            "walk.csv",
            "--config",
            path.to_str().unwrap(),
        ]);
        let err = args.resolve_config().unwrap_err();
        assert!(err.to_string().contains("no accessory driver"));
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "skeleton-catcher",
            "walk.csv",
            "--frequency",
            "60",
            "--second-sensor",
        ]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.frequency, 60);
        assert!(!config.first_sensor);
    }
}
