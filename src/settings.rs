use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Runtime settings. Every field has a default, so a config file only
/// needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub baud_rate: u32,
    /// Substrings matched against the port description during auto-detection.
    pub device_signatures: Vec<String>,
    /// Serial reads per display tick before falling back.
    pub read_attempts: usize,
    pub read_timeout_ms: u64,
    pub frame_interval_ms: u64,
    /// Samples kept in the time-series plot.
    pub window: usize,
    /// Wait after opening the port, the board resets on DTR.
    pub settle_delay_ms: u64,
    /// Lines queued between the serial task and the display. The cup view
    /// takes one line per tick, so this bounds how far it lags behind.
    pub line_buffer: usize,
    pub cup_radius: f64,
    pub cup_height: f64,
    pub cup_resolution: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            device_signatures: vec!["Arduino".into(), "CH340".into()],
            read_attempts: crate::renderer::DEFAULT_READ_ATTEMPTS,
            read_timeout_ms: 5,
            frame_interval_ms: 30,
            window: crate::tilt::DEFAULT_WINDOW,
            settle_delay_ms: 2000,
            line_buffer: 64,
            cup_radius: 1.0,
            cup_height: 3.0,
            cup_resolution: 30,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let json_string = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json_string)?;
        log::info!("loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cup_resolution < 2 {
            return Err(Error::InvalidSetting(
                "cup_resolution must be at least 2".into(),
            ));
        }
        if self.line_buffer == 0 {
            return Err(Error::InvalidSetting("line_buffer must not be 0".into()));
        }
        if self.baud_rate == 0 {
            return Err(Error::InvalidSetting("baud_rate must not be 0".into()));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
