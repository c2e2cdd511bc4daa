//! Configuration loading using Figment
//!
//! Configuration is loaded from:
//! 1. a TOML file (`config/etbuffer.toml` by default)
//! 2. environment variables prefixed with `ETBUFFER_`, nested keys separated
//!    by a double underscore (`ETBUFFER_APPLICATION__LOG_LEVEL=debug`)
//!
//! # Example
//! ```no_run
//! use eyetracker_buffer::config::BufferConfig;
//!
//! let config = BufferConfig::load()?;
//! config.validate()?;
//! println!("Device: {}", config.device.address);
//! # Ok::<(), eyetracker_buffer::error::BufferError>(())
//! ```

use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::controller::StartOptions;
use crate::error::{BufferError, BufferResult};
use crate::log_channel::DEFAULT_LOG_CAPACITY;
use crate::logging::OutputFormat;
use crate::stream::DataStream;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Eye tracker to connect to
    pub device: DeviceConfig,
    /// Per-stream buffering settings
    #[serde(default)]
    pub streams: StreamsConfig,
    /// Process-wide log channel
    #[serde(default)]
    pub log_channel: LogChannelConfig,
    /// Consumer polling
    #[serde(default)]
    pub consumer: ConsumerConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: OutputFormat,
}

/// Eye tracker connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device address, e.g. `tet-tcp://169.254.10.20`
    pub address: String,
    /// Sample rate of the simulated tracker in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: f64,
}

/// Settings for one stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Start buffering this stream on startup
    #[serde(default)]
    pub enabled: bool,
    /// Capacity to reserve; the stream default when absent
    #[serde(default)]
    pub initial_capacity: Option<usize>,
    /// Request GIF-encoded images (eye image stream only)
    #[serde(default)]
    pub as_gif: Option<bool>,
}

impl StreamSettings {
    /// Options to pass to `start`.
    pub fn start_options(&self) -> StartOptions {
        StartOptions {
            initial_capacity: self.initial_capacity,
            as_gif: self.as_gif,
        }
    }
}

/// Settings for every stream. Only gaze is enabled by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamsConfig {
    #[allow(missing_docs)]
    #[serde(default = "gaze_enabled")]
    pub gaze: StreamSettings,
    #[allow(missing_docs)]
    #[serde(default)]
    pub eye_image: StreamSettings,
    #[allow(missing_docs)]
    #[serde(default)]
    pub external_signal: StreamSettings,
    #[allow(missing_docs)]
    #[serde(default)]
    pub time_sync: StreamSettings,
}

impl StreamsConfig {
    /// Settings for `stream`.
    pub fn settings(&self, stream: DataStream) -> &StreamSettings {
        match stream {
            DataStream::Gaze => &self.gaze,
            DataStream::EyeImage => &self.eye_image,
            DataStream::ExtSignal => &self.external_signal,
            DataStream::TimeSync => &self.time_sync,
        }
    }

    /// Streams marked as enabled.
    pub fn enabled(&self) -> Vec<DataStream> {
        DataStream::ALL
            .into_iter()
            .filter(|s| self.settings(*s).enabled)
            .collect()
    }
}

/// Log channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogChannelConfig {
    /// Start the log channel on startup
    #[serde(default)]
    pub enabled: bool,
    /// Capacity to reserve
    #[serde(default = "default_log_capacity")]
    pub initial_capacity: usize,
}

/// Consumer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Interval between consume calls in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

// Default value functions
fn default_name() -> String {
    "etbuffer".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sample_rate() -> f64 {
    600.0
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

fn default_poll_interval() -> u64 {
    100
}

fn gaze_enabled() -> StreamSettings {
    StreamSettings {
        enabled: true,
        ..Default::default()
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: OutputFormat::default(),
        }
    }
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            gaze: gaze_enabled(),
            eye_image: StreamSettings::default(),
            external_signal: StreamSettings::default(),
            time_sync: StreamSettings::default(),
        }
    }
}

impl Default for LogChannelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_capacity: default_log_capacity(),
        }
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl BufferConfig {
    /// Load configuration from `config/etbuffer.toml` and the environment.
    pub fn load() -> BufferResult<Self> {
        Self::load_from("config/etbuffer.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> BufferResult<Self> {
        let config = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("ETBUFFER_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> BufferResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(BufferError::Validation(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.device.address.trim().is_empty() {
            return Err(BufferError::Validation(
                "device.address must not be empty".into(),
            ));
        }

        if self.device.sample_rate_hz.is_nan() || self.device.sample_rate_hz <= 0.0 {
            return Err(BufferError::Validation(format!(
                "Invalid sample_rate_hz {}. Must be positive",
                self.device.sample_rate_hz
            )));
        }

        if self.consumer.poll_interval_ms == 0 {
            return Err(BufferError::Validation(
                "consumer.poll_interval_ms must be at least 1".into(),
            ));
        }

        for stream in [DataStream::Gaze, DataStream::ExtSignal, DataStream::TimeSync] {
            if self.streams.settings(stream).as_gif.is_some() {
                return Err(BufferError::Validation(format!(
                    "as_gif is only valid for the eyeImage stream, not {stream}"
                )));
            }
        }

        Ok(())
    }
}
