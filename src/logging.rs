//! `tracing-subscriber` setup for the `etbuffer` binary and tests.
//!
//! The library only emits `tracing` events: stream start and stop, rejected
//! subscriptions, out-of-order samples and log channel transitions. Whoever
//! embeds it decides where those go. [`init`] installs a global fmt subscriber
//! whose filter comes from `RUST_LOG` when set and from the configured level
//! otherwise.
//!
//! ```no_run
//! use eyetracker_buffer::logging::{self, LogSettings, OutputFormat};
//! use tracing::Level;
//!
//! logging::init(LogSettings::new(Level::DEBUG).format(OutputFormat::Json))?;
//! tracing::info!(stream = "gaze", "buffering");
//! # Ok::<(), String>(())
//! ```

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::Registry, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::config::BufferConfig;

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Multi-line, colored.
    #[default]
    Pretty,
    /// One line per event, no colors.
    Compact,
    /// One JSON object per event.
    Json,
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Fallback level when `RUST_LOG` is unset.
    pub level: Level,
    #[allow(missing_docs)]
    pub format: OutputFormat,
    /// Include source file and line.
    pub source_location: bool,
    /// Colors for the pretty format.
    pub ansi: bool,
}

impl LogSettings {
    /// Settings at `level`, pretty output.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            format: OutputFormat::Pretty,
            source_location: false,
            ansi: true,
        }
    }

    /// Settings taken from the `[application]` section.
    pub fn from_config(config: &BufferConfig) -> Result<Self, String> {
        let level = parse_log_level(&config.application.log_level)?;
        Ok(Self::new(level).format(config.application.log_format))
    }

    #[allow(missing_docs)]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[allow(missing_docs)]
    pub fn ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::layer()
            .with_file(self.source_location)
            .with_line_number(self.source_location)
            .with_thread_names(true);
        match self.format {
            OutputFormat::Pretty => base.pretty().with_ansi(self.ansi).boxed(),
            OutputFormat::Compact => base.compact().with_ansi(false).boxed(),
            OutputFormat::Json => base.json().boxed(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

/// Install the global subscriber described by the `[application]` section.
pub fn init_from_config(config: &BufferConfig) -> Result<(), String> {
    init(LogSettings::from_config(config)?)
}

/// Install the global subscriber.
///
/// A subscriber installed earlier (by a test harness or an embedding
/// application) is left in place and `Ok(())` is returned.
pub fn init(settings: LogSettings) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str().to_lowercase()));

    match tracing_subscriber::registry()
        .with(settings.layer())
        .with(filter)
        .try_init()
    {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("has already been set") => Ok(()),
        Err(e) => Err(format!("failed to install tracing subscriber: {e}")),
    }
}

/// Parse `trace`, `debug`, `info`, `warn` or `error`, case-insensitively.
pub fn parse_log_level(level: &str) -> Result<Level, String> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(format!("unknown log level '{level}'")),
    }
}
