//! CLI Entry Point for etbuffer
//!
//! Drives a [`BufferManager`] against a simulated eye tracker:
//! - `run` buffers the configured streams and drains them on a fixed poll
//!   interval until Ctrl+C or the requested duration elapses
//! - `streams` lists the stream identifiers accepted in configuration
//!
//! # Usage
//!
//! ```bash
//! etbuffer run --config config/etbuffer.toml --duration-secs 5
//! ETBUFFER_STREAMS__TIME_SYNC__ENABLED=true etbuffer run --json
//! etbuffer run --stream gaze --stream external_signal
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eyetracker_buffer::config::BufferConfig;
use eyetracker_buffer::hardware::{LogSource, MockConnector, MockEyeTracker, MockLogSource};
use eyetracker_buffer::sample::LogLevel;
use eyetracker_buffer::{log_channel, logging, BufferManager, DataStream, StreamSamples};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "etbuffer")]
#[command(about = "Buffer eye-tracker data streams for polling consumers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Buffer the configured streams and poll them
    Run {
        /// Path to the TOML configuration file
        #[arg(long, default_value = "config/etbuffer.toml")]
        config: PathBuf,

        /// Stop after this many seconds (runs until Ctrl+C when absent)
        #[arg(long)]
        duration_secs: Option<u64>,

        /// Print every consumed gaze sample as a JSON line on stdout
        #[arg(long)]
        json: bool,

        /// Buffer only these streams instead of the configured ones (repeatable)
        #[arg(long = "stream")]
        streams: Vec<DataStream>,
    },

    /// List the stream identifiers
    Streams,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            duration_secs,
            json,
            streams,
        } => run(config, duration_secs.map(Duration::from_secs), json, streams).await,
        Commands::Streams => {
            for stream in DataStream::ALL {
                println!("{stream}");
            }
            Ok(())
        }
    }
}

async fn run(
    config_path: PathBuf,
    duration: Option<Duration>,
    json: bool,
    streams: Vec<DataStream>,
) -> Result<()> {
    let config = BufferConfig::load_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    config.validate()?;
    logging::init_from_config(&config).map_err(anyhow::Error::msg)?;

    info!(name = %config.application.name, address = %config.device.address, "starting");

    let tracker = Arc::new(MockEyeTracker::new(config.device.address.clone()));
    let connector = MockConnector::new().with_device(Arc::clone(&tracker));
    let manager = BufferManager::connect(&connector, &config.device.address)?;

    let log_source = Arc::new(MockLogSource::new());
    if config.log_channel.enabled {
        let source: Arc<dyn LogSource> = log_source.clone();
        if !log_channel::start_logging(source, Some(config.log_channel.initial_capacity)) {
            warn!("log channel could not be started");
        }
    }

    let streams = if streams.is_empty() {
        config.streams.enabled()
    } else {
        streams
    };
    for stream in streams {
        let options = config.streams.settings(stream).start_options();
        if !manager.start(stream, options) {
            warn!(%stream, "stream not started");
        }
    }

    tracker.start_pacer(config.device.sample_rate_hz);
    log_source.emit(LogLevel::Information, "simulated tracker streaming");

    let mut ticker = tokio::time::interval(Duration::from_millis(config.consumer.poll_interval_ms));
    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut totals = [0usize; DataStream::ALL.len()];
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for (i, stream) in DataStream::ALL.into_iter().enumerate() {
                    let samples = manager.consume_stream_n(stream, None);
                    totals[i] += samples.len();
                    if json {
                        print_json(&samples)?;
                    }
                }
                for message in log_channel::get_log(Some(true)) {
                    info!(level = ?message.level, source = ?message.source, "{}", message.message);
                }
            }
            _ = &mut deadline => break,
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("interrupted");
                break;
            }
        }
    }

    tracker.stop_pacer();
    for stream in DataStream::ALL {
        if manager.is_buffering(stream) {
            manager.stop(stream, Some(true));
        }
    }
    if log_channel::is_logging() {
        log_channel::stop_logging();
    }

    for (stream, total) in DataStream::ALL.into_iter().zip(totals) {
        info!(%stream, consumed = total, "finished");
    }
    Ok(())
}

fn print_json(samples: &StreamSamples) -> Result<()> {
    if let StreamSamples::Gaze(gaze) = samples {
        for sample in gaze {
            println!("{}", serde_json::to_string(sample)?);
        }
    }
    Ok(())
}
