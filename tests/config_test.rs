//! Configuration loading tests (TOML file + environment overrides).

use std::io::Write;

use eyetracker_buffer::config::BufferConfig;
use eyetracker_buffer::logging::OutputFormat;
use eyetracker_buffer::{BufferError, DataStream, StartOptions};
use serial_test::serial;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_minimal_config_uses_defaults() {
    let file = write_config(
        r#"
        [device]
        address = "tet-tcp://10.0.0.1"
        "#,
    );
    let config = BufferConfig::load_from(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.application.log_level, "info");
    assert_eq!(config.application.log_format, OutputFormat::Pretty);
    assert_eq!(config.device.sample_rate_hz, 600.0);
    assert_eq!(config.streams.enabled(), vec![DataStream::Gaze]);
    assert!(!config.log_channel.enabled);
    assert_eq!(config.consumer.poll_interval_ms, 100);
}

#[test]
#[serial]
fn test_full_config() {
    let file = write_config(
        r#"
        [application]
        log_level = "debug"
        log_format = "json"

        [device]
        address = "tet-tcp://10.0.0.1"
        sample_rate_hz = 120.0

        [streams.gaze]
        enabled = false

        [streams.eye_image]
        enabled = true
        initial_capacity = 16
        as_gif = true

        [log_channel]
        enabled = true
        initial_capacity = 8
        "#,
    );
    let config = BufferConfig::load_from(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.application.log_format, OutputFormat::Json);
    assert_eq!(config.streams.enabled(), vec![DataStream::EyeImage]);
    assert_eq!(
        config.streams.settings(DataStream::EyeImage).start_options(),
        StartOptions::with_capacity(16).gif(true)
    );
    assert_eq!(config.log_channel.initial_capacity, 8);
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let file = write_config(
        r#"
        [device]
        address = "tet-tcp://10.0.0.1"
        "#,
    );
    std::env::set_var("ETBUFFER_APPLICATION__LOG_LEVEL", "warn");
    std::env::set_var("ETBUFFER_STREAMS__TIME_SYNC__ENABLED", "true");
    let config = BufferConfig::load_from(file.path());
    std::env::remove_var("ETBUFFER_APPLICATION__LOG_LEVEL");
    std::env::remove_var("ETBUFFER_STREAMS__TIME_SYNC__ENABLED");

    let config = config.unwrap();
    assert_eq!(config.application.log_level, "warn");
    assert_eq!(
        config.streams.enabled(),
        vec![DataStream::Gaze, DataStream::TimeSync]
    );
}

#[test]
#[serial]
fn test_missing_device_is_config_error() {
    let file = write_config("[application]\nlog_level = \"info\"\n");
    assert!(matches!(
        BufferConfig::load_from(file.path()),
        Err(BufferError::Config(_))
    ));
}

#[test]
#[serial]
fn test_validation_rejects_bad_values() {
    let file = write_config(
        r#"
        [device]
        address = "  "
        "#,
    );
    let config = BufferConfig::load_from(file.path()).unwrap();
    assert!(matches!(config.validate(), Err(BufferError::Validation(_))));

    let file = write_config(
        r#"
        [device]
        address = "tet-tcp://10.0.0.1"

        [consumer]
        poll_interval_ms = 0
        "#,
    );
    let config = BufferConfig::load_from(file.path()).unwrap();
    assert!(config.validate().is_err());
}
