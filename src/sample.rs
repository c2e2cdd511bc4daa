//! Sample payloads delivered by the eye tracker.
//!
//! Every payload exposes a device timestamp through [`Timestamped`]; the
//! buffers only ever look at that value; the rest of the payload is stored
//! as delivered.

use bytes::Bytes;
use serde::Serialize;

/// A sample carrying a device-clock timestamp (microseconds).
pub trait Timestamped {
    /// Timestamp used for ordering and range selection.
    fn device_time_stamp(&self) -> i64;
}

/// A point in a normalised 2D coordinate system (display area).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point2 {
    #[allow(missing_docs)]
    pub x: f32,
    #[allow(missing_docs)]
    pub y: f32,
}

/// A point in the user coordinate system, in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point3 {
    #[allow(missing_docs)]
    pub x: f32,
    #[allow(missing_docs)]
    pub y: f32,
    #[allow(missing_docs)]
    pub z: f32,
}

/// Per-eye portion of a gaze sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EyeData {
    /// Gaze point on the display area, normalised.
    pub gaze_point_on_display_area: Point2,
    /// Gaze point in the user coordinate system.
    pub gaze_point_in_user_coordinates: Point3,
    /// Whether the gaze point is valid.
    pub gaze_point_valid: bool,
    /// Pupil diameter in millimetres.
    pub pupil_diameter: f32,
    /// Whether the pupil diameter is valid.
    pub pupil_valid: bool,
    /// Gaze origin in the user coordinate system.
    pub gaze_origin_in_user_coordinates: Point3,
    /// Whether the gaze origin is valid.
    pub gaze_origin_valid: bool,
}

/// One gaze sample for both eyes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GazeSample {
    /// Device clock, microseconds.
    pub device_time_stamp: i64,
    /// Host system clock, microseconds.
    pub system_time_stamp: i64,
    #[allow(missing_docs)]
    pub left_eye: EyeData,
    #[allow(missing_docs)]
    pub right_eye: EyeData,
}

/// Whether an eye image covers the full sensor or a region around the eye.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EyeImageKind {
    #[allow(missing_docs)]
    #[default]
    Full,
    #[allow(missing_docs)]
    Cropped,
}

/// An eye camera image. The pixel data is kept opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EyeImage {
    /// Device clock, microseconds.
    pub device_time_stamp: i64,
    /// Host system clock, microseconds.
    pub system_time_stamp: i64,
    /// Which eye camera produced the image.
    pub camera_id: u32,
    #[allow(missing_docs)]
    pub kind: EyeImageKind,
    /// `true` when `data` holds a GIF-encoded image rather than raw pixels.
    pub is_gif: bool,
    /// Width in pixels (0 for GIF images).
    pub width: u32,
    /// Height in pixels (0 for GIF images).
    pub height: u32,
    #[allow(missing_docs)]
    pub bits_per_pixel: u32,
    #[allow(missing_docs)]
    pub padding_per_pixel: u32,
    /// Image bytes exactly as delivered.
    pub data: Bytes,
}

/// What caused an external signal sample to be emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtSignalChange {
    /// The signal value changed.
    #[default]
    ValueChanged,
    /// First value reported after subscription.
    InitialValue,
    /// First value after the connection was re-established.
    ConnectionRestored,
}

/// A change on the external synchronization port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ExtSignal {
    /// Device clock, microseconds.
    pub device_time_stamp: i64,
    /// Host system clock, microseconds.
    pub system_time_stamp: i64,
    /// Port value after the change.
    pub value: u32,
    #[allow(missing_docs)]
    pub change_type: ExtSignalChange,
}

/// A round-trip clock synchronization measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimeSync {
    /// Host clock when the request was sent.
    pub system_request_time_stamp: i64,
    /// Device clock when the request was answered.
    pub device_time_stamp: i64,
    /// Host clock when the response arrived.
    pub system_response_time_stamp: i64,
}

/// Component that produced a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSourceKind {
    #[allow(missing_docs)]
    StreamEngine,
    #[allow(missing_docs)]
    Sdk,
    #[allow(missing_docs)]
    FirmwareUpgrade,
}

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    #[allow(missing_docs)]
    Error,
    #[allow(missing_docs)]
    Warning,
    #[allow(missing_docs)]
    Information,
    #[allow(missing_docs)]
    Debug,
    #[allow(missing_docs)]
    Trace,
}

/// A diagnostic message from the eye-tracker runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogMessage {
    /// Host system clock, microseconds.
    pub system_time_stamp: i64,
    #[allow(missing_docs)]
    pub source: LogSourceKind,
    #[allow(missing_docs)]
    pub level: LogLevel,
    #[allow(missing_docs)]
    pub message: String,
}

impl Timestamped for GazeSample {
    fn device_time_stamp(&self) -> i64 {
        self.device_time_stamp
    }
}

impl Timestamped for EyeImage {
    fn device_time_stamp(&self) -> i64 {
        self.device_time_stamp
    }
}

impl Timestamped for ExtSignal {
    fn device_time_stamp(&self) -> i64 {
        self.device_time_stamp
    }
}

impl Timestamped for TimeSync {
    fn device_time_stamp(&self) -> i64 {
        self.device_time_stamp
    }
}

// Log messages only carry a host timestamp.
impl Timestamped for LogMessage {
    fn device_time_stamp(&self) -> i64 {
        self.system_time_stamp
    }
}

impl GazeSample {
    /// Gaze sample with only timestamps set, mostly useful in tests.
    pub fn at(device_time_stamp: i64) -> Self {
        Self {
            device_time_stamp,
            ..Default::default()
        }
    }
}

impl ExtSignal {
    /// External signal sample with the given timestamp and value.
    pub fn at(device_time_stamp: i64, value: u32) -> Self {
        Self {
            device_time_stamp,
            value,
            ..Default::default()
        }
    }
}

impl TimeSync {
    /// Time sync sample with the given device timestamp.
    pub fn at(device_time_stamp: i64) -> Self {
        Self {
            device_time_stamp,
            ..Default::default()
        }
    }
}

impl EyeImage {
    /// Eye image with the given timestamp and payload.
    pub fn at(device_time_stamp: i64, data: impl Into<Bytes>) -> Self {
        Self {
            device_time_stamp,
            data: data.into(),
            ..Default::default()
        }
    }
}
