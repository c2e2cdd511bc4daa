//! Stream identifiers and time-range selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BufferError;

/// One independently buffered category of eye-tracker samples.
///
/// The set is closed: the diagnostic log is not a stream, it lives in the
/// process-wide [`log_channel`](crate::log_channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataStream {
    /// Gaze samples.
    Gaze,
    /// Eye camera images.
    EyeImage,
    /// External TTL signal changes.
    #[serde(rename = "externalSignal")]
    ExtSignal,
    /// Time synchronization packets.
    TimeSync,
}

impl DataStream {
    /// All streams, in a fixed order.
    pub const ALL: [DataStream; 4] = [
        DataStream::Gaze,
        DataStream::EyeImage,
        DataStream::ExtSignal,
        DataStream::TimeSync,
    ];

    /// Canonical name of the stream.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataStream::Gaze => "gaze",
            DataStream::EyeImage => "eyeImage",
            DataStream::ExtSignal => "externalSignal",
            DataStream::TimeSync => "timeSync",
        }
    }
}

impl fmt::Display for DataStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataStream {
    type Err = BufferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // separators are ignored so "eye_image" and "eyeImage" both match
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "gaze" => Ok(DataStream::Gaze),
            "eyeimage" => Ok(DataStream::EyeImage),
            "externalsignal" | "extsignal" => Ok(DataStream::ExtSignal),
            "timesync" => Ok(DataStream::TimeSync),
            _ => Err(BufferError::UnknownStream(s.to_string())),
        }
    }
}

/// Inclusive device-timestamp bounds for range operations.
///
/// An absent bound is unbounded on that side, so `TimeRange::all()` selects
/// the whole buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    /// Lowest timestamp to include.
    pub start: Option<i64>,
    /// Highest timestamp to include.
    pub end: Option<i64>,
}

impl TimeRange {
    /// Range covering every sample.
    pub fn all() -> Self {
        Self::default()
    }

    /// Range `[start, end]`, both inclusive.
    pub fn between(start: i64, end: i64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Everything at or after `start`.
    pub fn since(start: i64) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Everything at or before `end`.
    pub fn until(end: i64) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    pub(crate) fn bounds(&self) -> (i64, i64) {
        (self.start.unwrap_or(i64::MIN), self.end.unwrap_or(i64::MAX))
    }
}
