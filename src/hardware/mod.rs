//! Eye-tracker hardware interface.
//!
//! The buffering core never talks to a driver directly. It only needs the
//! small surface defined here:
//!
//! - [`EyeTracker`]: per-device stream subscription
//! - [`Connector`]: opening a device by address
//! - [`LogSource`]: the process-wide diagnostic log callback
//!
//! Callbacks are plain closures. Each stream kind has its own payload type, so
//! a [`Subscription`] carries the typed callback for exactly one stream.
//!
//! # Threading
//!
//! Implementations may invoke callbacks from any thread, one per stream or a
//! shared one. Callbacks must not be invoked again once `unsubscribe` for that
//! stream has returned.

pub mod mock;

use std::sync::Arc;

use crate::error::DeviceError;
use crate::sample::{EyeImage, ExtSignal, GazeSample, LogMessage, TimeSync};
use crate::stream::DataStream;

pub use mock::{MockConnector, MockEyeTracker, MockLogSource};

/// Producer callback for samples of type `T`.
pub type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Callback receiving diagnostic log messages.
pub type LogCallback = Callback<LogMessage>;

/// A request to deliver one stream's samples to a callback.
#[derive(Clone)]
pub enum Subscription {
    /// Gaze samples.
    Gaze(Callback<GazeSample>),
    /// Eye images, either raw or GIF encoded.
    EyeImage {
        /// Ask the device for GIF-encoded images.
        as_gif: bool,
        #[allow(missing_docs)]
        callback: Callback<EyeImage>,
    },
    /// External signal changes.
    ExtSignal(Callback<ExtSignal>),
    /// Time synchronization packets.
    TimeSync(Callback<TimeSync>),
}

impl Subscription {
    /// The stream this subscription is for.
    pub fn stream(&self) -> DataStream {
        match self {
            Subscription::Gaze(_) => DataStream::Gaze,
            Subscription::EyeImage { .. } => DataStream::EyeImage,
            Subscription::ExtSignal(_) => DataStream::ExtSignal,
            Subscription::TimeSync(_) => DataStream::TimeSync,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subscription::EyeImage { as_gif, .. } => f
                .debug_struct("Subscription")
                .field("stream", &self.stream())
                .field("as_gif", as_gif)
                .finish(),
            _ => f
                .debug_struct("Subscription")
                .field("stream", &self.stream())
                .finish(),
        }
    }
}

/// An opened eye tracker.
pub trait EyeTracker: Send + Sync {
    /// Address the device was opened on.
    fn address(&self) -> &str;

    /// Whether the device can deliver `stream` at all.
    fn is_stream_supported(&self, stream: DataStream) -> bool;

    /// Start delivering samples to the subscription's callback.
    fn subscribe(&self, subscription: Subscription) -> Result<(), DeviceError>;

    /// Stop delivering samples for `stream`.
    fn unsubscribe(&self, stream: DataStream) -> Result<(), DeviceError>;
}

/// Opens eye trackers by address.
pub trait Connector {
    /// Open and validate the eye tracker at `address`.
    fn connect(&self, address: &str) -> anyhow::Result<Arc<dyn EyeTracker>>;
}

/// Process-wide source of diagnostic log messages.
pub trait LogSource: Send + Sync {
    /// Install the log callback.
    fn register_log_callback(&self, callback: LogCallback) -> Result<(), DeviceError>;

    /// Remove the log callback.
    fn unregister_log_callback(&self) -> Result<(), DeviceError>;
}
