//! Per-stream subscription lifecycle.
//!
//! A [`StreamController`] owns one [`StreamBuffer`] and the subscription that
//! feeds it:
//!
//! ```text
//!            start (ok)            stop
//!   Idle ─────────────▶ Buffering ──────▶ Stopped
//!    │                    ▲   │ start:       │
//!    │ start (rejected)   │   │ already      │ start (ok)
//!    ▼                    │   ▼ running      │
//!   Idle                  └── Buffering ◀────┘
//! ```
//!
//! The producer callback handed to the eye tracker only holds a `Weak`
//! reference to the buffer, so a callback that fires after the controller is
//! gone does nothing.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::buffer::StreamBuffer;
use crate::hardware::{Callback, EyeTracker, Subscription};
use crate::sample::{EyeImage, ExtSignal, GazeSample, TimeSync, Timestamped};
use crate::stream::{DataStream, TimeRange};

/// Lifecycle state of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Never started.
    Idle,
    /// Subscribed and appending samples.
    Buffering,
    /// Unsubscribed; buffered samples are kept unless emptied on stop.
    Stopped,
}

/// Options for [`StreamController::start`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartOptions {
    /// Capacity to reserve up front. Defaults to the stream's
    /// [`StreamPayload::DEFAULT_CAPACITY`].
    pub initial_capacity: Option<usize>,
    /// Request GIF-encoded eye images. Ignored by other streams; default `false`.
    pub as_gif: Option<bool>,
}

impl StartOptions {
    /// Options with an explicit initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            initial_capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Set the GIF flag.
    pub fn gif(mut self, as_gif: bool) -> Self {
        self.as_gif = Some(as_gif);
        self
    }
}

/// A payload type that is delivered on one eye-tracker stream.
pub trait StreamPayload: Timestamped + Clone + Send + Sync + 'static {
    /// Stream carrying this payload.
    const STREAM: DataStream;
    /// Capacity reserved on start when none is given.
    const DEFAULT_CAPACITY: usize;

    /// Build the subscription request for this stream.
    fn subscription(callback: Callback<Self>, options: &StartOptions) -> Subscription;
}

impl StreamPayload for GazeSample {
    const STREAM: DataStream = DataStream::Gaze;
    const DEFAULT_CAPACITY: usize = 1 << 20;

    fn subscription(callback: Callback<Self>, _options: &StartOptions) -> Subscription {
        Subscription::Gaze(callback)
    }
}

impl StreamPayload for EyeImage {
    const STREAM: DataStream = DataStream::EyeImage;
    const DEFAULT_CAPACITY: usize = 1 << 12;

    fn subscription(callback: Callback<Self>, options: &StartOptions) -> Subscription {
        Subscription::EyeImage {
            as_gif: options.as_gif.unwrap_or(false),
            callback,
        }
    }
}

impl StreamPayload for ExtSignal {
    const STREAM: DataStream = DataStream::ExtSignal;
    const DEFAULT_CAPACITY: usize = 1 << 10;

    fn subscription(callback: Callback<Self>, _options: &StartOptions) -> Subscription {
        Subscription::ExtSignal(callback)
    }
}

impl StreamPayload for TimeSync {
    const STREAM: DataStream = DataStream::TimeSync;
    const DEFAULT_CAPACITY: usize = 1 << 10;

    fn subscription(callback: Callback<Self>, _options: &StartOptions) -> Subscription {
        Subscription::TimeSync(callback)
    }
}

/// Type-erased view of a controller, used for dispatch by [`DataStream`].
pub trait StreamControl: Send + Sync {
    /// Stream this controller manages.
    fn stream(&self) -> DataStream;
    /// Current lifecycle state.
    fn state(&self) -> StreamState;
    /// See [`StreamController::start`].
    fn start(&self, options: StartOptions) -> bool;
    /// See [`StreamController::stop`].
    fn stop(&self, empty_buffer: Option<bool>) -> bool;
    /// Whether the stream is subscribed and appending.
    fn is_buffering(&self) -> bool {
        self.state() == StreamState::Buffering
    }
    /// Whether the device supports this stream.
    fn has_stream(&self) -> bool;
    /// Remove every buffered sample.
    fn clear(&self);
    /// Remove the buffered samples within `range`.
    fn clear_time_range(&self, range: TimeRange);
    /// Number of buffered samples.
    fn buffered(&self) -> usize;
}

/// Owns one stream's buffer and its subscription.
pub struct StreamController<T> {
    device: Arc<dyn EyeTracker>,
    buffer: Arc<StreamBuffer<T>>,
    state: Mutex<StreamState>,
}

impl<T: StreamPayload> StreamController<T> {
    /// Create an idle controller for `device`.
    pub fn new(device: Arc<dyn EyeTracker>) -> Self {
        Self {
            device,
            buffer: Arc::new(StreamBuffer::new()),
            state: Mutex::new(StreamState::Idle),
        }
    }

    /// The buffer fed by this controller.
    pub fn buffer(&self) -> &StreamBuffer<T> {
        &self.buffer
    }

    /// Subscribe to the stream and start buffering.
    ///
    /// Capacity is reserved before the subscription is made, so the producer
    /// never waits on a reallocation. Returns `false` if the stream is already
    /// buffering or if the device rejects the subscription; a rejected start
    /// releases the capacity it reserved. Must not be called from the producer
    /// callback.
    pub fn start(&self, options: StartOptions) -> bool {
        let mut state = self.state.lock();
        if *state == StreamState::Buffering {
            debug!(stream = %T::STREAM, "start ignored: already buffering");
            return false;
        }

        // reserve while no producer can contend for the buffer lock
        let capacity = options.initial_capacity.unwrap_or(T::DEFAULT_CAPACITY);
        let previous_capacity = self.buffer.capacity();
        self.buffer.reserve(capacity);

        let buffer = Arc::downgrade(&self.buffer);
        let callback: Callback<T> = Arc::new(move |sample: T| {
            if let Some(buffer) = buffer.upgrade() {
                buffer.append(sample);
            }
        });

        match self.device.subscribe(T::subscription(callback, &options)) {
            Ok(()) => {
                *state = StreamState::Buffering;
                info!(
                    stream = %T::STREAM,
                    address = self.device.address(),
                    capacity,
                    "started buffering"
                );
                true
            }
            Err(err) => {
                if self.buffer.capacity() > previous_capacity {
                    self.buffer.shrink_to_fit();
                }
                warn!(stream = %T::STREAM, error = %err, "subscription rejected");
                false
            }
        }
    }

    /// Unsubscribe and stop buffering, optionally emptying the buffer
    /// (default: keep the samples).
    ///
    /// Returns `false` if the stream was not buffering. When the device
    /// reports an error on unsubscribe the stream is still considered stopped
    /// and `false` is returned. If the device did in fact keep the old
    /// callback, a later `start` registers a second one and every sample is
    /// buffered twice; callers seeing `false` here should reconnect rather
    /// than restart the stream.
    pub fn stop(&self, empty_buffer: Option<bool>) -> bool {
        let mut state = self.state.lock();
        if *state != StreamState::Buffering {
            debug!(stream = %T::STREAM, "stop ignored: not buffering");
            return false;
        }

        let result = self.device.unsubscribe(T::STREAM);
        *state = StreamState::Stopped;
        if empty_buffer.unwrap_or(false) {
            self.buffer.clear();
        }

        match result {
            Ok(()) => {
                info!(stream = %T::STREAM, buffered = self.buffer.len(), "stopped buffering");
                true
            }
            Err(err) => {
                warn!(stream = %T::STREAM, error = %err, "unsubscribe failed");
                false
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        *self.state.lock()
    }

    /// Whether the stream is subscribed and appending.
    pub fn is_buffering(&self) -> bool {
        self.state() == StreamState::Buffering
    }

    /// Whether the device supports this stream, regardless of state.
    pub fn has_stream(&self) -> bool {
        self.device.is_stream_supported(T::STREAM)
    }

    /// See [`StreamBuffer::consume_n`].
    pub fn consume_n(&self, n: Option<usize>) -> Vec<T> {
        self.buffer.consume_n(n)
    }

    /// See [`StreamBuffer::consume_time_range`].
    pub fn consume_time_range(&self, range: TimeRange) -> Vec<T> {
        self.buffer.consume_time_range(range)
    }

    /// See [`StreamBuffer::peek_n`].
    pub fn peek_n(&self, n: Option<usize>) -> Vec<T> {
        self.buffer.peek_n(n)
    }

    /// See [`StreamBuffer::peek_time_range`].
    pub fn peek_time_range(&self, range: TimeRange) -> Vec<T> {
        self.buffer.peek_time_range(range)
    }

    /// See [`StreamBuffer::clear`].
    pub fn clear(&self) {
        self.buffer.clear();
    }

    /// See [`StreamBuffer::clear_time_range`].
    pub fn clear_time_range(&self, range: TimeRange) {
        self.buffer.clear_time_range(range);
    }
}

impl<T: StreamPayload> StreamControl for StreamController<T> {
    fn stream(&self) -> DataStream {
        T::STREAM
    }

    fn state(&self) -> StreamState {
        StreamController::state(self)
    }

    fn start(&self, options: StartOptions) -> bool {
        StreamController::start(self, options)
    }

    fn stop(&self, empty_buffer: Option<bool>) -> bool {
        StreamController::stop(self, empty_buffer)
    }

    fn has_stream(&self) -> bool {
        StreamController::has_stream(self)
    }

    fn clear(&self) {
        StreamController::clear(self);
    }

    fn clear_time_range(&self, range: TimeRange) {
        StreamController::clear_time_range(self, range);
    }

    fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
