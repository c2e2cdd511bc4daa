//! Buffer manager: one controller per stream for one eye tracker.
//!
//! `BufferManager` does no buffering itself. It routes every call to the
//! [`StreamController`] for the requested stream, either by payload type
//! (`manager.consume_n::<GazeSample>(None)`) or by [`DataStream`] identifier
//! (`manager.consume_stream_n(DataStream::Gaze, None)`), and it guarantees
//! that every subscription is cancelled before the buffers are released.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use eyetracker_buffer::controller::StartOptions;
//! use eyetracker_buffer::hardware::{MockConnector, MockEyeTracker};
//! use eyetracker_buffer::manager::BufferManager;
//! use eyetracker_buffer::sample::GazeSample;
//! use eyetracker_buffer::stream::DataStream;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = Arc::new(MockEyeTracker::new("tet-tcp://mock"));
//! let connector = MockConnector::new().with_device(Arc::clone(&tracker));
//! let manager = BufferManager::connect(&connector, "tet-tcp://mock")?;
//!
//! assert!(manager.start(DataStream::Gaze, StartOptions::with_capacity(64)));
//! tracker.emit_gaze(GazeSample::at(100));
//! let samples = manager.consume_n::<GazeSample>(None);
//! assert_eq!(samples.len(), 1);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::controller::{StartOptions, StreamControl, StreamController, StreamPayload};
use crate::error::{BufferError, BufferResult};
use crate::hardware::{Connector, EyeTracker};
use crate::sample::{EyeImage, ExtSignal, GazeSample, TimeSync};
use crate::stream::{DataStream, TimeRange};

/// Samples of any stream, returned by the identifier-based operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamSamples {
    #[allow(missing_docs)]
    Gaze(Vec<GazeSample>),
    #[allow(missing_docs)]
    EyeImage(Vec<EyeImage>),
    #[allow(missing_docs)]
    ExtSignal(Vec<ExtSignal>),
    #[allow(missing_docs)]
    TimeSync(Vec<TimeSync>),
}

impl StreamSamples {
    /// Stream the samples came from.
    pub fn stream(&self) -> DataStream {
        match self {
            StreamSamples::Gaze(_) => DataStream::Gaze,
            StreamSamples::EyeImage(_) => DataStream::EyeImage,
            StreamSamples::ExtSignal(_) => DataStream::ExtSignal,
            StreamSamples::TimeSync(_) => DataStream::TimeSync,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            StreamSamples::Gaze(v) => v.len(),
            StreamSamples::EyeImage(v) => v.len(),
            StreamSamples::ExtSignal(v) => v.len(),
            StreamSamples::TimeSync(v) => v.len(),
        }
    }

    /// Whether no samples were returned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Device timestamps of the samples, in order.
    pub fn device_time_stamps(&self) -> Vec<i64> {
        use crate::sample::Timestamped;
        fn stamps<T: Timestamped>(v: &[T]) -> Vec<i64> {
            v.iter().map(Timestamped::device_time_stamp).collect()
        }
        match self {
            StreamSamples::Gaze(v) => stamps(v),
            StreamSamples::EyeImage(v) => stamps(v),
            StreamSamples::ExtSignal(v) => stamps(v),
            StreamSamples::TimeSync(v) => stamps(v),
        }
    }
}

/// A payload routed to its controller inside a [`BufferManager`].
pub trait ManagedPayload: StreamPayload {
    /// The manager's controller for this payload.
    fn controller(manager: &BufferManager) -> &StreamController<Self>;
    /// Wrap samples for identifier-based results.
    fn wrap(samples: Vec<Self>) -> StreamSamples;
}

impl ManagedPayload for GazeSample {
    fn controller(manager: &BufferManager) -> &StreamController<Self> {
        &manager.gaze
    }
    fn wrap(samples: Vec<Self>) -> StreamSamples {
        StreamSamples::Gaze(samples)
    }
}

impl ManagedPayload for EyeImage {
    fn controller(manager: &BufferManager) -> &StreamController<Self> {
        &manager.eye_image
    }
    fn wrap(samples: Vec<Self>) -> StreamSamples {
        StreamSamples::EyeImage(samples)
    }
}

impl ManagedPayload for ExtSignal {
    fn controller(manager: &BufferManager) -> &StreamController<Self> {
        &manager.ext_signal
    }
    fn wrap(samples: Vec<Self>) -> StreamSamples {
        StreamSamples::ExtSignal(samples)
    }
}

impl ManagedPayload for TimeSync {
    fn controller(manager: &BufferManager) -> &StreamController<Self> {
        &manager.time_sync
    }
    fn wrap(samples: Vec<Self>) -> StreamSamples {
        StreamSamples::TimeSync(samples)
    }
}

#[derive(Clone, Copy)]
enum Read {
    ConsumeN(Option<usize>),
    ConsumeRange(TimeRange),
    PeekN(Option<usize>),
    PeekRange(TimeRange),
}

fn read<T: ManagedPayload>(controller: &StreamController<T>, op: Read) -> StreamSamples {
    let samples = match op {
        Read::ConsumeN(n) => controller.consume_n(n),
        Read::ConsumeRange(range) => controller.consume_time_range(range),
        Read::PeekN(n) => controller.peek_n(n),
        Read::PeekRange(range) => controller.peek_time_range(range),
    };
    T::wrap(samples)
}

/// Owns exactly one [`StreamController`] per [`DataStream`] for one device.
pub struct BufferManager {
    device: Arc<dyn EyeTracker>,
    gaze: StreamController<GazeSample>,
    eye_image: StreamController<EyeImage>,
    ext_signal: StreamController<ExtSignal>,
    time_sync: StreamController<TimeSync>,
}

impl BufferManager {
    /// Open the eye tracker at `address` and create idle controllers for it.
    pub fn connect(connector: &dyn Connector, address: &str) -> BufferResult<Self> {
        let device = connector
            .connect(address)
            .map_err(|err| BufferError::DeviceOpen {
                address: address.to_string(),
                reason: format!("{err:#}"),
            })?;
        Ok(Self::from_device(device))
    }

    /// Wrap an already opened eye tracker.
    pub fn from_device(device: Arc<dyn EyeTracker>) -> Self {
        info!(address = device.address(), "buffer manager created");
        Self {
            gaze: StreamController::new(Arc::clone(&device)),
            eye_image: StreamController::new(Arc::clone(&device)),
            ext_signal: StreamController::new(Arc::clone(&device)),
            time_sync: StreamController::new(Arc::clone(&device)),
            device,
        }
    }

    /// Address of the underlying eye tracker.
    pub fn address(&self) -> &str {
        self.device.address()
    }

    /// Type-erased controller for `stream`.
    pub fn control(&self, stream: DataStream) -> &dyn StreamControl {
        match stream {
            DataStream::Gaze => &self.gaze,
            DataStream::EyeImage => &self.eye_image,
            DataStream::ExtSignal => &self.ext_signal,
            DataStream::TimeSync => &self.time_sync,
        }
    }

    /// Typed controller for payload `T`.
    pub fn controller<T: ManagedPayload>(&self) -> &StreamController<T> {
        T::controller(self)
    }

    /// Whether the device supports `stream`.
    pub fn has_stream(&self, stream: DataStream) -> bool {
        self.control(stream).has_stream()
    }

    /// Start buffering `stream`. See [`StreamController::start`].
    pub fn start(&self, stream: DataStream, options: StartOptions) -> bool {
        self.control(stream).start(options)
    }

    /// Whether `stream` is currently buffering.
    pub fn is_buffering(&self, stream: DataStream) -> bool {
        self.control(stream).is_buffering()
    }

    /// Stop buffering `stream`. See [`StreamController::stop`].
    pub fn stop(&self, stream: DataStream, empty_buffer: Option<bool>) -> bool {
        self.control(stream).stop(empty_buffer)
    }

    /// Remove every buffered sample of `stream`.
    pub fn clear(&self, stream: DataStream) {
        self.control(stream).clear();
    }

    /// Remove the buffered samples of `stream` within `range`.
    pub fn clear_time_range(&self, stream: DataStream, range: TimeRange) {
        self.control(stream).clear_time_range(range);
    }

    /// Number of samples currently buffered for `stream`.
    pub fn buffered(&self, stream: DataStream) -> usize {
        self.control(stream).buffered()
    }

    /// Remove and return the oldest `n` samples (all when `None`).
    pub fn consume_n<T: ManagedPayload>(&self, n: Option<usize>) -> Vec<T> {
        self.controller::<T>().consume_n(n)
    }

    /// Remove and return the samples within `range`.
    pub fn consume_time_range<T: ManagedPayload>(&self, range: TimeRange) -> Vec<T> {
        self.controller::<T>().consume_time_range(range)
    }

    /// Copy the newest `n` samples (one when `None`).
    pub fn peek_n<T: ManagedPayload>(&self, n: Option<usize>) -> Vec<T> {
        self.controller::<T>().peek_n(n)
    }

    /// Copy the samples within `range`.
    pub fn peek_time_range<T: ManagedPayload>(&self, range: TimeRange) -> Vec<T> {
        self.controller::<T>().peek_time_range(range)
    }

    /// [`consume_n`](Self::consume_n) selected by identifier.
    pub fn consume_stream_n(&self, stream: DataStream, n: Option<usize>) -> StreamSamples {
        self.read(stream, Read::ConsumeN(n))
    }

    /// [`consume_time_range`](Self::consume_time_range) selected by identifier.
    pub fn consume_stream_time_range(&self, stream: DataStream, range: TimeRange) -> StreamSamples {
        self.read(stream, Read::ConsumeRange(range))
    }

    /// [`peek_n`](Self::peek_n) selected by identifier.
    pub fn peek_stream_n(&self, stream: DataStream, n: Option<usize>) -> StreamSamples {
        self.read(stream, Read::PeekN(n))
    }

    /// [`peek_time_range`](Self::peek_time_range) selected by identifier.
    pub fn peek_stream_time_range(&self, stream: DataStream, range: TimeRange) -> StreamSamples {
        self.read(stream, Read::PeekRange(range))
    }

    fn read(&self, stream: DataStream, op: Read) -> StreamSamples {
        match stream {
            DataStream::Gaze => read(&self.gaze, op),
            DataStream::EyeImage => read(&self.eye_image, op),
            DataStream::ExtSignal => read(&self.ext_signal, op),
            DataStream::TimeSync => read(&self.time_sync, op),
        }
    }
}

impl Drop for BufferManager {
    fn drop(&mut self) {
        // Unsubscribe before the controllers (and their buffers) are dropped.
        for stream in DataStream::ALL {
            let control = self.control(stream);
            if control.is_buffering() && !control.stop(None) {
                warn!(%stream, "unsubscribe failed during teardown");
            }
        }
        info!(address = self.device.address(), "buffer manager released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{MockConnector, MockEyeTracker};

    fn manager() -> (Arc<MockEyeTracker>, BufferManager) {
        let tracker = Arc::new(MockEyeTracker::new("tet-tcp://mock"));
        let manager = BufferManager::from_device(Arc::clone(&tracker) as Arc<dyn EyeTracker>);
        (tracker, manager)
    }

    #[test]
    fn test_connect_unknown_address_fails() {
        let connector = MockConnector::new();
        let err = BufferManager::connect(&connector, "tet-tcp://nowhere").err();
        assert!(matches!(err, Some(BufferError::DeviceOpen { address, .. }) if address == "tet-tcp://nowhere"));
    }

    #[test]
    fn test_routes_by_identifier() {
        let (tracker, manager) = manager();
        for stream in DataStream::ALL {
            assert!(manager.start(stream, StartOptions::with_capacity(8)));
        }
        tracker.emit_gaze(GazeSample::at(1));
        tracker.emit_ext_signal(ExtSignal::at(2, 1));
        tracker.emit_time_sync(TimeSync::at(3));
        tracker.emit_eye_image(EyeImage::at(4, vec![9u8]));

        assert_eq!(manager.buffered(DataStream::Gaze), 1);
        let ext = manager.consume_stream_n(DataStream::ExtSignal, None);
        assert_eq!(ext.stream(), DataStream::ExtSignal);
        assert_eq!(ext.device_time_stamps(), vec![2]);
        assert_eq!(manager.peek_stream_n(DataStream::TimeSync, None).len(), 1);
        assert_eq!(
            manager
                .consume_stream_time_range(DataStream::EyeImage, TimeRange::all())
                .len(),
            1
        );
        assert!(manager.consume_n::<ExtSignal>(None).is_empty());
    }

    #[test]
    fn test_typed_and_identifier_views_share_buffer() {
        let (tracker, manager) = manager();
        manager.start(DataStream::Gaze, StartOptions::with_capacity(8));
        for ts in [10, 20, 30] {
            tracker.emit_gaze(GazeSample::at(ts));
        }
        let peeked = manager.peek_stream_time_range(DataStream::Gaze, TimeRange::since(20));
        assert_eq!(peeked.device_time_stamps(), vec![20, 30]);
        assert_eq!(manager.peek_time_range::<GazeSample>(TimeRange::since(20)).len(), 2);
        manager.clear_time_range(DataStream::Gaze, TimeRange::until(15));
        assert_eq!(manager.buffered(DataStream::Gaze), 2);
        manager.clear(DataStream::Gaze);
        assert_eq!(manager.buffered(DataStream::Gaze), 0);
    }

    #[test]
    fn test_drop_unsubscribes_buffering_streams() {
        let (tracker, manager) = manager();
        manager.start(DataStream::Gaze, StartOptions::with_capacity(8));
        manager.start(DataStream::TimeSync, StartOptions::with_capacity(8));
        manager.stop(DataStream::TimeSync, None);
        drop(manager);
        assert_eq!(tracker.subscriber_count(DataStream::Gaze), 0);
        assert_eq!(tracker.subscriber_count(DataStream::TimeSync), 0);
        // firing after teardown is a no-op
        tracker.emit_gaze(GazeSample::at(1));
    }
}
