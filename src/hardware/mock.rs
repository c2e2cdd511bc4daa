//! Mock Hardware Implementations
//!
//! Provides a simulated eye tracker for testing without physical hardware.
//!
//! # Available Mocks
//!
//! - `MockEyeTracker` - Simulated device with per-stream subscriptions and
//!   deterministic `emit_*` helpers, plus an optional pacer thread that
//!   produces gaze, eye image and time sync data at a fixed rate
//! - `MockConnector` - Resolves addresses to registered mock devices
//! - `MockLogSource` - Process-wide log callback slot with an `emit` helper
//!
//! Callbacks are invoked on the calling thread (for `emit_*`) or on the pacer
//! thread while the subscription list is read-locked, so `unsubscribe` returns
//! only after in-flight callbacks for that stream have finished. Callbacks must
//! not subscribe or unsubscribe.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::anyhow;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use tracing::{debug, info, warn};

use super::{Callback, Connector, EyeTracker, LogCallback, LogSource, Subscription};
use crate::error::DeviceError;
use crate::sample::{
    EyeData, EyeImage, EyeImageKind, ExtSignal, GazeSample, LogLevel, LogMessage, LogSourceKind,
    Point2, Point3, TimeSync,
};
use crate::stream::DataStream;

/// Host clock in microseconds.
fn system_time_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

// =============================================================================
// MockEyeTracker - Simulated Eye Tracker
// =============================================================================

/// Simulated eye tracker.
///
/// Every `subscribe` call adds a callback, so a double subscription would
/// deliver each sample twice; tests rely on this to detect duplicate
/// registrations.
///
/// # Example
///
/// ```rust
/// use eyetracker_buffer::hardware::MockEyeTracker;
/// use eyetracker_buffer::sample::GazeSample;
///
/// let tracker = MockEyeTracker::new("tet-tcp://mock");
/// tracker.emit_gaze(GazeSample::at(10)); // no subscribers: dropped
/// ```
pub struct MockEyeTracker {
    address: String,
    supported: HashSet<DataStream>,
    connected: AtomicBool,
    subscriptions: RwLock<Vec<Subscription>>,
    subscribe_calls: AtomicUsize,
    pacer: Mutex<Option<Pacer>>,
}

struct Pacer {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl MockEyeTracker {
    /// Create a mock tracker supporting every stream.
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_streams(address, &DataStream::ALL)
    }

    /// Create a mock tracker supporting only `streams`.
    pub fn with_streams(address: impl Into<String>, streams: &[DataStream]) -> Self {
        Self {
            address: address.into(),
            supported: streams.iter().copied().collect(),
            connected: AtomicBool::new(true),
            subscriptions: RwLock::new(Vec::new()),
            subscribe_calls: AtomicUsize::new(0),
            pacer: Mutex::new(None),
        }
    }

    /// Simulate losing (or regaining) the connection. While disconnected all
    /// subscription requests fail.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Number of callbacks currently registered for `stream`.
    pub fn subscriber_count(&self, stream: DataStream) -> usize {
        self.subscriptions
            .read()
            .iter()
            .filter(|s| s.stream() == stream)
            .count()
    }

    /// Total number of successful `subscribe` calls.
    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Deliver a gaze sample to every gaze subscriber.
    pub fn emit_gaze(&self, sample: GazeSample) {
        for sub in self.subscriptions.read().iter() {
            if let Subscription::Gaze(callback) = sub {
                callback(sample);
            }
        }
    }

    /// Deliver an eye image to every eye image subscriber, flagged according
    /// to the GIF mode each subscriber asked for.
    pub fn emit_eye_image(&self, image: EyeImage) {
        for sub in self.subscriptions.read().iter() {
            if let Subscription::EyeImage { as_gif, callback } = sub {
                let mut image = image.clone();
                image.is_gif = *as_gif;
                callback(image);
            }
        }
    }

    /// Deliver an external signal sample.
    pub fn emit_ext_signal(&self, signal: ExtSignal) {
        for sub in self.subscriptions.read().iter() {
            if let Subscription::ExtSignal(callback) = sub {
                callback(signal);
            }
        }
    }

    /// Deliver a time sync sample.
    pub fn emit_time_sync(&self, sync: TimeSync) {
        for sub in self.subscriptions.read().iter() {
            if let Subscription::TimeSync(callback) = sub {
                callback(sync);
            }
        }
    }

    /// Start a background thread producing data at `rate_hz`.
    ///
    /// Gaze samples are emitted on every tick, an eye image every tenth tick
    /// and a time sync packet roughly once per second. The external signal
    /// toggles every half second. Returns `false` if a pacer is already
    /// running.
    pub fn start_pacer(self: &Arc<Self>, rate_hz: f64) -> bool {
        let mut pacer = self.pacer.lock();
        if pacer.is_some() {
            return false;
        }

        let running = Arc::new(AtomicBool::new(true));
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = Duration::from_secs_f64(1.0 / rate_hz.max(1.0));
        let period_us = period.as_micros() as i64;
        let ticks_per_second = rate_hz.max(1.0).round() as u64;
        let flag = Arc::clone(&running);

        let handle = std::thread::spawn(move || {
            let mut rng = rand::thread_rng();
            let mut device_time: i64 = 0;
            let mut tick: u64 = 0;
            let mut ttl = 0u32;
            while flag.load(Ordering::Relaxed) {
                let Some(tracker) = weak.upgrade() else { break };
                let system_time = system_time_us();

                let mut eye = || EyeData {
                    gaze_point_on_display_area: Point2 {
                        x: 0.5 + rng.gen_range(-0.02..0.02),
                        y: 0.5 + rng.gen_range(-0.02..0.02),
                    },
                    gaze_point_in_user_coordinates: Point3::default(),
                    gaze_point_valid: true,
                    pupil_diameter: 3.0 + rng.gen_range(-0.1..0.1),
                    pupil_valid: true,
                    gaze_origin_in_user_coordinates: Point3 { x: 0.0, y: 0.0, z: 600.0 },
                    gaze_origin_valid: true,
                };
                let left_eye = eye();
                let right_eye = eye();
                tracker.emit_gaze(GazeSample {
                    device_time_stamp: device_time,
                    system_time_stamp: system_time,
                    left_eye,
                    right_eye,
                });

                if tick % 10 == 0 {
                    let pixels: Vec<u8> = (0..64 * 64).map(|_| rng.gen()).collect();
                    tracker.emit_eye_image(EyeImage {
                        device_time_stamp: device_time,
                        system_time_stamp: system_time,
                        camera_id: 0,
                        kind: EyeImageKind::Cropped,
                        is_gif: false,
                        width: 64,
                        height: 64,
                        bits_per_pixel: 8,
                        padding_per_pixel: 0,
                        data: Bytes::from(pixels),
                    });
                }
                if tick % (ticks_per_second / 2).max(1) == 0 {
                    ttl ^= 1;
                    tracker.emit_ext_signal(ExtSignal {
                        device_time_stamp: device_time,
                        system_time_stamp: system_time,
                        value: ttl,
                        change_type: Default::default(),
                    });
                }
                if tick % ticks_per_second == 0 {
                    tracker.emit_time_sync(TimeSync {
                        system_request_time_stamp: system_time,
                        device_time_stamp: device_time,
                        system_response_time_stamp: system_time_us(),
                    });
                }
                drop(tracker);

                tick += 1;
                device_time += period_us;
                std::thread::sleep(period);
            }
        });

        info!(address = %self.address, rate_hz, "MockEyeTracker pacer started");
        *pacer = Some(Pacer { running, handle });
        true
    }

    /// Stop the pacer thread and wait for it to exit.
    pub fn stop_pacer(&self) -> bool {
        let Some(pacer) = self.pacer.lock().take() else {
            return false;
        };
        pacer.running.store(false, Ordering::Relaxed);
        // stop_pacer may be reached from a callback running on the pacer thread
        if pacer.handle.thread().id() != std::thread::current().id()
            && pacer.handle.join().is_err()
        {
            warn!(address = %self.address, "MockEyeTracker pacer thread panicked");
        }
        info!(address = %self.address, "MockEyeTracker pacer stopped");
        true
    }
}

impl Drop for MockEyeTracker {
    fn drop(&mut self) {
        if let Some(pacer) = self.pacer.get_mut().as_ref() {
            pacer.running.store(false, Ordering::Relaxed);
        }
    }
}

impl EyeTracker for MockEyeTracker {
    fn address(&self) -> &str {
        &self.address
    }

    fn is_stream_supported(&self, stream: DataStream) -> bool {
        self.supported.contains(&stream)
    }

    fn subscribe(&self, subscription: Subscription) -> Result<(), DeviceError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(DeviceError::ConnectionLost);
        }
        let stream = subscription.stream();
        if !self.is_stream_supported(stream) {
            return Err(DeviceError::StreamNotSupported(stream));
        }
        debug!(%stream, "MockEyeTracker: subscribed");
        self.subscriptions.write().push(subscription);
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unsubscribe(&self, stream: DataStream) -> Result<(), DeviceError> {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.stream() != stream);
        if subscriptions.len() == before {
            return Err(DeviceError::InvalidOperation(format!(
                "no subscription for {stream}"
            )));
        }
        debug!(%stream, "MockEyeTracker: unsubscribed");
        Ok(())
    }
}

// =============================================================================
// MockConnector - Address Resolution
// =============================================================================

/// Connector that hands out registered [`MockEyeTracker`]s.
#[derive(Default)]
pub struct MockConnector {
    devices: HashMap<String, Arc<MockEyeTracker>>,
}

impl MockConnector {
    /// Create a connector with no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device under its own address.
    pub fn with_device(mut self, tracker: Arc<MockEyeTracker>) -> Self {
        self.devices.insert(tracker.address.clone(), tracker);
        self
    }
}

impl Connector for MockConnector {
    fn connect(&self, address: &str) -> anyhow::Result<Arc<dyn EyeTracker>> {
        let tracker = self
            .devices
            .get(address)
            .ok_or_else(|| anyhow!("no eye tracker found at '{address}'"))?;
        if !tracker.connected.load(Ordering::SeqCst) {
            return Err(anyhow!("eye tracker at '{address}' is not reachable"));
        }
        Ok(Arc::clone(tracker) as Arc<dyn EyeTracker>)
    }
}

// =============================================================================
// MockLogSource - Simulated Runtime Log
// =============================================================================

/// Simulated process-wide log callback slot.
#[derive(Default)]
pub struct MockLogSource {
    callback: Mutex<Option<LogCallback>>,
}

impl MockLogSource {
    /// Create a log source without a registered callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a callback is currently registered.
    pub fn is_registered(&self) -> bool {
        self.callback.lock().is_some()
    }

    /// Deliver a message to the registered callback, if any.
    pub fn emit(&self, level: LogLevel, message: impl Into<String>) {
        let callback: Option<Callback<LogMessage>> = self.callback.lock().clone();
        if let Some(callback) = callback {
            callback(LogMessage {
                system_time_stamp: system_time_us(),
                source: LogSourceKind::Sdk,
                level,
                message: message.into(),
            });
        }
    }
}

impl LogSource for MockLogSource {
    fn register_log_callback(&self, callback: LogCallback) -> Result<(), DeviceError> {
        let mut slot = self.callback.lock();
        if slot.is_some() {
            return Err(DeviceError::InvalidOperation(
                "log callback already registered".into(),
            ));
        }
        *slot = Some(callback);
        Ok(())
    }

    fn unregister_log_callback(&self) -> Result<(), DeviceError> {
        match self.callback.lock().take() {
            Some(_) => Ok(()),
            None => Err(DeviceError::InvalidOperation(
                "no log callback registered".into(),
            )),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
