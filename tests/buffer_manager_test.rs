//! Integration tests for BufferManager against the mock eye tracker.
//!
//! Covers the stream lifecycle, consume/peek semantics seen through the
//! manager, and teardown while the device keeps producing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use eyetracker_buffer::hardware::{EyeTracker, MockConnector, MockEyeTracker, Subscription};
use eyetracker_buffer::sample::{ExtSignal, EyeImage, GazeSample, TimeSync};
use eyetracker_buffer::{
    BufferError, BufferManager, DataStream, DeviceError, StartOptions, StreamState, TimeRange,
};
use parking_lot::Mutex;

const ADDRESS: &str = "tet-tcp://169.254.10.20";

fn connect() -> (Arc<MockEyeTracker>, BufferManager) {
    let tracker = Arc::new(MockEyeTracker::new(ADDRESS));
    let connector = MockConnector::new().with_device(Arc::clone(&tracker));
    let manager = BufferManager::connect(&connector, ADDRESS).unwrap();
    (tracker, manager)
}

fn gaze_stamps(samples: &[GazeSample]) -> Vec<i64> {
    samples.iter().map(|s| s.device_time_stamp).collect()
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_connect_reports_address() {
    let (_tracker, manager) = connect();
    assert_eq!(manager.address(), ADDRESS);
    for stream in DataStream::ALL {
        assert!(!manager.is_buffering(stream));
        assert_eq!(manager.control(stream).state(), StreamState::Idle);
    }
}

#[test]
fn test_connect_unreachable_device() {
    let tracker = Arc::new(MockEyeTracker::new(ADDRESS));
    tracker.set_connected(false);
    let connector = MockConnector::new().with_device(tracker);
    match BufferManager::connect(&connector, ADDRESS) {
        Err(BufferError::DeviceOpen { reason, .. }) => assert!(reason.contains("not reachable")),
        other => panic!("expected DeviceOpen, got {:?}", other.err()),
    }
}

#[test]
fn test_start_is_idempotent_while_buffering() {
    let (tracker, manager) = connect();
    assert!(manager.start(DataStream::Gaze, StartOptions::with_capacity(16)));
    assert!(!manager.start(DataStream::Gaze, StartOptions::with_capacity(16)));
    assert_eq!(tracker.subscriber_count(DataStream::Gaze), 1);

    tracker.emit_gaze(GazeSample::at(1));
    assert_eq!(manager.buffered(DataStream::Gaze), 1);
}

#[test]
fn test_stop_without_start_is_noop() {
    let (_tracker, manager) = connect();
    assert!(!manager.stop(DataStream::TimeSync, None));
    assert_eq!(manager.control(DataStream::TimeSync).state(), StreamState::Idle);
}

#[test]
fn test_unsupported_stream() {
    let tracker = Arc::new(MockEyeTracker::with_streams(ADDRESS, &[DataStream::Gaze]));
    let manager = BufferManager::from_device(Arc::clone(&tracker) as Arc<dyn EyeTracker>);
    assert!(manager.has_stream(DataStream::Gaze));
    assert!(!manager.has_stream(DataStream::EyeImage));
    assert!(!manager.start(DataStream::EyeImage, StartOptions::default().gif(true)));
    assert!(!manager.is_buffering(DataStream::EyeImage));
}

#[test]
fn test_restart_after_stop_keeps_buffer() {
    let (tracker, manager) = connect();
    manager.start(DataStream::ExtSignal, StartOptions::with_capacity(4));
    tracker.emit_ext_signal(ExtSignal::at(1, 1));
    assert!(manager.stop(DataStream::ExtSignal, None));

    assert!(manager.start(DataStream::ExtSignal, StartOptions::with_capacity(4)));
    tracker.emit_ext_signal(ExtSignal::at(2, 0));
    let values: Vec<u32> = manager
        .consume_n::<ExtSignal>(None)
        .iter()
        .map(|s| s.value)
        .collect();
    assert_eq!(values, vec![1, 0]);
}

#[test]
fn test_failed_unsubscribe_still_stops() {
    let (tracker, manager) = connect();
    manager.start(DataStream::Gaze, StartOptions::with_capacity(4));
    // another client removed the subscription behind our back
    tracker.unsubscribe(DataStream::Gaze).unwrap();
    assert!(!manager.stop(DataStream::Gaze, None));
    assert_eq!(manager.control(DataStream::Gaze).state(), StreamState::Stopped);
}

// =============================================================================
// Consume / peek through the manager
// =============================================================================

#[test]
fn test_consume_time_range_removes_only_matching() {
    let (tracker, manager) = connect();
    manager.start(DataStream::Gaze, StartOptions::with_capacity(8));
    for ts in [10, 20, 30, 40] {
        tracker.emit_gaze(GazeSample::at(ts));
    }

    let taken = manager.consume_time_range::<GazeSample>(TimeRange::between(15, 35));
    assert_eq!(gaze_stamps(&taken), vec![20, 30]);
    assert_eq!(gaze_stamps(&manager.peek_n::<GazeSample>(Some(10))), vec![10, 40]);
}

#[test]
fn test_consume_n_partitions_buffer() {
    let (tracker, manager) = connect();
    manager.start(DataStream::Gaze, StartOptions::with_capacity(8));
    for ts in 1..=5 {
        tracker.emit_gaze(GazeSample::at(ts));
    }

    let first = manager.consume_n::<GazeSample>(Some(2));
    let rest = manager.consume_n::<GazeSample>(None);
    assert_eq!(gaze_stamps(&first), vec![1, 2]);
    assert_eq!(gaze_stamps(&rest), vec![3, 4, 5]);
    assert!(manager.consume_n::<GazeSample>(None).is_empty());
}

#[test]
fn test_polled_batches_do_not_hold_default_reservation() {
    let (tracker, manager) = connect();
    assert!(manager.start(DataStream::Gaze, StartOptions::default()));

    let mut kept = Vec::new();
    for ts in 0..3 {
        tracker.emit_gaze(GazeSample::at(ts));
        kept.push(manager.consume_n::<GazeSample>(None));
    }
    for batch in &kept {
        assert_eq!(batch.len(), 1);
        assert!(batch.capacity() <= 4, "batch kept {} slots", batch.capacity());
    }
}

#[test]
fn test_peek_is_repeatable() {
    let (tracker, manager) = connect();
    manager.start(DataStream::TimeSync, StartOptions::with_capacity(8));
    for ts in [5, 6, 7] {
        tracker.emit_time_sync(TimeSync::at(ts));
    }

    let a = manager.peek_time_range::<TimeSync>(TimeRange::since(6));
    let b = manager.peek_time_range::<TimeSync>(TimeRange::since(6));
    assert_eq!(a, b);
    assert_eq!(manager.peek_n::<TimeSync>(None), vec![TimeSync::at(7)]);
    assert_eq!(manager.buffered(DataStream::TimeSync), 3);
}

#[test]
fn test_stop_with_empty_buffer() {
    let (tracker, manager) = connect();
    manager.start(DataStream::Gaze, StartOptions::with_capacity(8));
    tracker.emit_gaze(GazeSample::at(1));
    assert!(manager.stop(DataStream::Gaze, Some(true)));
    assert_eq!(manager.buffered(DataStream::Gaze), 0);
}

// =============================================================================
// Teardown
// =============================================================================

#[test]
fn test_drop_while_pacer_running() {
    let (tracker, manager) = connect();
    for stream in DataStream::ALL {
        assert!(manager.start(stream, StartOptions::with_capacity(1024)));
    }
    assert!(tracker.start_pacer(1000.0));
    thread::sleep(Duration::from_millis(50));
    assert!(manager.buffered(DataStream::Gaze) > 0);

    drop(manager);
    for stream in DataStream::ALL {
        assert_eq!(tracker.subscriber_count(stream), 0);
    }
    thread::sleep(Duration::from_millis(20));
    assert!(tracker.stop_pacer());
}

#[test]
fn test_drop_while_producer_thread_fires() {
    let (tracker, manager) = connect();
    manager.start(DataStream::Gaze, StartOptions::with_capacity(1024));

    let running = Arc::new(AtomicBool::new(true));
    let producer = {
        let tracker = Arc::clone(&tracker);
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut ts = 0;
            while running.load(Ordering::Relaxed) {
                tracker.emit_gaze(GazeSample::at(ts));
                ts += 1;
            }
            ts
        })
    };

    thread::sleep(Duration::from_millis(20));
    drop(manager);
    thread::sleep(Duration::from_millis(20));
    running.store(false, Ordering::Relaxed);
    assert!(producer.join().unwrap() > 0);
    assert_eq!(tracker.subscriber_count(DataStream::Gaze), 0);
}

/// Device whose callbacks outlive `unsubscribe`, like a driver that only
/// stops delivering lazily.
#[derive(Default)]
struct RetainingTracker {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl EyeTracker for RetainingTracker {
    fn address(&self) -> &str {
        "retaining"
    }

    fn is_stream_supported(&self, _stream: DataStream) -> bool {
        true
    }

    fn subscribe(&self, subscription: Subscription) -> Result<(), DeviceError> {
        self.subscriptions.lock().push(subscription);
        Ok(())
    }

    fn unsubscribe(&self, _stream: DataStream) -> Result<(), DeviceError> {
        Ok(())
    }
}

#[test]
fn test_retained_callbacks_after_drop_are_noops() {
    let tracker = Arc::new(RetainingTracker::default());
    let manager = BufferManager::from_device(Arc::clone(&tracker) as Arc<dyn EyeTracker>);
    for stream in DataStream::ALL {
        assert!(manager.start(stream, StartOptions::with_capacity(4)));
    }

    let retained: Vec<Subscription> = tracker.subscriptions.lock().clone();
    let fire = |ts: i64| {
        for subscription in &retained {
            match subscription {
                Subscription::Gaze(callback) => callback(GazeSample::at(ts)),
                Subscription::EyeImage { callback, .. } => callback(EyeImage::at(ts, vec![0u8])),
                Subscription::ExtSignal(callback) => callback(ExtSignal::at(ts, 1)),
                Subscription::TimeSync(callback) => callback(TimeSync::at(ts)),
            }
        }
    };

    fire(1);
    for stream in DataStream::ALL {
        assert_eq!(manager.buffered(stream), 1);
    }

    drop(manager);
    fire(2);
    fire(3);
    assert_eq!(retained.len(), DataStream::ALL.len());
}
