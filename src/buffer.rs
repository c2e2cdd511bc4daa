//! Timestamp-ordered sample buffer shared between a producer callback and
//! any number of consumers.
//!
//! # Locking
//!
//! Each [`StreamBuffer`] owns one `parking_lot::Mutex<Vec<T>>`. The producer
//! (the eye tracker's callback thread) and all consumers contend for that lock
//! only; buffers of different streams never block each other. Critical
//! sections only move elements or indices around. A full consume takes the
//! vector out and trims it after the lock is released, a partial consume
//! drains a contiguous run, and peeks clone just the selected run.
//!
//! # Ordering
//!
//! Samples are kept in arrival order. Range operations assume that arrival
//! order is non-decreasing timestamp order and locate the matching run with a
//! binary search ([`locate`]). A sample arriving with a timestamp below its
//! predecessor is still stored where it arrived; such appends are counted
//! (see [`StreamBuffer::out_of_order_appends`]) and the first one is reported
//! with a warning.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use crate::sample::Timestamped;
use crate::stream::TimeRange;

/// Find the contiguous run of `samples` whose timestamps fall within `range`.
///
/// Relies on `samples` being sorted by non-decreasing timestamp. Returns an
/// empty range when nothing matches, including when `start > end`.
pub fn locate<T: Timestamped>(samples: &[T], range: TimeRange) -> Range<usize> {
    let (start, end) = range.bounds();
    if start > end {
        return 0..0;
    }
    let first = samples.partition_point(|s| s.device_time_stamp() < start);
    let last = first + samples[first..].partition_point(|s| s.device_time_stamp() <= end);
    first..last
}

// Called outside the lock: a taken batch should not keep the reservation.
fn trimmed<T>(mut batch: Vec<T>) -> Vec<T> {
    batch.shrink_to_fit();
    batch
}

/// Thread-safe, growable buffer of one stream's samples.
pub struct StreamBuffer<T> {
    samples: Mutex<Vec<T>>,
    out_of_order: AtomicU64,
}

impl<T> Default for StreamBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StreamBuffer<T> {
    /// Create an empty buffer without preallocating.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty buffer with room for `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Mutex::new(Vec::with_capacity(capacity)),
            out_of_order: AtomicU64::new(0),
        }
    }

    /// Make room for at least `capacity` samples in total. Advisory only.
    pub fn reserve(&self, capacity: usize) {
        let mut samples = self.samples.lock();
        let additional = capacity.saturating_sub(samples.len());
        samples.reserve(additional);
    }

    /// Number of samples currently stored.
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    /// Whether the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Number of appends whose timestamp was lower than the previous sample's.
    pub fn out_of_order_appends(&self) -> u64 {
        self.out_of_order.load(Ordering::Relaxed)
    }

    /// Remove and return the oldest `min(n, len)` samples, or everything when
    /// `n` is `None`.
    ///
    /// A full drain leaves an unallocated vector behind that grows again on
    /// the next append. The returned batch does not keep the reservation.
    pub fn consume_n(&self, n: Option<usize>) -> Vec<T> {
        let mut samples = self.samples.lock();
        match n {
            None => {
                let taken = std::mem::take(&mut *samples);
                drop(samples);
                trimmed(taken)
            }
            Some(n) => {
                let count = n.min(samples.len());
                samples.drain(..count).collect()
            }
        }
    }

    /// Capacity of the backing vector.
    pub fn capacity(&self) -> usize {
        self.samples.lock().capacity()
    }

    /// Release unused capacity.
    pub fn shrink_to_fit(&self) {
        self.samples.lock().shrink_to_fit();
    }

    /// Remove every sample.
    pub fn clear(&self) {
        self.samples.lock().clear();
    }
}

impl<T: Timestamped> StreamBuffer<T> {
    /// Append a sample at the back. Called from the producer path only.
    pub fn append(&self, sample: T) {
        let ts = sample.device_time_stamp();
        let out_of_order = {
            let mut samples = self.samples.lock();
            let out_of_order = samples
                .last()
                .is_some_and(|last| last.device_time_stamp() > ts);
            samples.push(sample);
            out_of_order
        };
        if out_of_order && self.out_of_order.fetch_add(1, Ordering::Relaxed) == 0 {
            warn!(
                device_time_stamp = ts,
                "sample arrived out of timestamp order; range operations assume ordered arrival"
            );
        }
    }

    /// Remove and return the samples within `range`.
    pub fn consume_time_range(&self, range: TimeRange) -> Vec<T> {
        let mut samples = self.samples.lock();
        let run = locate(samples.as_slice(), range);
        if run.is_empty() {
            return Vec::new();
        }
        if run.start == 0 && run.end == samples.len() {
            let taken = std::mem::take(&mut *samples);
            drop(samples);
            return trimmed(taken);
        }
        samples.drain(run).collect()
    }

    /// Remove the samples within `range` without returning them.
    pub fn clear_time_range(&self, range: TimeRange) {
        let mut samples = self.samples.lock();
        let run = locate(samples.as_slice(), range);
        if run.start == 0 && run.end == samples.len() {
            samples.clear();
        } else if !run.is_empty() {
            samples.drain(run);
        }
    }
}

impl<T: Timestamped + Clone> StreamBuffer<T> {
    /// Return copies of the newest `min(n, len)` samples in arrival order.
    /// `None` peeks only the most recent sample.
    pub fn peek_n(&self, n: Option<usize>) -> Vec<T> {
        let samples = self.samples.lock();
        let count = n.unwrap_or(1).min(samples.len());
        samples[samples.len() - count..].to_vec()
    }

    /// Return copies of the samples within `range`.
    pub fn peek_time_range(&self, range: TimeRange) -> Vec<T> {
        let samples = self.samples.lock();
        let run = locate(samples.as_slice(), range);
        samples[run].to_vec()
    }
}
