//! Process-wide diagnostic log channel.
//!
//! The eye-tracker runtime reports diagnostics through a single, process-wide
//! log callback that is independent of any opened device. This module keeps
//! the matching buffer as one global with an explicit lifecycle:
//!
//! `start_logging` (allocate + register) → accumulate → `get_log` → `stop_logging`
//! (unregister + deallocate).
//!
//! Messages are stored in a [`StreamBuffer`](crate::buffer::StreamBuffer) of
//! their own, keyed on the host timestamp. The registration slot serialises
//! start/stop; the log callback only holds a `Weak` reference to the buffer,
//! so a message delivered after `stop_logging` is dropped. Nothing is shared
//! with the stream buffers, and the channel works whether or not a
//! [`BufferManager`](crate::manager::BufferManager) exists.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::buffer::StreamBuffer;
use crate::hardware::{LogCallback, LogSource};
use crate::sample::LogMessage;
use crate::stream::TimeRange;

/// Capacity reserved when `start_logging` is called without a hint.
pub const DEFAULT_LOG_CAPACITY: usize = 1 << 10;

#[derive(Default)]
struct LogChannel {
    source: Mutex<Option<Arc<dyn LogSource>>>,
    buffer: Mutex<Option<Arc<StreamBuffer<LogMessage>>>>,
}

static LOG_CHANNEL: Lazy<LogChannel> = Lazy::new(LogChannel::default);

fn current_buffer() -> Option<Arc<StreamBuffer<LogMessage>>> {
    LOG_CHANNEL.buffer.lock().clone()
}

/// Allocate the log buffer and register the log callback with `source`.
///
/// Returns `false` if logging is already started or the source refuses the
/// callback; in the latter case no buffer stays allocated.
pub fn start_logging(source: Arc<dyn LogSource>, initial_capacity: Option<usize>) -> bool {
    let mut slot = LOG_CHANNEL.source.lock();
    if slot.is_some() {
        debug!("start_logging ignored: already logging");
        return false;
    }

    let capacity = initial_capacity.unwrap_or(DEFAULT_LOG_CAPACITY);
    let buffer = Arc::new(StreamBuffer::with_capacity(capacity));
    let weak = Arc::downgrade(&buffer);
    *LOG_CHANNEL.buffer.lock() = Some(buffer);

    let callback: LogCallback = Arc::new(move |message: LogMessage| {
        if let Some(buffer) = weak.upgrade() {
            buffer.append(message);
        }
    });
    match source.register_log_callback(callback) {
        Ok(()) => {
            *slot = Some(source);
            info!(capacity, "log channel started");
            true
        }
        Err(err) => {
            *LOG_CHANNEL.buffer.lock() = None;
            warn!(error = %err, "log callback registration rejected");
            false
        }
    }
}

/// Return the buffered messages in arrival order.
///
/// With `clear = Some(true)` the buffer is drained atomically, so a message is
/// returned exactly once. Returns an empty list when logging is not started.
pub fn get_log(clear: Option<bool>) -> Vec<LogMessage> {
    match current_buffer() {
        None => Vec::new(),
        Some(buffer) if clear.unwrap_or(false) => buffer.consume_n(None),
        Some(buffer) => buffer.peek_time_range(TimeRange::all()),
    }
}

/// Unregister the log callback and release the buffer.
///
/// Returns `false` if logging was not started, or if the source reported an
/// error while unregistering; the buffer is released either way.
pub fn stop_logging() -> bool {
    // the slot stays locked until the buffer is gone so a concurrent
    // start_logging cannot allocate in between
    let mut slot = LOG_CHANNEL.source.lock();
    let Some(source) = slot.take() else {
        debug!("stop_logging ignored: not logging");
        return false;
    };

    let result = source.unregister_log_callback();
    *LOG_CHANNEL.buffer.lock() = None;
    match result {
        Ok(()) => {
            info!("log channel stopped");
            true
        }
        Err(err) => {
            warn!(error = %err, "log callback unregistration failed");
            false
        }
    }
}

/// Whether the log channel is currently started.
pub fn is_logging() -> bool {
    LOG_CHANNEL.source.lock().is_some()
}
