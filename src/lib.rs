//! # Eye-Tracker Stream Buffering
//!
//! This crate buffers the data streams of a connected eye tracker in memory so
//! that a consumer can pull them on its own schedule. The eye tracker pushes
//! samples from its own threads; the consumer takes them out by count or by
//! device-timestamp range.
//!
//! ## Crate Structure
//!
//! - **`stream`**: The [`DataStream`](stream::DataStream) identifiers and the
//!   [`TimeRange`](stream::TimeRange) selector.
//! - **`sample`**: Payload types for every stream, plus log messages.
//! - **`buffer`**: [`StreamBuffer`](buffer::StreamBuffer), the thread-safe,
//!   time-ordered sample store shared by all streams.
//! - **`controller`**: Per-stream subscription lifecycle (Idle, Buffering,
//!   Stopped).
//! - **`manager`**: [`BufferManager`](manager::BufferManager), one controller
//!   per stream for one device, with safe teardown.
//! - **`log_channel`**: The process-wide diagnostic log buffer.
//! - **`hardware`**: Traits for the eye-tracker surface and mock devices.
//! - **`config`**: Figment-based configuration for the `etbuffer` binary.
//! - **`logging`**: `tracing-subscriber` initialisation.
//! - **`error`**: Crate error types.

pub mod buffer;
pub mod config;
pub mod controller;
pub mod error;
pub mod hardware;
pub mod log_channel;
pub mod logging;
pub mod manager;
pub mod sample;
pub mod stream;

pub use buffer::StreamBuffer;
pub use controller::{StartOptions, StreamControl, StreamController, StreamState};
pub use error::{BufferError, BufferResult, DeviceError};
pub use manager::{BufferManager, StreamSamples};
pub use stream::{DataStream, TimeRange};
