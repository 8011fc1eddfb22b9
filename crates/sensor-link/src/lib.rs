//! sensor-link: line-oriented sensor acquisition over serial byte streams
//!
//! This crate provides the ingestion side of the rig: a transport trait with
//! feature-gated backends, a best-effort JSON line decoder, a fixed-capacity
//! rolling sample buffer, and a per-device background worker that ties the
//! three together. The default build enables a `mock` backend so that
//! binaries can compile on any host without native serial drivers.

mod record;
pub use record::SensorRecord;

mod decode;
pub use decode::{decode_bytes, decode_line};

mod buffer;
pub use buffer::RollingBuffer;

mod error;
pub use error::{LinkError, Result};

mod traits;
pub use traits::{LinkConfig, PortInfo, SensorLink};

mod worker;
pub use worker::{AcquisitionWorker, WorkerHandle, WorkerState};

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockInjector, MockLink};

#[cfg(feature = "serial")]
mod serial;

#[cfg(feature = "serial")]
pub use serial::SerialLink;

/// Epoch seconds with sub-second precision, the clock all records are
/// stamped with. Falls back to 0.0 if the system clock predates the epoch.
pub fn epoch_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
