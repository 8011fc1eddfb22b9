use crate::Result;
use std::time::Duration;

/// Connection parameters for a device link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Baud rate for serial backends.
    pub baud_rate: u32,
    /// Upper bound on any single blocking read. The worker's stop flag is
    /// observed at least once per interval, so keep this short.
    pub read_timeout: Duration,
    /// Pause after opening before data is trusted, covering the reset
    /// cycle many microcontroller boards run on port open.
    pub settle_delay: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(200),
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// An enumerable candidate port for a backend.
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub path: String,
    pub driver: String,
}

/// A minimal blocking, line-oriented byte-stream link to one sensor device.
pub trait SensorLink: Send {
    /// Open a link by path (e.g., "/dev/ttyUSB0").
    fn open(path: &str, config: &LinkConfig) -> Result<Self>
    where
        Self: Sized;

    /// Attempt to list candidate ports for this backend.
    fn list() -> Result<Vec<PortInfo>>
    where
        Self: Sized;

    /// Bytes waiting to be read, if the backend can tell.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read one line, bounded by the configured read timeout.
    /// `Ok(None)` means the timeout elapsed without a complete line.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>>;

    /// Write `text` plus a single `\n` terminator. Fire-and-forget: no
    /// acknowledgment is awaited at this layer.
    fn write_line(&mut self, text: &str) -> Result<()>;
}
