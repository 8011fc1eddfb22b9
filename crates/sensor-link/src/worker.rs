use crate::{decode_bytes, epoch_seconds, LinkConfig, RollingBuffer, SensorLink};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Poll interval while the link reports no pending input. Kept well under
/// any sane read timeout so `stop()` is observed promptly.
const IDLE_POLL: Duration = Duration::from_millis(5);

/// Slice size for the settle wait, so stop requests land during settle too.
const SETTLE_SLICE: Duration = Duration::from_millis(50);

/// Lifecycle of one acquisition worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Connecting,
    Streaming,
    Stopped,
}

const STATE_CONNECTING: u8 = 0;
const STATE_STREAMING: u8 = 1;
const STATE_STOPPED: u8 = 2;

fn state_from_u8(v: u8) -> WorkerState {
    match v {
        STATE_CONNECTING => WorkerState::Connecting,
        STATE_STREAMING => WorkerState::Streaming,
        _ => WorkerState::Stopped,
    }
}

/// Spawns background acquisition loops, one per sensor device.
///
/// Each worker owns its link outright: it opens it, reads from it until
/// told to stop, services outbound control-plane commands queued through
/// the handle, and drops the link exactly once on exit. A fatal open
/// failure stops that worker only — the buffer stays empty, the process
/// and any sibling workers carry on.
pub struct AcquisitionWorker;

impl AcquisitionWorker {
    /// Open `path` with backend `L` inside the worker thread and start
    /// streaming into a fresh buffer of `capacity` records.
    pub fn spawn<L: SensorLink + 'static>(
        name: &str,
        path: &str,
        config: LinkConfig,
        capacity: usize,
    ) -> WorkerHandle {
        let shared = WorkerShared::new(name, capacity);
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let path = path.to_string();
        let thread_shared = shared.clone();
        let thread = std::thread::spawn(move || match L::open(&path, &config) {
            Ok(link) => run_loop(link, &config, &thread_shared, cmd_rx),
            Err(e) => {
                error!(device = %thread_shared.name, path = %path, error = %e, "link open failed");
                thread_shared.state.store(STATE_STOPPED, Ordering::SeqCst);
            }
        });
        shared.into_handle(cmd_tx, thread)
    }

    /// Start streaming from an already-open link. Used by tests and by
    /// callers that configure the link themselves.
    pub fn spawn_with_link<L: SensorLink + 'static>(
        name: &str,
        link: L,
        config: LinkConfig,
        capacity: usize,
    ) -> WorkerHandle {
        let shared = WorkerShared::new(name, capacity);
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let thread_shared = shared.clone();
        let thread = std::thread::spawn(move || run_loop(link, &config, &thread_shared, cmd_rx));
        shared.into_handle(cmd_tx, thread)
    }
}

#[derive(Clone)]
struct WorkerShared {
    name: Arc<String>,
    buffer: RollingBuffer,
    running: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
}

impl WorkerShared {
    fn new(name: &str, capacity: usize) -> Self {
        Self {
            name: Arc::new(name.to_string()),
            buffer: RollingBuffer::new(capacity),
            running: Arc::new(AtomicBool::new(true)),
            state: Arc::new(AtomicU8::new(STATE_CONNECTING)),
        }
    }

    fn into_handle(self, cmd_tx: Sender<String>, thread: JoinHandle<()>) -> WorkerHandle {
        WorkerHandle {
            name: self.name,
            buffer: self.buffer,
            running: self.running,
            state: self.state,
            cmd_tx,
            thread: Mutex::new(Some(thread)),
        }
    }
}

fn run_loop<L: SensorLink>(
    mut link: L,
    config: &LinkConfig,
    shared: &WorkerShared,
    cmd_rx: Receiver<String>,
) {
    // Settle window: the device may be mid-reset right after open, so no
    // line read before this elapses is trusted as data.
    let mut remaining = config.settle_delay;
    while remaining > Duration::ZERO && shared.running.load(Ordering::SeqCst) {
        let slice = remaining.min(SETTLE_SLICE);
        std::thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }

    if shared.running.load(Ordering::SeqCst) {
        shared.state.store(STATE_STREAMING, Ordering::SeqCst);
        info!(device = %shared.name, "streaming");
    }

    while shared.running.load(Ordering::SeqCst) {
        // Control-plane writes are fire-and-forget; a failed write is the
        // caller's protocol problem, not the read loop's.
        while let Ok(cmd) = cmd_rx.try_recv() {
            match link.write_line(&cmd) {
                Ok(()) => info!(device = %shared.name, command = %cmd, "sent command"),
                Err(e) => warn!(device = %shared.name, error = %e, "command write failed"),
            }
        }

        match link.bytes_available() {
            Ok(0) => {
                std::thread::sleep(IDLE_POLL);
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                error!(device = %shared.name, error = %e, "link failed");
                break;
            }
        }

        match link.read_line() {
            Ok(Some(bytes)) => {
                // Malformed frames are dropped; the stream matters more
                // than any single sample.
                if let Some(record) = decode_bytes(&bytes, epoch_seconds()) {
                    shared.buffer.push(record);
                } else {
                    debug!(device = %shared.name, "dropped malformed line");
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!(device = %shared.name, error = %e, "link failed");
                break;
            }
        }
    }

    shared.state.store(STATE_STOPPED, Ordering::SeqCst);
    info!(device = %shared.name, "worker stopped");
    // Dropping the link here closes it, exactly once.
}

/// Owning handle to one background acquisition worker.
pub struct WorkerHandle {
    name: Arc<String>,
    buffer: RollingBuffer,
    running: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    cmd_tx: Sender<String>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> WorkerState {
        state_from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Clone of the shared rolling buffer handle.
    pub fn buffer(&self) -> RollingBuffer {
        self.buffer.clone()
    }

    pub fn latest(&self, field: &str) -> Option<f64> {
        self.buffer.latest(field)
    }

    pub fn mean_over_n(&self, field: &str, n: usize) -> Option<f64> {
        self.buffer.mean_over_n(field, n)
    }

    pub fn mean_over_time(&self, field: &str, window_secs: f64) -> Option<f64> {
        self.buffer.mean_over_time(field, window_secs)
    }

    /// Queue a control-plane command (newline appended by the link). The
    /// worker drains the queue on its next loop pass; no ack is awaited.
    pub fn send_command(&self, text: &str) {
        if self.cmd_tx.send(text.to_string()).is_err() {
            warn!(device = %self.name, "worker gone, command dropped");
        }
    }

    /// Request cooperative stop and join the worker thread. The loop
    /// observes the flag within one read-timeout interval. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.lock().take() {
            if thread.join().is_err() {
                warn!(device = %self.name, "worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LinkError, MockLink, PortInfo, Result as LinkResult};
    use std::time::Instant;

    fn fast_config() -> LinkConfig {
        LinkConfig {
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(20),
            settle_delay: Duration::ZERO,
        }
    }

    fn wait_for<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn test_streams_decoded_records_into_buffer() {
        let (link, injector) = MockLink::pair(&fast_config());
        injector.push_line("{\"force\": 1.0}");
        injector.push_line("garbage");
        injector.push_line("{broken");
        injector.push_line("{\"force\": 2.5}");

        let worker = AcquisitionWorker::spawn_with_link("dev1", link, fast_config(), 16);
        assert!(wait_for(
            || worker.buffer().len() == 2,
            Duration::from_secs(2)
        ));
        assert_eq!(worker.latest("force"), Some(2.5));
        worker.stop();
    }

    #[test]
    fn test_stop_returns_within_read_timeout_and_closes_once() {
        let (link, injector) = MockLink::pair(&fast_config());
        let worker = AcquisitionWorker::spawn_with_link("dev1", link, fast_config(), 16);
        assert!(wait_for(
            || worker.state() == WorkerState::Streaming,
            Duration::from_secs(2)
        ));

        let started = Instant::now();
        worker.stop();
        // One read-timeout interval plus generous scheduling slack
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(worker.state(), WorkerState::Stopped);
        assert_eq!(injector.times_closed(), 1);

        // Idempotent
        worker.stop();
        assert_eq!(injector.times_closed(), 1);
    }

    #[test]
    fn test_send_command_reaches_link() {
        let (link, injector) = MockLink::pair(&fast_config());
        let worker = AcquisitionWorker::spawn_with_link("dev1", link, fast_config(), 16);
        worker.send_command("tare");
        assert!(wait_for(
            || injector.sent() == vec!["tare".to_string()],
            Duration::from_secs(2)
        ));
        worker.stop();
    }

    #[test]
    fn test_link_failure_is_fatal_to_worker_only() {
        let (link, _injector) = MockLink::failing_pair(&fast_config());
        let worker = AcquisitionWorker::spawn_with_link("dev1", link, fast_config(), 16);
        assert!(wait_for(
            || worker.state() == WorkerState::Stopped,
            Duration::from_secs(2)
        ));
        assert!(worker.buffer().is_empty());
    }

    #[test]
    fn test_open_failure_stops_worker() {
        struct NeverOpens;
        impl crate::SensorLink for NeverOpens {
            fn open(path: &str, _config: &LinkConfig) -> LinkResult<Self> {
                Err(LinkError::PortNotFound(path.to_string()))
            }
            fn list() -> LinkResult<Vec<PortInfo>> {
                Ok(Vec::new())
            }
            fn bytes_available(&mut self) -> LinkResult<usize> {
                Ok(0)
            }
            fn read_line(&mut self) -> LinkResult<Option<Vec<u8>>> {
                Ok(None)
            }
            fn write_line(&mut self, _text: &str) -> LinkResult<()> {
                Ok(())
            }
        }

        let worker =
            AcquisitionWorker::spawn::<NeverOpens>("dev1", "/dev/nothere", fast_config(), 16);
        assert!(wait_for(
            || worker.state() == WorkerState::Stopped,
            Duration::from_secs(2)
        ));
        assert!(worker.buffer().is_empty());
    }

    #[test]
    fn test_stop_during_settle_delay() {
        let config = LinkConfig {
            settle_delay: Duration::from_secs(10),
            ..fast_config()
        };
        let (link, _injector) = MockLink::pair(&fast_config());
        let worker = AcquisitionWorker::spawn_with_link("dev1", link, config, 16);

        let started = Instant::now();
        worker.stop();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(worker.state(), WorkerState::Stopped);
    }
}
