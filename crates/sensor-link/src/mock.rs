use crate::{LinkConfig, LinkError, PortInfo, Result, SensorLink};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct MockState {
    inbound: VecDeque<Vec<u8>>,
    sent: Vec<String>,
    fail_open: bool,
    times_closed: u32,
}

/// Test-side handle to a [`MockLink`]: feed it inbound lines and inspect
/// what was written to it.
#[derive(Clone)]
pub struct MockInjector {
    state: Arc<Mutex<MockState>>,
}

impl MockInjector {
    /// Queue one inbound line as the device would have sent it.
    pub fn push_line(&self, line: &str) {
        self.state.lock().inbound.push_back(line.as_bytes().to_vec());
    }

    /// Commands written out through the link so far, newline stripped.
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    /// How many times the link has been dropped/closed.
    pub fn times_closed(&self) -> u32 {
        self.state.lock().times_closed
    }
}

/// In-process mock link. Opened standalone (via [`SensorLink::open`]) it
/// synthesizes a plausible `{"force": ...}` stream so demo flows work
/// without hardware; paired with a [`MockInjector`] it replays exactly the
/// lines a test feeds it.
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
    read_timeout: Duration,
    synth_seq: Option<u64>,
}

impl MockLink {
    /// Link/injector pair for scripted tests. No synthetic stream.
    pub fn pair(config: &LinkConfig) -> (Self, MockInjector) {
        let state = Arc::new(Mutex::new(MockState::default()));
        let link = Self {
            state: state.clone(),
            read_timeout: config.read_timeout,
            synth_seq: None,
        };
        (link, MockInjector { state })
    }

    /// Pair whose link refuses to open-use: the first read errors, standing
    /// in for a fatal open failure in worker tests.
    pub fn failing_pair(config: &LinkConfig) -> (Self, MockInjector) {
        let (link, injector) = Self::pair(config);
        injector.state.lock().fail_open = true;
        (link, injector)
    }
}

impl SensorLink for MockLink {
    fn open(path: &str, config: &LinkConfig) -> Result<Self> {
        let _ = path;
        Ok(Self {
            state: Arc::new(Mutex::new(MockState::default())),
            read_timeout: config.read_timeout,
            synth_seq: Some(0),
        })
    }

    fn list() -> Result<Vec<PortInfo>> {
        Ok(vec![PortInfo {
            path: "mock0".to_string(),
            driver: "mock".to_string(),
        }])
    }

    fn bytes_available(&mut self) -> Result<usize> {
        if self.state.lock().fail_open {
            return Err(LinkError::Io("mock link configured to fail".to_string()));
        }
        let queued: usize = self.state.lock().inbound.iter().map(|l| l.len()).sum();
        if queued > 0 || self.synth_seq.is_some() {
            Ok(queued.max(1))
        } else {
            Ok(0)
        }
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        if self.state.lock().fail_open {
            return Err(LinkError::Io("mock link configured to fail".to_string()));
        }
        if let Some(line) = self.state.lock().inbound.pop_front() {
            return Ok(Some(line));
        }
        if let Some(seq) = self.synth_seq.as_mut() {
            // Gentle ramp-and-hold so monitor output looks alive
            let t = *seq as f64 * 0.01;
            *seq += 1;
            std::thread::sleep(Duration::from_millis(10));
            let force = 5.0 + 4.0 * (t * 2.0).sin();
            return Ok(Some(format!("{{\"force\": {force:.3}}}").into_bytes()));
        }
        // Nothing queued: behave like a quiet port, block for one timeout
        std::thread::sleep(self.read_timeout);
        Ok(None)
    }

    fn write_line(&mut self, text: &str) -> Result<()> {
        self.state.lock().sent.push(text.to_string());
        Ok(())
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        self.state.lock().times_closed += 1;
    }
}
