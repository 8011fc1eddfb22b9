use crate::{epoch_seconds, SensorRecord};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

/// Fixed-capacity, time-ordered store of decoded records.
///
/// Single writer (the acquisition worker), any number of concurrent
/// readers (routine control loops). The handle is cheap to clone; all
/// clones share the same underlying store. Readers always see a complete
/// point-in-time view — never a half-applied push or eviction.
///
/// Queries that average a field treat a record missing that field as
/// contributing 0 to the sum while still counting it. That mirrors the
/// warm-up behavior of the sensors on the rig, where early frames may not
/// carry every channel yet, and is deliberate — not the usual
/// skip-missing averaging.
#[derive(Clone)]
pub struct RollingBuffer {
    capacity: usize,
    inner: Arc<RwLock<VecDeque<SensorRecord>>>,
}

impl RollingBuffer {
    /// A capacity of 0 is clamped to 1: the buffer always retains at
    /// least the most recent record.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
        }
    }

    /// Append a record, evicting the oldest entries once at capacity.
    pub fn push(&self, record: SensorRecord) {
        let mut queue = self.inner.write();
        while queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(record);
    }

    /// Named field of the most recently pushed record.
    pub fn latest(&self, field: &str) -> Option<f64> {
        self.inner.read().back().and_then(|rec| rec.get(field))
    }

    /// Mean of `field` over the last `min(n, len)` records.
    pub fn mean_over_n(&self, field: &str, n: usize) -> Option<f64> {
        if n == 0 {
            return None;
        }
        let queue = self.inner.read();
        if queue.is_empty() {
            return None;
        }
        let take = n.min(queue.len());
        let sum: f64 = queue
            .iter()
            .rev()
            .take(take)
            .map(|rec| rec.get(field).unwrap_or(0.0))
            .sum();
        Some(sum / take as f64)
    }

    /// Mean of `field` over records stamped within `window_secs` of now.
    pub fn mean_over_time(&self, field: &str, window_secs: f64) -> Option<f64> {
        let now = epoch_seconds();
        let queue = self.inner.read();
        let mut sum = 0.0;
        let mut count = 0usize;
        for rec in queue.iter() {
            if now - rec.timestamp <= window_secs {
                sum += rec.get(field).unwrap_or(0.0);
                count += 1;
            }
        }
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
