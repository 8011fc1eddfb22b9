use crate::{Result, RoutineError};
use motion_control::MotionBackend;
use sensor_link::WorkerHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative operator-interrupt signal, shared between the control flow
/// running a routine and whatever raises the interrupt (Ctrl-C handler in
/// the CLI). Routines poll it and answer a raised flag with an explicit
/// backend stop before unwinding — the arm is never left mid-trajectory.
#[derive(Clone, Default)]
pub struct InterruptFlag {
    inner: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.inner.store(false, Ordering::SeqCst);
    }

    pub fn interrupted(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

/// Everything a routine is allowed to touch: the motion backend and the
/// named acquisition workers. Built once at startup; the device map is
/// never mutated afterwards.
pub struct RoutineContext {
    pub robot: Box<dyn MotionBackend>,
    devices: HashMap<String, WorkerHandle>,
    pub interrupt: InterruptFlag,
}

impl RoutineContext {
    pub fn new(robot: Box<dyn MotionBackend>, devices: HashMap<String, WorkerHandle>) -> Self {
        Self {
            robot,
            devices,
            interrupt: InterruptFlag::new(),
        }
    }

    pub fn device(&self, name: &str) -> Result<&WorkerHandle> {
        self.devices
            .get(name)
            .ok_or_else(|| RoutineError::UnknownDevice(name.to_string()))
    }

    pub fn device_names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    /// Stop all acquisition workers. Also happens implicitly on drop.
    pub fn shutdown(&self) {
        for worker in self.devices.values() {
            worker.stop();
        }
    }
}
