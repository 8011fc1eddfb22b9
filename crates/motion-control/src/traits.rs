use crate::{Pose, Result};

/// Acceleration / speed pair for a linear move. Units follow the backend
/// convention (m/s^2 and m/s for translation moves).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveParams {
    pub accel: f64,
    pub speed: f64,
}

impl MoveParams {
    pub fn new(accel: f64, speed: f64) -> Self {
        Self { accel, speed }
    }

    /// Careful default used by sensor-guarded stepping.
    pub fn slow() -> Self {
        Self::new(0.1, 0.05)
    }

    /// Uncontested repositioning (e.g. returning to a start pose).
    pub fn transit() -> Self {
        Self::new(0.5, 0.5)
    }
}

impl Default for MoveParams {
    fn default() -> Self {
        Self::slow()
    }
}

/// Progress of a non-blocking move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncStatus {
    InProgress,
    Done,
}

/// The consumed surface of the robot motion controller.
///
/// Exactly one logical actor drives a backend at a time; routines run
/// sequentially from a single control flow, so implementations need no
/// internal locking, but `reconnect` must never race an in-flight move.
pub trait MotionBackend: Send {
    /// Current tool pose in the base frame.
    fn current_pose(&mut self) -> Result<Pose>;

    /// Linear move, blocking until the target is reached.
    fn move_linear(&mut self, target: &Pose, params: MoveParams) -> Result<()>;

    /// Linear move returning immediately; poll [`Self::async_status`].
    fn move_linear_async(&mut self, target: &Pose, params: MoveParams) -> Result<()>;

    /// Progress of the last async move.
    fn async_status(&mut self) -> Result<AsyncStatus>;

    /// Abort any in-flight move immediately.
    fn stop(&mut self) -> Result<()>;

    /// Enter (`true`) or leave (`false`) backdrivable free-motion mode.
    fn set_freedrive(&mut self, enabled: bool) -> Result<()>;

    /// Powered on, brakes released, no safety stop pending.
    fn is_ready(&mut self) -> bool;

    /// Tear down and re-establish the controller connection. Called after
    /// a fault, never concurrently with a move.
    fn reconnect(&mut self) -> Result<()>;
}
