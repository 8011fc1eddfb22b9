use crate::{AsyncStatus, MotionBackend, MotionError, MoveParams, Pose, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// One backend call as seen by the mock, for post-run assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionEvent {
    MoveLinear(Pose),
    MoveLinearAsync(Pose),
    Stop,
    Freedrive(bool),
    Reconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailMode {
    Unreachable,
    Backend,
}

struct ArmState {
    pose: Pose,
    ready: bool,
    events: Vec<MotionEvent>,
    async_total: u32,
    async_remaining: u32,
    async_start: Pose,
    async_target: Option<Pose>,
    fail_next_move: Option<FailMode>,
    fail_current_pose: bool,
}

/// Scriptable arm backend: moves teleport, async moves complete after a
/// configurable number of status polls, and every call lands in an event
/// log. Handles are clones sharing one arm, so a test can keep one while
/// a routine context owns another.
#[derive(Clone)]
pub struct MockArm {
    state: Arc<Mutex<ArmState>>,
}

impl MockArm {
    pub fn new(pose: Pose) -> Self {
        Self {
            state: Arc::new(Mutex::new(ArmState {
                pose,
                ready: true,
                events: Vec::new(),
                async_total: 5,
                async_remaining: 0,
                async_start: pose,
                async_target: None,
                fail_next_move: None,
                fail_current_pose: false,
            })),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.state.lock().ready = ready;
    }

    /// Number of `async_status` polls an async move stays in progress.
    pub fn set_async_polls(&self, polls: u32) {
        self.state.lock().async_total = polls;
    }

    /// Make the next move command fail as unreachable.
    pub fn fail_next_move_unreachable(&self) {
        self.state.lock().fail_next_move = Some(FailMode::Unreachable);
    }

    /// Make the next move command fail as a generic backend fault.
    pub fn fail_next_move_backend(&self) {
        self.state.lock().fail_next_move = Some(FailMode::Backend);
    }

    /// Make every `current_pose` call fail until cleared.
    pub fn fail_current_pose(&self, fail: bool) {
        self.state.lock().fail_current_pose = fail;
    }

    pub fn events(&self) -> Vec<MotionEvent> {
        self.state.lock().events.clone()
    }

    pub fn pose(&self) -> Pose {
        self.state.lock().pose
    }

    /// Linear moves only, in order issued.
    pub fn move_targets(&self) -> Vec<Pose> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MotionEvent::MoveLinear(p) => Some(*p),
                _ => None,
            })
            .collect()
    }
}

fn take_failure(state: &mut ArmState) -> Option<MotionError> {
    match state.fail_next_move.take() {
        Some(FailMode::Unreachable) => {
            Some(MotionError::Unreachable("mock: scripted unreachable".to_string()))
        }
        Some(FailMode::Backend) => Some(MotionError::Backend("mock: scripted fault".to_string())),
        None => None,
    }
}

impl MotionBackend for MockArm {
    fn current_pose(&mut self) -> Result<Pose> {
        let state = self.state.lock();
        if state.fail_current_pose {
            return Err(MotionError::Backend("mock: pose read fault".to_string()));
        }
        Ok(state.pose)
    }

    fn move_linear(&mut self, target: &Pose, _params: MoveParams) -> Result<()> {
        let mut state = self.state.lock();
        state.events.push(MotionEvent::MoveLinear(*target));
        if let Some(err) = take_failure(&mut state) {
            return Err(err);
        }
        state.pose = *target;
        Ok(())
    }

    fn move_linear_async(&mut self, target: &Pose, _params: MoveParams) -> Result<()> {
        let mut state = self.state.lock();
        state.events.push(MotionEvent::MoveLinearAsync(*target));
        if let Some(err) = take_failure(&mut state) {
            return Err(err);
        }
        state.async_start = state.pose;
        state.async_target = Some(*target);
        state.async_remaining = state.async_total;
        Ok(())
    }

    fn async_status(&mut self) -> Result<AsyncStatus> {
        let mut state = self.state.lock();
        let Some(target) = state.async_target else {
            return Ok(AsyncStatus::Done);
        };
        if state.async_remaining == 0 {
            state.pose = target;
            state.async_target = None;
            return Ok(AsyncStatus::Done);
        }
        state.async_remaining -= 1;
        // Advance the pose linearly so pollers see motion
        let done = (state.async_total - state.async_remaining) as f64;
        let frac = done / state.async_total as f64;
        let mut position = state.pose.position;
        for (i, p) in position.iter_mut().enumerate() {
            *p = state.async_start.position[i]
                + (target.position[i] - state.async_start.position[i]) * frac;
        }
        state.pose = Pose::new(position, target.rotation);
        Ok(AsyncStatus::InProgress)
    }

    fn stop(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.events.push(MotionEvent::Stop);
        state.async_target = None;
        state.async_remaining = 0;
        Ok(())
    }

    fn set_freedrive(&mut self, enabled: bool) -> Result<()> {
        self.state.lock().events.push(MotionEvent::Freedrive(enabled));
        Ok(())
    }

    fn is_ready(&mut self) -> bool {
        self.state.lock().ready
    }

    fn reconnect(&mut self) -> Result<()> {
        self.state.lock().events.push(MotionEvent::Reconnect);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_teleports() {
        let mut arm = MockArm::new(Pose::default());
        let target = Pose::new([0.1, 0.0, 0.0], [0.0; 3]);
        arm.move_linear(&target, MoveParams::default()).unwrap();
        assert_eq!(arm.current_pose().unwrap(), target);
        assert_eq!(arm.events(), vec![MotionEvent::MoveLinear(target)]);
    }

    #[test]
    fn test_async_completes_after_polls() {
        let mut arm = MockArm::new(Pose::default());
        arm.set_async_polls(3);
        let target = Pose::new([0.0, 0.0, 0.03], [0.0; 3]);
        arm.move_linear_async(&target, MoveParams::default()).unwrap();
        for _ in 0..3 {
            assert_eq!(arm.async_status().unwrap(), AsyncStatus::InProgress);
        }
        assert_eq!(arm.async_status().unwrap(), AsyncStatus::Done);
        assert_eq!(arm.current_pose().unwrap(), target);
    }

    #[test]
    fn test_stop_cancels_async() {
        let mut arm = MockArm::new(Pose::default());
        let target = Pose::new([0.0, 0.0, 0.03], [0.0; 3]);
        arm.move_linear_async(&target, MoveParams::default()).unwrap();
        arm.stop().unwrap();
        assert_eq!(arm.async_status().unwrap(), AsyncStatus::Done);
        // Stopped mid-flight: never teleported to the target
        assert_ne!(arm.current_pose().unwrap(), target);
    }

    #[test]
    fn test_scripted_unreachable() {
        let mut arm = MockArm::new(Pose::default());
        arm.fail_next_move_unreachable();
        let err = arm
            .move_linear(&Pose::default(), MoveParams::default())
            .unwrap_err();
        assert!(matches!(err, MotionError::Unreachable(_)));
        // One-shot: next move succeeds
        arm.move_linear(&Pose::default(), MoveParams::default()).unwrap();
    }
}
